//! Materialization of verified sources on disk for later diffing.
//!
//! Sources land in `<root>/<network>/<sanitized name>/<implementation>`, one
//! directory per implementation, so consecutive upgrades of the same proxy
//! sit next to each other.

use std::path::{Component, Path, PathBuf};

use alloy::primitives::Address;
use serde_json::{Map, Value};

use crate::{
    error::ScanError,
    explorer::{Explorer, VerifiedSource},
};

/// Downloads verified sources below a root directory.
#[derive(Clone, Debug)]
pub struct SourceFetcher {
    root: PathBuf,
}

impl SourceFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    /// Directory the sources of `implementation` are written to.
    pub fn destination(&self, network: &str, name: &str, implementation: Address) -> PathBuf {
        self.root
            .join(network)
            .join(sanitize_name(name))
            .join(format!("{implementation:#x}"))
    }

    /// Fetches the verified source of `implementation` and writes its files.
    /// Returns the destination directory.
    pub async fn fetch<E: Explorer>(
        &self,
        explorer: &E,
        network: &str,
        name: &str,
        implementation: Address,
    ) -> Result<PathBuf, ScanError> {
        let source = explorer.verified_source(implementation).await?;
        let files = source_files(&source)?;
        let destination = self.destination(network, name, implementation);
        for (path, content) in files {
            let path = destination.join(path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
        }
        Ok(destination)
    }
}

/// Removes spaces and colons from a contract display name.
pub fn sanitize_name(name: &str) -> String { name.replace([' ', ':'], "") }

/// Splits an explorer `SourceCode` field into relative file paths and contents.
pub fn source_files(source: &VerifiedSource) -> Result<Vec<(PathBuf, String)>, ScanError> {
    let code = source.source_code.trim();

    // Standard JSON input is published wrapped in an extra pair of braces
    let json = if code.starts_with("{{") && code.ends_with("}}") {
        Some(&code[1..code.len() - 1])
    } else if code.starts_with('{') {
        Some(code)
    } else {
        None
    };

    if let Some(json) = json
        && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(json)
    {
        let files = match object.get("sources") {
            Some(Value::Object(sources)) => sources,
            _ => &object,
        };
        return files_from_object(files);
    }

    let name = match source.contract_name.trim() {
        "" => "Contract",
        name => name,
    };
    let extension =
        if source.compiler_version.trim_start().starts_with("vyper") { "vy" } else { "sol" };
    let path = safe_relative_path(&format!("{name}.{extension}"))?;
    Ok(vec![(path, source.source_code.clone())])
}

fn files_from_object(files: &Map<String, Value>) -> Result<Vec<(PathBuf, String)>, ScanError> {
    files
        .iter()
        .map(|(path, file)| {
            let content = file
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| ScanError::Explorer(format!("source `{path}` has no content")))?;
            Ok((safe_relative_path(path)?, content.to_string()))
        })
        .collect()
}

fn safe_relative_path(path: &str) -> Result<PathBuf, ScanError> {
    let relative = PathBuf::from(path);
    let is_safe = relative.components().next().is_some()
        && relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !is_safe {
        return Err(ScanError::UnsafeSourcePath(path.to_string()));
    }
    Ok(relative)
}
