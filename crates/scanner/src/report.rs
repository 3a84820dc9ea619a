use std::{fmt, path::PathBuf};

use alloy::primitives::Address;

/// How an implementation came to be recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeKind {
    /// Read from the proxy during this run.
    Observed,
    /// Recovered from history as the predecessor of an observed one.
    Backfilled,
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeKind::Observed => write!(f, "observed"),
            UpgradeKind::Backfilled => write!(f, "backfilled"),
        }
    }
}

/// Outcome of the best-effort source download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceStatus {
    Downloaded(PathBuf),
    Failed(String),
    /// Source downloads are disabled.
    Skipped,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Downloaded(path) => write!(f, "{}", path.display()),
            SourceStatus::Failed(err) => write!(f, "failed: {err}"),
            SourceStatus::Skipped => write!(f, "-"),
        }
    }
}

/// Newly recorded implementation of a proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upgrade {
    pub proxy: Address,
    pub name: String,
    pub implementation: Address,
    pub kind: UpgradeKind,
    pub source: SourceStatus,
}

/// Entry that could not be checked during this run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryFailure {
    /// Proxy address as written in the registry.
    pub proxy: String,
    pub name: String,
    pub error: String,
}

/// Result of scanning all proxies of one network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkReport {
    pub network: String,
    /// Entries whose implementation was read successfully.
    pub checked: usize,
    /// Entries with neither a slot nor a getter.
    pub unconfigured: usize,
    pub upgrades: Vec<Upgrade>,
    pub failures: Vec<EntryFailure>,
    /// Backfill attempts that failed; the observed upgrade is still recorded.
    pub backfill_failures: Vec<EntryFailure>,
}

impl NetworkReport {
    pub fn new(network: impl Into<String>) -> Self {
        Self { network: network.into(), ..Default::default() }
    }

    /// Whether any registry entry changed, so the registry must be written.
    pub fn is_dirty(&self) -> bool { !self.upgrades.is_empty() }

    #[cfg(feature = "display")]
    pub fn summary_rows(&self) -> impl Iterator<Item = SummaryRow> + '_ {
        self.upgrades.iter().map(|upgrade| SummaryRow {
            network: self.network.clone(),
            contract: upgrade.name.clone(),
            proxy: format!("{:#x}", upgrade.proxy),
            implementation: format!("{:#x}", upgrade.implementation),
            kind: upgrade.kind,
            source: upgrade.source.to_string(),
        })
    }
}

/// Table row describing a single upgrade.
#[cfg(feature = "display")]
#[derive(Clone, Debug, tabled::Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Network")]
    pub network: String,
    #[tabled(rename = "Contract")]
    pub contract: String,
    #[tabled(rename = "Proxy")]
    pub proxy: String,
    #[tabled(rename = "Implementation")]
    pub implementation: String,
    #[tabled(rename = "Kind")]
    pub kind: UpgradeKind,
    #[tabled(rename = "Source")]
    pub source: String,
}
