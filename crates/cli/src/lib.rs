pub mod args;
mod output;

use std::{future::Future, time::Duration};

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
};
use anyhow::Context;
use args::Cli;
use tracing::info;
use upgrade_scanner::{
    Network, Pacing, Scanner,
    config::NetworkConfig,
    explorer::{Etherscan, Explorer},
    registry::{NetworkEntries, Registry},
    report::NetworkReport,
    source::SourceFetcher,
};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("loading environment from {}", path.display()))?;
        },
        None => {
            // `.env` is optional
            dotenvy::dotenv().ok();
        },
    }
    run_with(&cli, |key| std::env::var(key).ok(), &RpcConnector).await?;
    Ok(())
}

/// Opens the chain and explorer connections of a network.
pub trait Connector {
    type Provider: Provider;
    type Explorer: Explorer;

    fn connect(
        &self,
        network: &str,
        config: &NetworkConfig,
    ) -> impl Future<Output = anyhow::Result<(Network, Self::Provider, Self::Explorer)>>;
}

/// Connects to the configured RPC endpoint and Etherscan-compatible explorer.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpcConnector;

impl Connector for RpcConnector {
    type Provider = DynProvider;
    type Explorer = Etherscan;

    async fn connect(
        &self,
        network: &str,
        config: &NetworkConfig,
    ) -> anyhow::Result<(Network, DynProvider, Etherscan)> {
        let client = RpcClient::builder()
            .connect(config.rpc_url())
            .await
            .context("connecting to RPC")?;
        let provider = ProviderBuilder::new().connect_client(client).erased();

        let chain_id = match Network::known_chain_id(network) {
            Some(chain_id) => chain_id,
            None => provider.get_chain_id().await.context("fetching chain id")?,
        };
        let explorer = Etherscan::new(config.explorer_url(), chain_id, config.api_key());
        Ok((Network::new(network, chain_id), provider, explorer))
    }
}

/// Runs a single scan pass, resolving per-network settings through `lookup`.
/// Returns the reports of the networks that were scanned.
pub async fn run_with<F, C>(
    cli: &Cli,
    lookup: F,
    connector: &C,
) -> anyhow::Result<Vec<NetworkReport>>
where
    F: Fn(&str) -> Option<String>,
    C: Connector,
{
    let mut registry = Registry::load(&cli.registry)
        .with_context(|| format!("loading registry {}", cli.registry.display()))?;

    for unknown in cli.network.iter().filter(|name| registry.network(name).is_none()) {
        output::print_unknown_network(unknown);
    }

    let pacing = Pacing::new(
        Duration::from_millis(cli.chain_delay_ms),
        Duration::from_millis(cli.explorer_delay_ms),
    );

    let mut reports = Vec::new();
    for entries in registry.networks_mut() {
        if !cli.network.is_empty() && !cli.network.iter().any(|name| name == entries.name()) {
            continue;
        }

        let config = match NetworkConfig::from_lookup(entries.name(), &lookup) {
            Ok(config) => config,
            Err(err) => {
                output::print_network_skipped(entries.name(), &err);
                continue;
            },
        };

        output::print_network_header(entries.name(), entries.len());
        match scan_network(cli, pacing, connector, &config, entries).await {
            Ok(report) => {
                output::print_report(&report);
                reports.push(report);
            },
            Err(err) => output::print_network_skipped(entries.name(), &err),
        }
    }

    let dirty = reports.iter().any(NetworkReport::is_dirty);
    if dirty && !cli.dry_run {
        registry
            .save(&cli.registry)
            .with_context(|| format!("writing registry {}", cli.registry.display()))?;
        info!(path = %cli.registry.display(), "registry updated");
    }
    output::print_summary(&reports, &cli.registry, dirty, cli.dry_run);

    Ok(reports)
}

async fn scan_network<C: Connector>(
    cli: &Cli,
    pacing: Pacing,
    connector: &C,
    config: &NetworkConfig,
    entries: &mut NetworkEntries,
) -> anyhow::Result<NetworkReport> {
    let (network, provider, explorer) = connector.connect(entries.name(), config).await?;

    let mut scanner = Scanner::new(network, provider, explorer)
        .with_pacing(pacing)
        .with_backfill(!cli.no_backfill);
    if !cli.no_sources {
        scanner = scanner.with_sources(SourceFetcher::new(&cli.sources_dir));
    }

    Ok(scanner.scan(entries).await)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, address};
    use clap::Parser;
    use upgrade_scanner::testing::{self, FakeExplorer};

    use super::*;

    const IMPLEMENTATION: Address = address!("0x2000000000000000000000000000000000000002");

    const REGISTRY: &str = r#"{
  "polygon": {
    "0x5d4aa78b08bc7c530e21bf7447988b1be7991322": {
      "name": "Proxy: Bridge",
      "slot": "0x0"
    }
  },
  "base": {
    "0x0000000000000000000000000000000000000b0b": {
      "implementations": [],
      "name": "Vault",
      "slot": "0x0"
    }
  }
}"#;

    /// Hands out the same mocked provider for every network.
    struct MockConnector {
        provider: DynProvider,
    }

    impl Connector for MockConnector {
        type Provider = DynProvider;
        type Explorer = FakeExplorer;

        async fn connect(
            &self,
            network: &str,
            _config: &NetworkConfig,
        ) -> anyhow::Result<(Network, DynProvider, FakeExplorer)> {
            Ok((Network::new(network, 8453), self.provider.clone(), FakeExplorer::new()))
        }
    }

    /// Credentials for `base` only; `polygon` lacks its API key.
    fn lookup(key: &str) -> Option<String> {
        match key {
            "POLYGON_RPC_URL" | "BASE_RPC_URL" => Some("http://localhost:1".to_string()),
            "BASE_API_KEY" => Some("key".to_string()),
            _ => None,
        }
    }

    fn cli(registry: &std::path::Path, extra: &[&str]) -> Cli {
        let mut args = vec![
            "upgrade-scanner",
            "--registry",
            registry.to_str().unwrap(),
            "--chain-delay-ms",
            "0",
            "--explorer-delay-ms",
            "0",
            "--no-backfill",
            "--no-sources",
        ];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    fn write_registry(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    /// Tests that a network without credentials is skipped while the others
    /// are scanned, and that a detected upgrade is written back.
    #[tokio::test]
    async fn test_skips_unconfigured_network_and_writes_upgrade() {
        let (_dir, path) = write_registry(REGISTRY);
        let (provider, asserter) = testing::mocked_provider();
        testing::push_storage(&asserter, testing::address_word(IMPLEMENTATION));

        let reports = run_with(&cli(&path, &[]), lookup, &MockConnector { provider }).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].network, "base");
        assert!(reports[0].is_dirty());

        let written = std::fs::read_to_string(&path).unwrap();
        assert_ne!(written, REGISTRY);
        let registry = Registry::parse(&written).unwrap();
        let polygon = registry.network("polygon").unwrap();
        assert!(polygon.proxies()[0].entry.implementations().is_empty());
        let vault = &registry.network("base").unwrap().proxies()[0].entry;
        assert_eq!(vault.implementations(), vec![IMPLEMENTATION]);
        // Entry keys keep their place
        assert!(written.contains(
            "\"implementations\": [\n        \"0x2000000000000000000000000000000000000002\"\n      ],\n      \"name\": \"Vault\""
        ));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_registry_untouched() {
        let (_dir, path) = write_registry(REGISTRY);
        let (provider, asserter) = testing::mocked_provider();
        testing::push_storage(&asserter, testing::address_word(IMPLEMENTATION));

        let reports = run_with(&cli(&path, &["--dry-run"]), lookup, &MockConnector { provider })
            .await
            .unwrap();

        assert!(reports[0].is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), REGISTRY);
    }

    #[tokio::test]
    async fn test_unchanged_read_leaves_registry_untouched() {
        let registry = REGISTRY.replace(
            "\"implementations\": []",
            "\"implementations\": [\"0x2000000000000000000000000000000000000002\"]",
        );
        let (_dir, path) = write_registry(&registry);
        let (provider, asserter) = testing::mocked_provider();
        testing::push_storage(&asserter, testing::address_word(IMPLEMENTATION));

        let reports = run_with(&cli(&path, &[]), lookup, &MockConnector { provider }).await.unwrap();

        assert_eq!(reports[0].checked, 1);
        assert!(!reports[0].is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), registry);
    }

    #[tokio::test]
    async fn test_network_filter() {
        let (_dir, path) = write_registry(REGISTRY);
        let (provider, _asserter) = testing::mocked_provider();

        let reports = run_with(&cli(&path, &["--network", "polygon"]), lookup, &MockConnector {
            provider,
        })
        .await
        .unwrap();

        assert!(reports.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), REGISTRY);
    }

    #[tokio::test]
    async fn test_missing_registry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _asserter) = testing::mocked_provider();
        let err = run_with(&cli(&dir.path().join("missing.json"), &[]), |_| None, &MockConnector {
            provider,
        })
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("loading registry"));
    }
}
