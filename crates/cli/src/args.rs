use std::path::PathBuf;

use clap::Parser;

pub(crate) const DEFAULT_REGISTRY: &str = "./contracts.json";
pub(crate) const DEFAULT_CHAIN_DELAY_MS: u64 = 1000;
pub(crate) const DEFAULT_EXPLORER_DELAY_MS: u64 = 500;

/// Scans monitored proxies for implementation upgrades.
///
/// Each network in the registry needs `<NETWORK>_RPC_URL` and
/// `<NETWORK>_API_KEY` in the environment (or `.env`); networks without them
/// are skipped.
#[derive(Parser, Debug)]
#[command(name = "upgrade-scanner", version, about, long_about = None)]
pub struct Cli {
    /// Registry of monitored proxies, rewritten when upgrades are found
    #[arg(long, default_value = DEFAULT_REGISTRY)]
    pub registry: PathBuf,

    /// Directory verified sources are downloaded into, as
    /// `<network>/<name>/<implementation>`
    #[arg(long, default_value = ".")]
    pub sources_dir: PathBuf,

    /// Network to scan [default: all networks in the registry]
    #[arg(long)]
    pub network: Vec<String>,

    /// Delay before each chain query, in milliseconds
    #[arg(long, default_value_t = DEFAULT_CHAIN_DELAY_MS)]
    pub chain_delay_ms: u64,

    /// Delay before each explorer query, in milliseconds
    #[arg(long, default_value_t = DEFAULT_EXPLORER_DELAY_MS)]
    pub explorer_delay_ms: u64,

    /// Do not look up the implementation preceding a first-seen one
    #[arg(long, default_value_t = false)]
    pub no_backfill: bool,

    /// Do not download verified sources of new implementations
    #[arg(long, default_value_t = false)]
    pub no_sources: bool,

    /// Report upgrades without rewriting the registry
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Environment file to load [default: `.env` if present]
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}
