use std::time::Duration;

use alloy::{primitives::Address, providers::Provider};
use tracing::{debug, info, warn};

use crate::{
    Network,
    backfill::{self, Backfill},
    explorer::Explorer,
    reader::ImplementationReader,
    registry::{NetworkEntries, ProxyEntry},
    report::{EntryFailure, NetworkReport, SourceStatus, Upgrade, UpgradeKind},
    source::SourceFetcher,
};

/// Courtesy delays applied before external queries to stay below upstream
/// rate limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    chain: Duration,
    explorer: Duration,
}

impl Pacing {
    pub const DEFAULT_CHAIN_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_EXPLORER_DELAY: Duration = Duration::from_millis(500);

    pub fn new(chain: Duration, explorer: Duration) -> Self { Self { chain, explorer } }

    /// No delays at all.
    pub fn disabled() -> Self { Self::new(Duration::ZERO, Duration::ZERO) }

    pub fn chain_delay(&self) -> Duration { self.chain }

    pub fn explorer_delay(&self) -> Duration { self.explorer }

    pub async fn before_chain_query(&self) {
        if !self.chain.is_zero() {
            tokio::time::sleep(self.chain).await;
        }
    }

    pub async fn before_explorer_query(&self) {
        if !self.explorer.is_zero() {
            tokio::time::sleep(self.explorer).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self { Self::new(Self::DEFAULT_CHAIN_DELAY, Self::DEFAULT_EXPLORER_DELAY) }
}

/// Scans the proxies of one network for implementation changes.
///
/// Entries are processed one after another. Failures are contained to the
/// entry they occur in and reported in the returned [`NetworkReport`].
#[derive(Debug)]
pub struct Scanner<P, E> {
    network: Network,
    reader: ImplementationReader<P>,
    explorer: E,
    sources: Option<SourceFetcher>,
    pacing: Pacing,
    backfill: bool,
}

impl<P: Provider, E: Explorer> Scanner<P, E> {
    pub fn new(network: Network, provider: P, explorer: E) -> Self {
        Self {
            network,
            reader: ImplementationReader::new(provider),
            explorer,
            sources: None,
            pacing: Pacing::default(),
            backfill: true,
        }
    }

    /// Downloads verified sources of new implementations with `fetcher`.
    pub fn with_sources(mut self, fetcher: SourceFetcher) -> Self {
        self.sources = Some(fetcher);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Enables or disables recovery of the predecessor of first-seen
    /// implementations.
    pub fn with_backfill(mut self, enabled: bool) -> Self {
        self.backfill = enabled;
        self
    }

    pub fn network(&self) -> &Network { &self.network }

    pub fn explorer(&self) -> &E { &self.explorer }

    /// Reads every proxy in `entries`, records new implementations and
    /// returns what changed.
    pub async fn scan(&self, entries: &mut NetworkEntries) -> NetworkReport {
        let mut report = NetworkReport::new(entries.name());
        debug!(network = %self.network, proxies = entries.len(), "scanning network");
        for proxy in entries.proxies_mut() {
            self.scan_entry(proxy, &mut report).await;
        }
        report
    }

    async fn scan_entry(&self, proxy_entry: &mut ProxyEntry, report: &mut NetworkReport) {
        let name = proxy_entry.entry.name.clone();
        let key = proxy_entry.key().to_string();
        let failure =
            |error: String| EntryFailure { proxy: key.clone(), name: name.clone(), error };

        let proxy = match proxy_entry.address() {
            Ok(proxy) => proxy,
            Err(err) => {
                warn!(network = %self.network, contract = %name, "{err}");
                report.failures.push(failure(err.to_string()));
                return;
            },
        };

        match proxy_entry.entry.source() {
            Ok(Some(_)) => {},
            Ok(None) => {
                debug!(network = %self.network, contract = %name, "no slot or getter, skipping");
                report.unconfigured += 1;
                return;
            },
            Err(err) => {
                warn!(network = %self.network, contract = %name, %proxy, "invalid entry: {err}");
                report.failures.push(failure(err.to_string()));
                return;
            },
        }

        self.pacing.before_chain_query().await;
        let implementation = match self.reader.read(proxy, &proxy_entry.entry, None).await {
            Ok(Some(implementation)) => implementation,
            Ok(None) => return,
            Err(err) => {
                warn!(
                    network = %self.network,
                    contract = %name,
                    %proxy,
                    "failed to read implementation: {err}"
                );
                report.failures.push(failure(err.to_string()));
                return;
            },
        };
        report.checked += 1;

        if !proxy_entry.entry.record(implementation) {
            debug!(network = %self.network, contract = %name, %implementation, "unchanged");
            return;
        }
        info!(network = %self.network, contract = %name, %proxy, %implementation, "new implementation");
        let source = self.fetch_source(&name, implementation).await;
        report.upgrades.push(Upgrade {
            proxy,
            name: name.clone(),
            implementation,
            kind: UpgradeKind::Observed,
            source,
        });

        if !self.backfill || !proxy_entry.entry.needs_backfill() {
            return;
        }
        let backfill = backfill::previous_implementation(
            &self.reader,
            &self.explorer,
            &self.pacing,
            proxy,
            &proxy_entry.entry,
            implementation,
        )
        .await;
        match backfill {
            Ok(Backfill::Found(previous)) => {
                if !proxy_entry.entry.prepend(previous) {
                    return;
                }
                info!(network = %self.network, contract = %name, %previous, "backfilled implementation");
                let source = self.fetch_source(&name, previous).await;
                report.upgrades.push(Upgrade {
                    proxy,
                    name: name.clone(),
                    implementation: previous,
                    kind: UpgradeKind::Backfilled,
                    source,
                });
            },
            Ok(Backfill::NoPredecessor) => {
                debug!(network = %self.network, contract = %name, "no earlier implementation");
            },
            Ok(Backfill::Uninitialized) => {
                warn!(
                    network = %self.network,
                    contract = %name,
                    "no earlier implementation: proxy was uninitialized at deployment block"
                );
                report.backfill_failures.push(failure("proxy was uninitialized".to_string()));
            },
            Err(err) => {
                warn!(network = %self.network, contract = %name, "backfill failed: {err}");
                report.backfill_failures.push(failure(err.to_string()));
            },
        }
    }

    async fn fetch_source(&self, name: &str, implementation: Address) -> SourceStatus {
        let Some(fetcher) = &self.sources else {
            return SourceStatus::Skipped;
        };
        self.pacing.before_explorer_query().await;
        match fetcher.fetch(&self.explorer, self.network.name(), name, implementation).await {
            Ok(path) => SourceStatus::Downloaded(path),
            Err(err) => {
                warn!(
                    network = %self.network,
                    contract = %name,
                    %implementation,
                    "failed to download source: {err}"
                );
                SourceStatus::Failed(err.to_string())
            },
        }
    }
}
