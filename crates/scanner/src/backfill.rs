//! Recovery of the implementation that preceded the first one ever observed.
//!
//! Forward-only monitoring misses upgrades that happened before a proxy was
//! first scanned. The immediately preceding implementation can still be
//! recovered: look up the block where the current implementation was deployed
//! and read the proxy's pointer as it was at that block.

use alloy::{primitives::Address, providers::Provider};
use tracing::debug;

use crate::{
    Pacing, error::ScanError, explorer::Explorer, reader::ImplementationReader,
    registry::MonitorEntry,
};

/// What the pointer held when the current implementation was deployed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backfill {
    /// A different, non-zero implementation was in place.
    Found(Address),
    /// The pointer already held the current implementation.
    NoPredecessor,
    /// The pointer was zero, i.e. the proxy was not initialized yet.
    Uninitialized,
}

/// Looks up the implementation of `proxy` preceding `current`.
pub async fn previous_implementation<P, E>(
    reader: &ImplementationReader<P>,
    explorer: &E,
    pacing: &Pacing,
    proxy: Address,
    entry: &MonitorEntry,
    current: Address,
) -> Result<Backfill, ScanError>
where
    P: Provider,
    E: Explorer,
{
    pacing.before_explorer_query().await;
    let tx_hash = explorer.contract_creation(current).await?;

    pacing.before_explorer_query().await;
    let block = explorer.transaction_block(tx_hash).await?;
    debug!(%proxy, %current, %tx_hash, block, "implementation deployment located");

    pacing.before_chain_query().await;
    let Some(candidate) = reader.read(proxy, entry, Some(block)).await? else {
        return Ok(Backfill::NoPredecessor);
    };

    Ok(if candidate == current {
        Backfill::NoPredecessor
    } else if candidate.is_zero() {
        Backfill::Uninitialized
    } else {
        Backfill::Found(candidate)
    })
}
