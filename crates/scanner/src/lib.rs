//! Proxy upgrade scanner.
//!
//! # Overview
//!
//! Watches upgradeable proxy contracts across networks and records every
//! implementation they point to, so that implementation swaps can be
//! reviewed.
//!
//! The [`registry::Registry`] lists the monitored proxies per network and
//! how to find their implementation: a storage slot or a getter, optionally
//! with a byte offset for addresses packed next to other data. A
//! [`Scanner`] reads each proxy once per run, appends unseen
//! implementations and downloads their verified sources via
//! [`source::SourceFetcher`]. The first time a proxy is seen, its previous
//! implementation is recovered from history as well (see [`backfill`]).
//!
//! Runs are meant to be scheduled externally; a single run is strictly
//! sequential and applies courtesy delays (see [`Pacing`]) before every
//! external query.
//!
//! # Features
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `display` | yes | Enables [`report::SummaryRow`] table rendering. |
//! | `testing` | yes | Enables [`testing`] module. |

pub mod backfill;
pub mod config;
pub mod error;
pub mod explorer;
pub mod reader;
pub mod registry;
pub mod report;
mod scanner;
pub mod source;
#[cfg(feature = "testing")]
pub mod testing;
pub mod word;

use std::fmt;

pub use scanner::{Pacing, Scanner};

/// Chain ids of networks known by name. `ethereum` and `mainnet` both name
/// the primary network.
const KNOWN_NETWORKS: &[(&str, u64)] = &[
    ("ethereum", 1),
    ("mainnet", 1),
    ("optimism", 10),
    ("bsc", 56),
    ("gnosis", 100),
    ("polygon", 137),
    ("fantom", 250),
    ("zksync", 324),
    ("polygon-zkevm", 1101),
    ("moonbeam", 1284),
    ("mantle", 5000),
    ("base", 8453),
    ("arbitrum", 42161),
    ("arbitrum-nova", 42170),
    ("celo", 42220),
    ("avalanche", 43114),
    ("linea", 59144),
    ("blast", 81457),
    ("scroll", 534352),
    ("sepolia", 11155111),
];

/// Network the monitored proxies live on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    name: String,
    chain_id: u64,
}

impl Network {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self { name: name.into(), chain_id }
    }

    /// Network with a well-known name, e.g. `polygon`.
    pub fn known(name: &str) -> Option<Self> {
        Self::known_chain_id(name).map(|chain_id| Self::new(name, chain_id))
    }

    /// Chain id of a well-known network name, case-insensitive.
    pub fn known_chain_id(name: &str) -> Option<u64> {
        let name = name.trim().to_ascii_lowercase();
        KNOWN_NETWORKS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, chain_id)| *chain_id)
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn chain_id(&self) -> u64 { self.chain_id }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.name) }
}
