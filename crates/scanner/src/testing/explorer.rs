use std::{collections::HashMap, sync::Mutex};

use alloy::primitives::{Address, TxHash};

use crate::{
    error::ScanError,
    explorer::{Explorer, VerifiedSource},
};

/// Request received by a [`FakeExplorer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExplorerCall {
    ContractCreation(Address),
    TransactionBlock(TxHash),
    VerifiedSource(Address),
}

/// In-memory explorer. Unknown contracts and transactions are reported as
/// explorer errors.
#[derive(Debug, Default)]
pub struct FakeExplorer {
    creations: HashMap<Address, TxHash>,
    blocks: HashMap<TxHash, u64>,
    sources: HashMap<Address, VerifiedSource>,
    calls: Mutex<Vec<ExplorerCall>>,
}

impl FakeExplorer {
    pub fn new() -> Self { Self::default() }

    /// Registers `contract` as deployed by `tx_hash` in `block`.
    pub fn with_creation(mut self, contract: Address, tx_hash: TxHash, block: u64) -> Self {
        self.creations.insert(contract, tx_hash);
        self.blocks.insert(tx_hash, block);
        self
    }

    pub fn with_source(mut self, contract: Address, name: &str, source_code: &str) -> Self {
        self.sources.insert(
            contract,
            VerifiedSource {
                contract_name: name.to_string(),
                source_code: source_code.to_string(),
                compiler_version: String::new(),
            },
        );
        self
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<ExplorerCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: ExplorerCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Explorer for FakeExplorer {
    async fn contract_creation(&self, contract: Address) -> Result<TxHash, ScanError> {
        self.record(ExplorerCall::ContractCreation(contract));
        self.creations
            .get(&contract)
            .copied()
            .ok_or_else(|| ScanError::Explorer(format!("no contract creation for {contract:#x}")))
    }

    async fn transaction_block(&self, tx_hash: TxHash) -> Result<u64, ScanError> {
        self.record(ExplorerCall::TransactionBlock(tx_hash));
        self.blocks
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| ScanError::Explorer("transaction not found".to_string()))
    }

    async fn verified_source(&self, contract: Address) -> Result<VerifiedSource, ScanError> {
        self.record(ExplorerCall::VerifiedSource(contract));
        self.sources.get(&contract).cloned().ok_or(ScanError::NotVerified(contract))
    }
}
