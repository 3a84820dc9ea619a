//! Offline doubles for the external services the scanner talks to.
//!
//! [`mocked_provider`] returns a provider answering JSON-RPC requests from a
//! queue filled through its [`Asserter`], in request order. [`FakeExplorer`]
//! serves canned explorer responses and records what was asked.

mod explorer;

use alloy::{
    primitives::{B256, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::mock::Asserter,
};
pub use explorer::{ExplorerCall, FakeExplorer};

/// Provider backed by a queue of canned JSON-RPC responses.
pub fn mocked_provider() -> (DynProvider, Asserter) {
    let asserter = Asserter::new();
    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_mocked_client(asserter.clone())
        .erased();
    (provider, asserter)
}

/// Queues the response of an `eth_getStorageAt` request.
pub fn push_storage(asserter: &Asserter, word: B256) {
    asserter.push_success(&U256::from_be_bytes(word.0));
}

/// Queues the response of an `eth_call` request.
pub fn push_call(asserter: &Asserter, output: impl Into<Bytes>) {
    asserter.push_success(&output.into());
}

/// Queues a failed JSON-RPC response.
pub fn push_rpc_error(asserter: &Asserter, message: &str) {
    asserter.push_failure_msg(message.to_string());
}

/// Storage word holding `address` right-aligned.
pub fn address_word(address: alloy::primitives::Address) -> B256 { address.into_word() }
