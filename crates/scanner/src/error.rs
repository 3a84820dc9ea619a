use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("RPC error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("explorer error: {0}")]
    Explorer(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("invalid proxy address: {0}")]
    InvalidAddress(String),

    #[error("invalid storage slot: {0}")]
    InvalidSlot(String),

    #[error("invalid getter: {0}")]
    InvalidGetter(String),

    #[error("byte offset {0} does not leave room for a 20-byte address in a 32-byte word")]
    InvalidOffset(u32),

    #[error("getter returned {0} bytes, expected at least 32")]
    ShortReturn(usize),

    #[error("missing environment variable {0}")]
    MissingEnv(String),

    #[error("contract {0:#x} has no verified source")]
    NotVerified(Address),

    #[error("source path escapes the destination directory: {0}")]
    UnsafeSourcePath(String),
}
