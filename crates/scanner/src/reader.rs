use alloy::{
    dyn_abi::{DynSolType, JsonAbiExt},
    eips::BlockId,
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::{TransactionInput, TransactionRequest},
};

use crate::{
    error::ScanError,
    registry::{ImplementationSource, MonitorEntry},
    word,
};

/// Reads implementation pointers of proxies through a [`Provider`].
#[derive(Clone, Debug)]
pub struct ImplementationReader<P> {
    provider: P,
}

impl<P: Provider> ImplementationReader<P> {
    pub fn new(provider: P) -> Self { Self { provider } }

    pub fn provider(&self) -> &P { &self.provider }

    /// Reads the implementation of `proxy` as configured by `entry`, at the
    /// latest block or at `block`. Returns `None` for entries with neither a
    /// slot nor a getter.
    pub async fn read(
        &self,
        proxy: Address,
        entry: &MonitorEntry,
        block: Option<u64>,
    ) -> Result<Option<Address>, ScanError> {
        let Some(source) = entry.source()? else {
            return Ok(None);
        };
        let word = self.read_word(proxy, &source, block).await?;
        word::extract_address(&word, entry.offset).map(Some)
    }

    /// Reads the raw 32-byte word holding the implementation pointer.
    pub async fn read_word(
        &self,
        proxy: Address,
        source: &ImplementationSource,
        block: Option<u64>,
    ) -> Result<B256, ScanError> {
        let block = block.map(BlockId::number).unwrap_or_else(BlockId::latest);
        match source {
            ImplementationSource::Slot(slot) => {
                let value = self.provider.get_storage_at(proxy, *slot).block_id(block).await?;
                Ok(B256::from(value.to_be_bytes::<32>()))
            },
            ImplementationSource::Getter { function, arg } => {
                let args = match (arg, function.inputs.first()) {
                    (Some(arg), Some(param)) => {
                        let ty = DynSolType::parse(&param.ty).map_err(|err| {
                            ScanError::InvalidGetter(format!("{}: {err}", function.signature()))
                        })?;
                        let value = ty.coerce_str(arg).map_err(|err| {
                            ScanError::InvalidGetter(format!("argument `{arg}`: {err}"))
                        })?;
                        vec![value]
                    },
                    _ => Vec::new(),
                };
                let calldata = function
                    .abi_encode_input(&args)
                    .map_err(|err| ScanError::InvalidGetter(err.to_string()))?;
                let request = TransactionRequest::default()
                    .to(proxy)
                    .input(TransactionInput::new(calldata.into()));
                let output = self.provider.call(request).block(block).await?;
                word::first_word(&output)
            },
        }
    }
}
