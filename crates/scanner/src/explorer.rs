//! Block-explorer access.
//!
//! [`Explorer`] is the capability the scanner needs from an explorer: where a
//! contract was created and what its verified source is. [`Etherscan`]
//! implements it against any Etherscan-compatible HTTP API.

use std::future::Future;

use alloy::primitives::{Address, TxHash};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ScanError;

/// Some explorers reject requests without a browser-like user agent.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Verified source of a contract as published on the explorer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSource {
    pub contract_name: String,
    /// `SourceCode` field as returned by the explorer: a single flattened
    /// file, a JSON object of files, or standard JSON input wrapped in
    /// double braces.
    pub source_code: String,
    /// e.g. `v0.8.24+commit.e11b9ed9` or `vyper:0.3.10`.
    pub compiler_version: String,
}

pub trait Explorer {
    /// Hash of the transaction that deployed `contract`.
    fn contract_creation(&self, contract: Address) -> impl Future<Output = Result<TxHash, ScanError>>;

    /// Number of the block containing `tx_hash`.
    fn transaction_block(&self, tx_hash: TxHash) -> impl Future<Output = Result<u64, ScanError>>;

    fn verified_source(
        &self,
        contract: Address,
    ) -> impl Future<Output = Result<VerifiedSource, ScanError>>;
}

/// Etherscan-compatible explorer client for a single chain.
#[derive(Clone, derive_more::Debug)]
pub struct Etherscan {
    #[debug(skip)]
    client: reqwest::Client,
    url: String,
    chain_id: u64,
    #[debug("<redacted>")]
    api_key: String,
}

impl Etherscan {
    pub fn new(url: impl Into<String>, chain_id: u64, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), chain_id, api_key: api_key.into() }
    }

    pub fn chain_id(&self) -> u64 { self.chain_id }

    async fn get<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T, ScanError> {
        let chain_id = self.chain_id.to_string();
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("chainid", chain_id.as_str()), ("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl Explorer for Etherscan {
    async fn contract_creation(&self, contract: Address) -> Result<TxHash, ScanError> {
        let response: ApiResponse = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getcontractcreation".to_string()),
                ("contractaddresses", format!("{contract:#x}")),
            ])
            .await?;
        parse_contract_creation(response)
    }

    async fn transaction_block(&self, tx_hash: TxHash) -> Result<u64, ScanError> {
        let response: ProxyResponse = self
            .get(&[
                ("module", "proxy".to_string()),
                ("action", "eth_getTransactionByHash".to_string()),
                ("txhash", format!("{tx_hash:#x}")),
            ])
            .await?;
        parse_transaction_block(response)
    }

    async fn verified_source(&self, contract: Address) -> Result<VerifiedSource, ScanError> {
        let response: ApiResponse = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getsourcecode".to_string()),
                ("address", format!("{contract:#x}")),
            ])
            .await?;
        parse_verified_source(contract, response)
    }
}

/// Envelope of `module=contract` responses. `result` holds an error message
/// instead of data when `status` is not `"1"`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: Value,
}

impl ApiResponse {
    fn into_result<T: DeserializeOwned>(self) -> Result<T, ScanError> {
        if self.status != "1" {
            let detail = match &self.result {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ScanError::Explorer(format!("{}: {}", self.message, detail)));
        }
        Ok(serde_json::from_value(self.result)?)
    }
}

/// Envelope of `module=proxy` responses, which mimic JSON-RPC.
#[derive(Debug, Deserialize)]
pub struct ProxyResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractCreation {
    tx_hash: TxHash,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionLocation {
    block_number: Option<String>,
}

#[derive(Deserialize)]
struct SourceCodeItem {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
    #[serde(rename = "CompilerVersion", default)]
    compiler_version: String,
}

pub fn parse_contract_creation(response: ApiResponse) -> Result<TxHash, ScanError> {
    let creations: Vec<ContractCreation> = response.into_result()?;
    creations
        .into_iter()
        .next()
        .map(|c| c.tx_hash)
        .ok_or_else(|| ScanError::Explorer("no contract creation found".to_string()))
}

pub fn parse_transaction_block(response: ProxyResponse) -> Result<u64, ScanError> {
    if let Some(error) = response.error {
        return Err(ScanError::Explorer(error.to_string()));
    }
    let result = match response.result {
        Some(Value::Object(result)) => result,
        Some(Value::String(message)) => return Err(ScanError::Explorer(message)),
        _ => return Err(ScanError::Explorer("transaction not found".to_string())),
    };
    let location: TransactionLocation = serde_json::from_value(Value::Object(result))?;
    let block = location
        .block_number
        .ok_or_else(|| ScanError::Explorer("transaction is still pending".to_string()))?;
    u64::from_str_radix(block.trim_start_matches("0x"), 16)
        .map_err(|err| ScanError::Explorer(format!("invalid block number `{block}`: {err}")))
}

pub fn parse_verified_source(
    contract: Address,
    response: ApiResponse,
) -> Result<VerifiedSource, ScanError> {
    let items: Vec<SourceCodeItem> = response.into_result()?;
    let item = items
        .into_iter()
        .next()
        .filter(|item| !item.source_code.trim().is_empty())
        .ok_or(ScanError::NotVerified(contract))?;
    Ok(VerifiedSource {
        contract_name: item.contract_name,
        source_code: item.source_code,
        compiler_version: item.compiler_version,
    })
}
