use itertools::Itertools;

use crate::error::ScanError;

/// Etherscan v2 multichain endpoint, selected per network with `chainid`.
pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io/v2/api";

/// Credentials and endpoints needed to scan one network.
#[derive(Clone, derive_more::Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    rpc_url: String,
    #[debug("<redacted>")]
    api_key: String,
    explorer_url: String,
}

impl NetworkConfig {
    pub fn new(
        rpc_url: impl Into<String>,
        api_key: impl Into<String>,
        explorer_url: impl Into<String>,
    ) -> Self {
        Self { rpc_url: rpc_url.into(), api_key: api_key.into(), explorer_url: explorer_url.into() }
    }

    /// Resolves `<NETWORK>_RPC_URL`, `<NETWORK>_API_KEY` and the optional
    /// `<NETWORK>_EXPLORER_URL` through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(network: &str, lookup: F) -> Result<Self, ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = env_prefix(network);
        let var = |suffix: &str| {
            let key = format!("{prefix}_{suffix}");
            let value = lookup(&key).filter(|v| !v.trim().is_empty());
            (key, value)
        };

        let (rpc_key, rpc_url) = var("RPC_URL");
        let (api_key_key, api_key) = var("API_KEY");
        let (_, explorer_url) = var("EXPLORER_URL");

        match (rpc_url, api_key) {
            (Some(rpc_url), Some(api_key)) => Ok(Self::new(
                rpc_url,
                api_key,
                explorer_url.unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
            )),
            (rpc_url, api_key) => Err(ScanError::MissingEnv(
                [(rpc_key, rpc_url.is_none()), (api_key_key, api_key.is_none())]
                    .into_iter()
                    .filter_map(|(key, missing)| missing.then_some(key))
                    .join(", "),
            )),
        }
    }

    /// Reads the network configuration from the process environment.
    pub fn from_env(network: &str) -> Result<Self, ScanError> {
        Self::from_lookup(network, |key| std::env::var(key).ok())
    }

    pub fn rpc_url(&self) -> &str { &self.rpc_url }

    pub fn api_key(&self) -> &str { &self.api_key }

    pub fn explorer_url(&self) -> &str { &self.explorer_url }
}

/// Environment variable prefix for a network, e.g. `arbitrum-nova` becomes
/// `ARBITRUM_NOVA`.
pub fn env_prefix(network: &str) -> String {
    network
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix("polygon"), "POLYGON");
        assert_eq!(env_prefix("arbitrum-nova"), "ARBITRUM_NOVA");
        assert_eq!(env_prefix("zkSync Era"), "ZKSYNC_ERA");
    }

    #[test]
    fn test_resolves_credentials() {
        let config = NetworkConfig::from_lookup(
            "polygon",
            lookup(&[("POLYGON_RPC_URL", "https://polygon.example"), ("POLYGON_API_KEY", "secret")]),
        )
        .unwrap();
        assert_eq!(config.rpc_url(), "https://polygon.example");
        assert_eq!(config.api_key(), "secret");
        assert_eq!(config.explorer_url(), DEFAULT_EXPLORER_URL);
        assert!(!format!("{config:?}").contains("secret"));

        let config = NetworkConfig::from_lookup(
            "base",
            lookup(&[
                ("BASE_RPC_URL", "https://base.example"),
                ("BASE_API_KEY", "k"),
                ("BASE_EXPLORER_URL", "https://explorer.example/api"),
            ]),
        )
        .unwrap();
        assert_eq!(config.explorer_url(), "https://explorer.example/api");
    }

    #[test]
    fn test_missing_credentials() {
        let err = NetworkConfig::from_lookup(
            "polygon",
            lookup(&[("POLYGON_RPC_URL", "https://polygon.example"), ("ETHEREUM_API_KEY", "k")]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "missing environment variable POLYGON_API_KEY");

        let err = NetworkConfig::from_lookup("polygon", lookup(&[("POLYGON_API_KEY", " ")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::MissingEnv(vars) if vars == "POLYGON_RPC_URL, POLYGON_API_KEY"
        ));
    }
}
