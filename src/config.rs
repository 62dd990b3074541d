use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CONTRACT_NAME: &str = "BlockLeaks";

#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub private_keys: Vec<String>,
    pub contracts: ContractsConfig,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Queried from the node when unset.
    pub chain_id: Option<u64>,
    pub confirmations: usize,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ContractsConfig {
    pub artifacts_dir: PathBuf,
    pub contract_name: String,
    /// Constructor argument for deployments.
    pub multisig_address: Option<String>,
    /// Instance the interactor attaches to.
    pub contract_address: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Config {
            network: NetworkConfig {
                rpc_url: check_rpc_url(
                    &var("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
                )?,
                chain_id: var("CHAIN_ID")
                    .map(|id| id.trim().parse::<u64>())
                    .transpose()
                    .map_err(|_| ConfigError::Invalid("CHAIN_ID"))?,
                confirmations: var("CONFIRMATIONS")
                    .unwrap_or_else(|| "1".to_string())
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("CONFIRMATIONS"))?,
                poll_interval: var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|| "1000".to_string())
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::Invalid("POLL_INTERVAL_MS"))?,
            },
            private_keys: var("PRIVATE_KEYS")
                .map(|keys| {
                    keys.split(',')
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            contracts: ContractsConfig {
                artifacts_dir: var("ARTIFACTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("artifacts")),
                contract_name: var("CONTRACT_NAME")
                    .unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string()),
                multisig_address: var("MULTISIG_ADDRESS"),
                contract_address: var("CONTRACT_ADDRESS"),
            },
        })
    }

    pub fn multisig_address(&self) -> Result<&str, ConfigError> {
        self.contracts
            .multisig_address
            .as_deref()
            .ok_or(ConfigError::Missing("MULTISIG_ADDRESS"))
    }

    pub fn contract_address(&self) -> Result<&str, ConfigError> {
        self.contracts
            .contract_address
            .as_deref()
            .ok_or(ConfigError::Missing("CONTRACT_ADDRESS"))
    }
}

/// Accept only absolute `http(s)` endpoints.
pub fn check_rpc_url(value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(value.to_string())
        }
        _ => Err(ConfigError::Invalid("RPC_URL")),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
    #[error("Invalid value for: {0}")]
    Invalid(&'static str),
}
