// Contract artifacts, deployment and typed invocation
pub mod artifact;
pub mod factory;
pub mod handle;
pub mod tokens;

pub use artifact::{Artifact, ArtifactError, ArtifactStore};
pub use factory::{ContractFactory, PendingDeployment};
pub use handle::{ContractHandle, Invocation, MethodCall, Outcome, PendingWrite};

use std::str::FromStr;

use ethers::types::{Address, TxHash};
use ethers::utils::to_checksum;
use thiserror::Error;

use crate::chain::ChainError;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("Bad checksum for address {0}")]
    BadChecksum(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("{0} has no bytecode and cannot be deployed")]
    NotDeployable(String),
    #[error("{contract} has no method {method} taking {arity} argument(s)")]
    UnknownMethod {
        contract: String,
        method: String,
        arity: usize,
    },
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },
    #[error("{0} is not payable")]
    NotPayable(String),
    #[error("{0} needs a signer but the handle has none")]
    NoSigner(String),
    #[error("Call to {method} at {address:?} returned no data; no contract with this ABI lives there")]
    NoContractCode { method: String, address: Address },
    #[error("Failed to decode result of {method}: {reason}")]
    Decode { method: String, reason: String },
    #[error("Deployment {0:?} confirmed without a contract address")]
    MissingContractAddress(TxHash),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Parse an account address, rejecting anything that is not exactly
/// 20 bytes of hex. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(value: &str) -> Result<Address, ContractError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ContractError::InvalidAddress(value.to_string()));
    }
    let address = Address::from_str(digits)
        .map_err(|_| ContractError::InvalidAddress(value.to_string()))?;

    let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
        && digits.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case && to_checksum(&address, None)[2..] != *digits {
        return Err(ContractError::BadChecksum(value.to_string()));
    }

    Ok(address)
}
