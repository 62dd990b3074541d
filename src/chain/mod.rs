// Connectivity layer between the scripts and a JSON-RPC node
pub mod provider;

pub use provider::EthersClient;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TxHash, U256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Node unreachable: {0}")]
    Unreachable(String),
    #[error("Request rejected by node: {0}")]
    Rejected(String),
    #[error("Transaction {0:?} reverted")]
    Reverted(TxHash),
    #[error("Transaction {0:?} dropped before confirmation")]
    Dropped(TxHash),
    #[error("Account {0:?} is not an available signer")]
    UnknownSigner(Address),
}

/// Read-only `eth_call` against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// State-changing transaction. `to` is `None` for contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
}

/// Receipt of a transaction that was mined and did not revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
    pub gas_used: Option<U256>,
}

/// Everything the deploy and interact workflows need from a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Signer accounts, in a stable order. Index 0 is the deployer.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Native balance in wei.
    async fn balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Executes a call without submitting a transaction and returns the raw
    /// return data. Calling an address without code yields empty data.
    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError>;

    /// Signs and broadcasts a transaction. Returns as soon as the node has
    /// accepted it; nothing about its effects is known yet.
    async fn submit(&self, request: TxRequest) -> Result<TxHash, ChainError>;

    /// Waits until the transaction is mined.
    ///
    /// Fails with [`ChainError::Reverted`] if it was mined but reverted and
    /// with [`ChainError::Dropped`] if the node forgot about it.
    async fn confirm(&self, tx_hash: TxHash) -> Result<Confirmation, ChainError>;
}
