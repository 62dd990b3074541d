use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;

use super::{CallRequest, ChainClient, ChainError, Confirmation, TxRequest};
use crate::config::NetworkConfig;

/// Signing accounts backing an [`EthersClient`].
enum Signers {
    /// Keys held by this process.
    Local(Vec<LocalWallet>),
    /// Accounts unlocked on the node, as returned by `eth_accounts`.
    Node(Vec<Address>),
}

/// [`ChainClient`] over an HTTP JSON-RPC endpoint.
pub struct EthersClient {
    provider: Provider<Http>,
    signers: Signers,
    confirmations: usize,
}

impl EthersClient {
    /// Connect to the node and resolve the signer set.
    ///
    /// With no wallets the node's own accounts are used, which is what a
    /// local development node exposes.
    pub async fn connect(
        network: &NetworkConfig,
        wallets: Vec<LocalWallet>,
    ) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| ChainError::Unreachable(format!("{}: {}", network.rpc_url, e)))?
            .interval(network.poll_interval);

        let chain_id = match network.chain_id {
            Some(id) => id,
            None => provider.get_chainid().await.map_err(classify)?.as_u64(),
        };

        let signers = if wallets.is_empty() {
            let accounts = provider.get_accounts().await.map_err(classify)?;
            tracing::debug!(count = accounts.len(), "Using node accounts as signers");
            Signers::Node(accounts)
        } else {
            Signers::Local(
                wallets
                    .into_iter()
                    .map(|wallet| wallet.with_chain_id(chain_id))
                    .collect(),
            )
        };

        tracing::info!(rpc_url = %network.rpc_url, chain_id, "Connected to node");

        Ok(Self {
            provider,
            signers,
            confirmations: network.confirmations,
        })
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(match &self.signers {
            Signers::Local(wallets) => wallets.iter().map(|w| w.address()).collect(),
            Signers::Node(accounts) => accounts.clone(),
        })
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(account, None)
            .await
            .map_err(classify)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError> {
        let mut tx = TransactionRequest::new().to(request.to).data(request.data);
        if let Some(from) = request.from {
            tx = tx.from(from);
        }
        let tx: TypedTransaction = tx.into();

        self.provider.call(&tx, None).await.map_err(classify)
    }

    async fn submit(&self, request: TxRequest) -> Result<TxHash, ChainError> {
        let mut tx = TransactionRequest::new()
            .from(request.from)
            .data(request.data)
            .value(request.value);
        if let Some(to) = request.to {
            tx = tx.to(to);
        }

        let tx_hash = match &self.signers {
            Signers::Local(wallets) => {
                let wallet = wallets
                    .iter()
                    .find(|w| w.address() == request.from)
                    .ok_or(ChainError::UnknownSigner(request.from))?;
                let client = SignerMiddleware::new(self.provider.clone(), wallet.clone());
                let pending = client.send_transaction(tx, None).await.map_err(classify)?;
                *pending
            }
            Signers::Node(accounts) => {
                if !accounts.contains(&request.from) {
                    return Err(ChainError::UnknownSigner(request.from));
                }
                let pending = self
                    .provider
                    .send_transaction(tx, None)
                    .await
                    .map_err(classify)?;
                *pending
            }
        };

        tracing::debug!(tx_hash = ?tx_hash, from = ?request.from, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<Confirmation, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, &self.provider)
            .confirmations(self.confirmations)
            .await
            .map_err(classify)?
            .ok_or(ChainError::Dropped(tx_hash))?;

        if receipt.status == Some(U64::zero()) {
            return Err(ChainError::Reverted(tx_hash));
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
        })
    }
}

/// A JSON-RPC error response means the node was reached and said no;
/// anything else is treated as a transport failure.
fn classify<E: MiddlewareError>(err: E) -> ChainError {
    match err.as_error_response() {
        Some(response) => ChainError::Rejected(response.message.clone()),
        None => ChainError::Unreachable(err.to_string()),
    }
}
