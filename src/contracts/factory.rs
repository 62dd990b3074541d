use std::sync::Arc;

use ethers::abi::{Abi, Token};
use ethers::types::{Address, Bytes, TxHash, U256};

use super::artifact::{Artifact, ArtifactStore};
use super::handle::ContractHandle;
use super::ContractError;
use crate::chain::{ChainClient, Confirmation, TxRequest};

/// Deploys new instances of a named artifact or attaches to existing ones.
pub struct ContractFactory {
    name: String,
    abi: Arc<Abi>,
    bytecode: Bytes,
    client: Arc<dyn ChainClient>,
}

impl ContractFactory {
    pub fn new(artifact: Artifact, client: Arc<dyn ChainClient>) -> Self {
        Self {
            name: artifact.contract_name,
            abi: Arc::new(artifact.abi),
            bytecode: artifact.bytecode,
            client,
        }
    }

    /// Look the artifact up by contract name.
    pub fn load(
        store: &ArtifactStore,
        name: &str,
        client: Arc<dyn ChainClient>,
    ) -> Result<Self, ContractError> {
        Ok(Self::new(store.load(name)?, client))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn deployment_data(&self, args: &[Token]) -> Result<Bytes, ContractError> {
        if self.bytecode.is_empty() {
            return Err(ContractError::NotDeployable(self.name.clone()));
        }

        let invalid = |reason: String| ContractError::InvalidArguments {
            method: "constructor".to_string(),
            reason,
        };

        match self.abi.constructor() {
            Some(constructor) => {
                if constructor.inputs.len() != args.len() {
                    return Err(invalid(format!(
                        "expected {} argument(s), got {}",
                        constructor.inputs.len(),
                        args.len()
                    )));
                }
                constructor
                    .encode_input(self.bytecode.to_vec(), args)
                    .map(Bytes::from)
                    .map_err(|e| invalid(e.to_string()))
            }
            None if args.is_empty() => Ok(self.bytecode.clone()),
            None => Err(invalid("contract has no constructor".to_string())),
        }
    }

    /// Submit the creation transaction from `signer`.
    ///
    /// Arguments are validated and encoded before anything is sent.
    pub async fn deploy(
        &self,
        signer: Address,
        args: &[Token],
    ) -> Result<PendingDeployment, ContractError> {
        let data = self.deployment_data(args)?;

        let tx_hash = self
            .client
            .submit(TxRequest {
                from: signer,
                to: None,
                data,
                value: U256::zero(),
            })
            .await?;

        tracing::info!(contract = %self.name, tx_hash = ?tx_hash, "Deployment submitted");

        Ok(PendingDeployment {
            tx_hash,
            name: self.name.clone(),
            abi: self.abi.clone(),
            client: self.client.clone(),
            signer,
        })
    }

    /// Bind to an existing instance. Sends nothing; whether `address` really
    /// holds this contract only shows on the first call.
    pub fn attach(&self, address: Address, signer: Option<Address>) -> ContractHandle {
        tracing::info!(contract = %self.name, address = ?address, "Attached to contract");
        ContractHandle::new(
            self.name.clone(),
            address,
            self.abi.clone(),
            self.client.clone(),
            signer,
        )
    }
}

/// Contract creation submitted but not yet mined.
#[must_use = "the contract address is only known after confirmation"]
pub struct PendingDeployment {
    tx_hash: TxHash,
    name: String,
    abi: Arc<Abi>,
    client: Arc<dyn ChainClient>,
    signer: Address,
}

impl std::fmt::Debug for PendingDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDeployment")
            .field("name", &self.name)
            .field("tx_hash", &self.tx_hash)
            .field("signer", &self.signer)
            .finish()
    }
}

impl PendingDeployment {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Wait for the creation to be mined and return a handle bound to the
    /// deploying signer.
    pub async fn confirm(self) -> Result<(ContractHandle, Confirmation), ContractError> {
        let confirmation = self.client.confirm(self.tx_hash).await?;
        let address = confirmation
            .contract_address
            .ok_or(ContractError::MissingContractAddress(self.tx_hash))?;

        let handle = ContractHandle::new(self.name, address, self.abi, self.client, Some(self.signer));
        Ok((handle, confirmation))
    }
}
