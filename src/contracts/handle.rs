use std::sync::Arc;

use ethers::abi::{Abi, Function, StateMutability, Token};
use ethers::types::{Address, TxHash, U256};

use super::tokens::tokenize_args;
use super::ContractError;
use crate::chain::{CallRequest, ChainClient, Confirmation, TxRequest};

/// A deployed contract: fixed address, ABI, and the signer used for writes.
#[derive(Clone)]
pub struct ContractHandle {
    name: String,
    address: Address,
    abi: Arc<Abi>,
    client: Arc<dyn ChainClient>,
    signer: Option<Address>,
}

/// Encoded-ready invocation of one ABI function.
#[derive(Debug, Clone)]
pub struct MethodCall {
    function: Function,
    args: Vec<Token>,
}

impl MethodCall {
    pub fn method(&self) -> &str {
        &self.function.name
    }

    pub fn args(&self) -> &[Token] {
        &self.args
    }

    fn is_read_only(&self) -> bool {
        matches!(
            self.function.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }
}

/// What to do with a [`MethodCall`].
#[derive(Debug, Clone)]
pub enum Invocation {
    /// `eth_call`: returns values immediately, changes nothing.
    Query(MethodCall),
    /// Signed transaction, optionally transferring `value` wei.
    Command { call: MethodCall, value: U256 },
}

impl Invocation {
    pub fn method(&self) -> &str {
        match self {
            Invocation::Query(call) | Invocation::Command { call, .. } => call.method(),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Value(Vec<Token>),
    Pending(PendingWrite),
}

/// A submitted write. Its effects are not observable until [`confirm`]
/// returns; two pending writes have no ordering between them.
///
/// [`confirm`]: PendingWrite::confirm
#[must_use = "a write has no observable effect until it is confirmed"]
pub struct PendingWrite {
    method: String,
    tx_hash: TxHash,
    client: Arc<dyn ChainClient>,
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrite")
            .field("method", &self.method)
            .field("tx_hash", &self.tx_hash)
            .finish()
    }
}

impl PendingWrite {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Wait for the transaction to be mined. Reverts surface as errors.
    pub async fn confirm(self) -> Result<Confirmation, ContractError> {
        let confirmation = self.client.confirm(self.tx_hash).await?;
        tracing::debug!(
            method = %self.method,
            tx_hash = ?self.tx_hash,
            block = ?confirmation.block_number,
            "Write confirmed"
        );
        Ok(confirmation)
    }
}

impl ContractHandle {
    pub(crate) fn new(
        name: String,
        address: Address,
        abi: Arc<Abi>,
        client: Arc<dyn ChainClient>,
        signer: Option<Address>,
    ) -> Self {
        Self {
            name,
            address,
            abi,
            client,
            signer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    /// Same contract, writes signed by `signer` instead.
    pub fn connect(&self, signer: Address) -> Self {
        Self {
            signer: Some(signer),
            ..self.clone()
        }
    }

    /// Resolve `method`, picking among overloads by argument count.
    pub fn function(&self, method: &str, arity: usize) -> Result<&Function, ContractError> {
        self.abi
            .functions_by_name(method)
            .ok()
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| ContractError::UnknownMethod {
                contract: self.name.clone(),
                method: method.to_string(),
                arity,
            })
    }

    /// Build a call from already typed arguments.
    pub fn method_call(&self, method: &str, args: Vec<Token>) -> Result<MethodCall, ContractError> {
        let function = self.function(method, args.len())?;
        let kinds: Vec<_> = function.inputs.iter().map(|p| p.kind.clone()).collect();
        if !Token::types_check(&args, &kinds) {
            return Err(ContractError::InvalidArguments {
                method: method.to_string(),
                reason: format!("arguments do not match {}", function.signature()),
            });
        }
        Ok(MethodCall {
            function: function.clone(),
            args,
        })
    }

    /// Build an invocation from textual arguments.
    ///
    /// View and pure functions become queries, everything else a command.
    /// A value is only accepted for payable functions.
    pub fn prepare(
        &self,
        method: &str,
        args: &[String],
        value: U256,
    ) -> Result<Invocation, ContractError> {
        let function = self.function(method, args.len())?;
        let tokens = tokenize_args(&function.inputs, args).map_err(|reason| {
            ContractError::InvalidArguments {
                method: method.to_string(),
                reason,
            }
        })?;
        let call = MethodCall {
            function: function.clone(),
            args: tokens,
        };

        if !value.is_zero() && call.function.state_mutability != StateMutability::Payable {
            return Err(ContractError::NotPayable(method.to_string()));
        }

        Ok(if call.is_read_only() {
            Invocation::Query(call)
        } else {
            Invocation::Command { call, value }
        })
    }

    pub async fn invoke(&self, invocation: Invocation) -> Result<Outcome, ContractError> {
        match invocation {
            Invocation::Query(call) => self.query(&call).await.map(Outcome::Value),
            Invocation::Command { call, value } => {
                self.submit(&call, value).await.map(Outcome::Pending)
            }
        }
    }

    pub async fn query(&self, call: &MethodCall) -> Result<Vec<Token>, ContractError> {
        let data = self.encode(call)?;
        let output = self
            .client
            .call(CallRequest {
                from: self.signer,
                to: self.address,
                data: data.into(),
            })
            .await?;

        if output.is_empty() && !call.function.outputs.is_empty() {
            return Err(ContractError::NoContractCode {
                method: call.method().to_string(),
                address: self.address,
            });
        }

        call.function
            .decode_output(&output)
            .map_err(|e| ContractError::Decode {
                method: call.method().to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn submit(&self, call: &MethodCall, value: U256) -> Result<PendingWrite, ContractError> {
        let from = self
            .signer
            .ok_or_else(|| ContractError::NoSigner(call.method().to_string()))?;
        let data = self.encode(call)?;

        let tx_hash = self
            .client
            .submit(TxRequest {
                from,
                to: Some(self.address),
                data: data.into(),
                value,
            })
            .await?;

        tracing::info!(
            contract = %self.name,
            method = %call.method(),
            tx_hash = ?tx_hash,
            "Transaction submitted"
        );

        Ok(PendingWrite {
            method: call.method().to_string(),
            tx_hash,
            client: self.client.clone(),
        })
    }

    /// Query by name with typed arguments.
    pub async fn read(&self, method: &str, args: Vec<Token>) -> Result<Vec<Token>, ContractError> {
        let call = self.method_call(method, args)?;
        self.query(&call).await
    }

    /// Submit by name with typed arguments.
    pub async fn write(
        &self,
        method: &str,
        args: Vec<Token>,
        value: U256,
    ) -> Result<PendingWrite, ContractError> {
        let call = self.method_call(method, args)?;
        if !value.is_zero() && call.function.state_mutability != StateMutability::Payable {
            return Err(ContractError::NotPayable(method.to_string()));
        }
        self.submit(&call, value).await
    }

    fn encode(&self, call: &MethodCall) -> Result<Vec<u8>, ContractError> {
        call.function
            .encode_input(&call.args)
            .map_err(|e| ContractError::InvalidArguments {
                method: call.method().to_string(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("signer", &self.signer)
            .finish()
    }
}
