#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::abi::{self, Abi, ParamType, Token};
use ethers::types::{Address, Bytes, TxHash, U256};
use ethers::utils::{get_contract_address, keccak256};

use blockleaks_scripts::chain::{CallRequest, ChainClient, ChainError, Confirmation, TxRequest};
use blockleaks_scripts::contracts::{Artifact, ContractFactory};

pub const ARTIFACT_JSON: &str = include_str!("../fixtures/BlockLeaks.json");

pub const MULTISIG: &str = "0x9090A5d516f2054007bD184caf55760B51fcFBfD";

pub const ONE_ETHER: u64 = 1_000_000_000_000_000_000;

pub fn artifact() -> Artifact {
    Artifact::from_json("BlockLeaks", ARTIFACT_JSON).unwrap()
}

pub fn factory(chain: &Arc<DevChain>) -> ContractFactory {
    ContractFactory::new(artifact(), chain.clone())
}

#[derive(Debug, Clone)]
struct Message {
    message_type: Vec<u8>,
    group_id: Vec<u8>,
    title: String,
    content: String,
    location: String,
    owner: Address,
    amount: U256,
}

#[derive(Debug, Default)]
struct Instance {
    multisig: Address,
    messages: Vec<Message>,
}

#[derive(Debug)]
struct Queued {
    request: TxRequest,
    nonce: u64,
}

#[derive(Default)]
struct State {
    accounts: Vec<Address>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    instances: HashMap<Address, Instance>,
    queued: HashMap<TxHash, Queued>,
    receipts: HashMap<TxHash, Result<Confirmation, ()>>,
    block: u64,
    submitted: usize,
}

/// In-memory node running the BlockLeaks contract logic.
///
/// Submitted transactions are held back until they are confirmed, so tests
/// can observe the window between acceptance and inclusion.
pub struct DevChain {
    abi: Abi,
    creation_code: Bytes,
    state: Mutex<State>,
}

impl DevChain {
    /// `funded` accounts, each holding 100 ether.
    pub fn new(funded: usize) -> Self {
        let artifact = artifact();
        let mut state = State::default();
        for i in 0..funded {
            let account = Address::from_low_u64_be(0xa000 + i as u64);
            state.accounts.push(account);
            state.balances.insert(account, U256::from(ONE_ETHER) * U256::from(100));
        }

        Self {
            abi: artifact.abi,
            creation_code: artifact.bytecode,
            state: Mutex::new(state),
        }
    }

    pub fn account(&self, index: usize) -> Address {
        self.state.lock().unwrap().accounts[index]
    }

    /// Number of transactions the node has accepted so far.
    pub fn submitted(&self) -> usize {
        self.state.lock().unwrap().submitted
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.state.lock().unwrap().instances.contains_key(&address)
    }

    pub fn multisig_of(&self, address: Address) -> Option<Address> {
        self.state
            .lock()
            .unwrap()
            .instances
            .get(&address)
            .map(|instance| instance.multisig)
    }

    fn selector_target(&self, data: &[u8]) -> Result<(String, Vec<Token>), String> {
        if data.len() < 4 {
            return Err("missing selector".to_string());
        }
        let function = self
            .abi
            .functions()
            .find(|f| f.short_signature() == data[..4])
            .ok_or_else(|| "unknown selector".to_string())?;
        let args = function
            .decode_input(&data[4..])
            .map_err(|e| e.to_string())?;
        Ok((function.name.clone(), args))
    }
}

fn uint_list(token: &Token) -> Vec<usize> {
    match token {
        Token::Array(items) => items
            .iter()
            .filter_map(|item| item.clone().into_uint())
            .map(|id| id.as_usize())
            .collect(),
        _ => Vec::new(),
    }
}

fn execute_view(
    instance: &Instance,
    method: &str,
    args: &[Token],
) -> Result<Vec<Token>, String> {
    match method {
        "messageCount" => Ok(vec![Token::Uint(instance.messages.len().into())]),
        "multisig" => Ok(vec![Token::Address(instance.multisig)]),
        "messages" => {
            let id = args[0].clone().into_uint().unwrap_or_default().as_usize();
            let message = instance
                .messages
                .get(id)
                .ok_or_else(|| "index out of bounds".to_string())?;
            Ok(vec![
                Token::FixedBytes(message.message_type.clone()),
                Token::FixedBytes(message.group_id.clone()),
                Token::String(message.title.clone()),
                Token::String(message.content.clone()),
                Token::String(message.location.clone()),
                Token::Address(message.owner),
                Token::Uint(message.amount),
            ])
        }
        "getMessagesByGroupId" => {
            let ids = instance
                .messages
                .iter()
                .enumerate()
                .filter(|(_, message)| Token::FixedBytes(message.group_id.clone()) == args[0])
                .map(|(id, _)| Token::Uint(id.into()))
                .collect();
            Ok(vec![Token::Array(ids)])
        }
        other => Err(format!("{} is not a view", other)),
    }
}

impl State {
    fn transfer(&mut self, to: Address, amount: U256) {
        *self.balances.entry(to).or_default() += amount;
    }

    /// Applies a mined transaction. `Err` means it reverted.
    fn apply(&mut self, chain: &DevChain, queued: &Queued) -> Result<Option<Address>, String> {
        let request = &queued.request;
        let Some(to) = request.to else {
            let creation_code: &[u8] = &chain.creation_code;
            let args = request
                .data
                .strip_prefix(creation_code)
                .ok_or_else(|| "unknown creation code".to_string())
                .and_then(|encoded| {
                    abi::decode(&[ParamType::Address], encoded).map_err(|e| e.to_string())
                })?;
            let multisig = args[0].clone().into_address().unwrap_or_default();
            let address = get_contract_address(request.from, queued.nonce);
            self.instances.insert(
                address,
                Instance {
                    multisig,
                    messages: Vec::new(),
                },
            );
            return Ok(Some(address));
        };

        if !self.instances.contains_key(&to) {
            self.transfer(to, request.value);
            return Ok(None);
        }

        let (method, args) = chain.selector_target(&request.data)?;
        let mut payouts = Vec::new();
        {
            let instance = self
                .instances
                .get_mut(&to)
                .ok_or_else(|| "no contract".to_string())?;
            match method.as_str() {
                "writeMessage" => {
                    let text = |i: usize| args[i].clone().into_string().unwrap_or_default();
                    instance.messages.push(Message {
                        message_type: args[0].clone().into_fixed_bytes().unwrap_or_default(),
                        group_id: args[1].clone().into_fixed_bytes().unwrap_or_default(),
                        title: text(2),
                        content: text(3),
                        location: text(4),
                        owner: request.from,
                        amount: request.value,
                    });
                }
                "withdrawToMsgOwners" | "withdrawSomeToMultisig" => {
                    if request.from != instance.multisig {
                        return Err("caller is not the multisig".to_string());
                    }
                    let multisig = instance.multisig;
                    for id in uint_list(&args[0]) {
                        let message = instance
                            .messages
                            .get_mut(id)
                            .ok_or_else(|| "index out of bounds".to_string())?;
                        let recipient = if method == "withdrawToMsgOwners" {
                            message.owner
                        } else {
                            multisig
                        };
                        payouts.push((recipient, std::mem::take(&mut message.amount)));
                    }
                }
                _ => return Err(format!("{} cannot be sent as a transaction", method)),
            }
        }

        for (recipient, amount) in payouts {
            self.transfer(recipient, amount);
        }
        Ok(None)
    }
}

#[async_trait]
impl ChainClient for DevChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(&account).copied().unwrap_or_default())
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError> {
        let state = self.state.lock().unwrap();
        let Some(instance) = state.instances.get(&request.to) else {
            return Ok(Bytes::default());
        };

        let (method, args) = self
            .selector_target(&request.data)
            .map_err(|reason| ChainError::Rejected(format!("execution reverted: {}", reason)))?;
        let values = execute_view(instance, &method, &args)
            .map_err(|reason| ChainError::Rejected(format!("execution reverted: {}", reason)))?;
        Ok(abi::encode(&values).into())
    }

    async fn submit(&self, request: TxRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        if !state.accounts.contains(&request.from) {
            return Err(ChainError::UnknownSigner(request.from));
        }

        let balance = state.balances.get(&request.from).copied().unwrap_or_default();
        if balance < request.value {
            return Err(ChainError::Rejected(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }
        state.balances.insert(request.from, balance - request.value);

        let nonce = state.nonces.entry(request.from).or_default();
        let current = *nonce;
        *nonce += 1;

        let mut preimage = request.from.as_bytes().to_vec();
        preimage.extend_from_slice(&current.to_be_bytes());
        let tx_hash = TxHash::from(keccak256(preimage));

        state.submitted += 1;
        state.queued.insert(
            tx_hash,
            Queued {
                request,
                nonce: current,
            },
        );
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<Confirmation, ChainError> {
        let mut state = self.state.lock().unwrap();
        if let Some(receipt) = state.receipts.get(&tx_hash) {
            return receipt.clone().map_err(|_| ChainError::Reverted(tx_hash));
        }

        let queued = state.queued.remove(&tx_hash).ok_or(ChainError::Dropped(tx_hash))?;
        state.block += 1;
        let block = state.block;

        let receipt = match state.apply(self, &queued) {
            Ok(contract_address) => Ok(Confirmation {
                tx_hash,
                block_number: Some(block),
                contract_address,
                gas_used: Some(U256::from(21_000)),
            }),
            Err(reason) => {
                // reverted value goes back to the sender
                state.transfer(queued.request.from, queued.request.value);
                tracing::debug!(?tx_hash, %reason, "Reverted");
                Err(())
            }
        };
        state.receipts.insert(tx_hash, receipt.clone());
        receipt.map_err(|_| ChainError::Reverted(tx_hash))
    }
}
