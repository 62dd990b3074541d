use std::fmt;
use std::io::Write;
use std::sync::Arc;

use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::parser::Step;
use super::CommandError;
use crate::chain::{ChainClient, Confirmation};
use crate::contracts::tokens::{format_address, format_tokens};
use crate::contracts::{ContractHandle, Outcome};
use crate::wallet::format_balance;

const SEPARATOR: &str = "-------------------------------------------------------------";

/// Result of one executed step.
#[derive(Debug)]
pub enum Report {
    Value {
        method: String,
        values: Vec<Token>,
    },
    Confirmed {
        method: String,
        signer: Address,
        confirmation: Confirmation,
    },
    Balance {
        signer: usize,
        address: Address,
        wei: U256,
    },
    Separator,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Value { method, values } => write!(f, "{}: {}", method, format_tokens(values)),
            Report::Confirmed {
                method,
                signer,
                confirmation,
            } => {
                write!(
                    f,
                    "{}: confirmed {:?} from {}",
                    method,
                    confirmation.tx_hash,
                    format_address(*signer)
                )?;
                if let Some(block) = confirmation.block_number {
                    write!(f, " in block {}", block)?;
                }
                if let Some(gas_used) = confirmation.gas_used {
                    write!(f, " (gas used {})", gas_used)?;
                }
                Ok(())
            }
            Report::Balance {
                signer,
                address,
                wei,
            } => write!(
                f,
                "Balance of signer {} ({}): {} ETH",
                signer,
                format_address(*address),
                format_balance(*wei)
            ),
            Report::Separator => f.write_str(SEPARATOR),
        }
    }
}

/// Runs steps one after another against an attached contract.
///
/// Every write is confirmed before the next step starts, so a step can
/// always observe the effects of the ones before it.
pub struct Interactor {
    contract: ContractHandle,
    client: Arc<dyn ChainClient>,
    signers: Vec<Address>,
}

impl Interactor {
    /// `contract` should come from [`ContractFactory::attach`]; it is
    /// rebound to signer 0 when it has no signer yet.
    ///
    /// [`ContractFactory::attach`]: crate::contracts::ContractFactory::attach
    pub async fn new(
        contract: ContractHandle,
        client: Arc<dyn ChainClient>,
    ) -> Result<Self, CommandError> {
        let signers = client.accounts().await?;
        let contract = match (contract.signer(), signers.first()) {
            (None, Some(first)) => contract.connect(*first),
            _ => contract,
        };

        Ok(Self {
            contract,
            client,
            signers,
        })
    }

    pub fn contract(&self) -> &ContractHandle {
        &self.contract
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    fn signer(&self, index: usize) -> Result<Address, CommandError> {
        self.signers
            .get(index)
            .copied()
            .ok_or(CommandError::NoSigner {
                index,
                available: self.signers.len(),
            })
    }

    /// Print the account that signs by default.
    pub fn announce<W: Write>(&self, out: &mut W) -> Result<(), CommandError> {
        let signer = self.contract.signer().ok_or(CommandError::NoSigner {
            index: 0,
            available: self.signers.len(),
        })?;
        writeln!(out, "Deployer account: {}", format_address(signer))?;
        Ok(())
    }

    /// Execute one step, waiting for confirmation if it writes.
    pub async fn execute(&self, step: &Step) -> Result<Report, CommandError> {
        match step {
            Step::Invoke {
                signer,
                method,
                args,
                value,
            } => {
                let contract = match signer {
                    Some(index) => self.contract.connect(self.signer(*index)?),
                    None => self.contract.clone(),
                };
                let invocation = contract.prepare(method, args, *value)?;

                match contract.invoke(invocation).await? {
                    Outcome::Value(values) => Ok(Report::Value {
                        method: method.clone(),
                        values,
                    }),
                    Outcome::Pending(pending) => {
                        tracing::info!(
                            method = %method,
                            tx_hash = ?pending.tx_hash(),
                            "Waiting for confirmation"
                        );
                        let confirmation = pending.confirm().await?;
                        Ok(Report::Confirmed {
                            method: method.clone(),
                            signer: contract.signer().unwrap_or_default(),
                            confirmation,
                        })
                    }
                }
            }
            Step::Balance { signer } => {
                let address = self.signer(*signer)?;
                let wei = self.client.balance(address).await?;
                Ok(Report::Balance {
                    signer: *signer,
                    address,
                    wei,
                })
            }
            Step::Separator => Ok(Report::Separator),
        }
    }

    /// Execute `steps` in order, writing each report as it completes.
    /// Stops at the first failure.
    pub async fn run<W: Write>(&self, steps: &[Step], out: &mut W) -> Result<usize, CommandError> {
        for (i, step) in steps.iter().enumerate() {
            tracing::debug!(step = i + 1, ?step, "Executing step");
            let report = self.execute(step).await?;
            writeln!(out, "{}", report)?;
        }
        Ok(steps.len())
    }
}
