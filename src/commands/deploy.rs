use std::fmt;
use std::io::Write;

use ethers::abi::Token;
use ethers::types::Address;

use super::CommandError;
use crate::chain::{ChainClient, Confirmation};
use crate::contracts::tokens::format_address;
use crate::contracts::{parse_address, ContractFactory, ContractHandle};
use crate::wallet::format_balance;

/// A confirmed deployment.
#[derive(Debug)]
pub struct Deployment {
    pub contract: ContractHandle,
    pub deployer: Address,
    pub beneficiary: Address,
    pub confirmation: Confirmation,
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.contract.name(),
            format_address(self.contract.address())
        )
    }
}

/// Deploy a new instance with `beneficiary` as its only constructor argument,
/// signed by the first available signer, and wait for it to be mined.
///
/// The address is validated before the node is contacted.
pub async fn deploy_contract<W: Write>(
    factory: &ContractFactory,
    client: &dyn ChainClient,
    beneficiary: &str,
    out: &mut W,
) -> Result<Deployment, CommandError> {
    let beneficiary = parse_address(beneficiary)?;

    let accounts = client.accounts().await?;
    let deployer = *accounts
        .first()
        .ok_or(CommandError::NoSigner { index: 0, available: 0 })?;
    writeln!(out, "Deployer account: {}", format_address(deployer))?;

    let balance = client.balance(deployer).await?;
    writeln!(out, "Deployer balance: {} ETH", format_balance(balance))?;

    let pending = factory
        .deploy(deployer, &[Token::Address(beneficiary)])
        .await?;
    tracing::info!(
        contract = %factory.name(),
        tx_hash = ?pending.tx_hash(),
        "Waiting for deployment to be mined"
    );

    let (contract, confirmation) = pending.confirm().await?;
    tracing::info!(
        contract = %factory.name(),
        address = %format_address(contract.address()),
        block = ?confirmation.block_number,
        gas_used = ?confirmation.gas_used,
        "Deployed"
    );

    Ok(Deployment {
        contract,
        deployer,
        beneficiary,
        confirmation,
    })
}
