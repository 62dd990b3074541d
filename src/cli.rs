use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{check_rpc_url, Config, ConfigError};

/// Deploy and interact with the BlockLeaks contract.
///
/// Settings come from the environment (and `.env`); flags override them.
#[derive(Parser, Debug)]
#[command(name = "blockleaks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON-RPC endpoint [env: RPC_URL]
    #[arg(global = true, long)]
    pub rpc_url: Option<String>,

    /// Directory searched for contract artifacts [env: ARTIFACTS_DIR]
    #[arg(global = true, long)]
    pub artifacts: Option<PathBuf>,

    /// Contract (artifact) name [env: CONTRACT_NAME]
    #[arg(global = true, long)]
    pub contract: Option<String>,

    /// Confirmations to wait for each transaction [env: CONFIRMATIONS]
    #[arg(global = true, long)]
    pub confirmations: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a new instance with the multisig as constructor argument
    Deploy {
        /// Multisig (beneficiary) address [env: MULTISIG_ADDRESS]
        #[arg(long)]
        multisig: Option<String>,
    },

    /// Attach to a deployed instance and run calls against it
    Interact {
        /// Address of the deployed contract [env: CONTRACT_ADDRESS]
        #[arg(long)]
        address: Option<String>,

        /// Step to run, repeatable: `[as <signer>] <method> [args...] [value=<amount>]`,
        /// `balance <signer>` or `---`
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<String>,

        /// File with one step per line
        #[arg(long, conflicts_with = "steps")]
        script: Option<PathBuf>,
    },
}

impl Cli {
    /// Apply flag overrides on top of environment configuration.
    pub fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(rpc_url) = &self.rpc_url {
            config.network.rpc_url = check_rpc_url(rpc_url)?;
        }
        if let Some(artifacts) = &self.artifacts {
            config.contracts.artifacts_dir = artifacts.clone();
        }
        if let Some(contract) = &self.contract {
            config.contracts.contract_name = contract.clone();
        }
        if let Some(confirmations) = self.confirmations {
            config.network.confirmations = confirmations;
        }
        match &self.command {
            Commands::Deploy {
                multisig: Some(multisig),
            } => config.contracts.multisig_address = Some(multisig.clone()),
            Commands::Interact {
                address: Some(address),
                ..
            } => config.contracts.contract_address = Some(address.clone()),
            _ => {}
        }
        Ok(())
    }
}
