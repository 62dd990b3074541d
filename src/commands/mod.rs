pub mod deploy;
pub mod interact;
pub mod parser;

pub use deploy::{deploy_contract, Deployment};
pub use interact::{Interactor, Report};
pub use parser::{default_steps, parse_script, parse_steps, Step, StepError, DEFAULT_GROUP_ID};

use thiserror::Error;

use crate::chain::ChainError;
use crate::contracts::ContractError;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("No signer at index {index} ({available} available)")]
    NoSigner { index: usize, available: usize },
    #[error(transparent)]
    Step(#[from] StepError),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
