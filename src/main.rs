use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blockleaks_scripts::chain::{ChainClient, EthersClient};
use blockleaks_scripts::cli::{Cli, Commands};
use blockleaks_scripts::commands::{self, Interactor, Step};
use blockleaks_scripts::config::Config;
use blockleaks_scripts::contracts::tokens::format_address;
use blockleaks_scripts::contracts::{parse_address, ArtifactStore, ContractFactory};
use blockleaks_scripts::wallet;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blockleaks=info,blockleaks_scripts=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Script failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::from_env()?;
    cli.apply(&mut config)?;

    // Everything the operator supplied is checked before touching the node
    let steps = match &cli.command {
        Commands::Interact {
            script: Some(path), ..
        } => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            commands::parse_script(&text)?
        }
        Commands::Interact { steps, .. } if !steps.is_empty() => commands::parse_steps(steps)?,
        _ => commands::default_steps(),
    };
    let target = match &cli.command {
        Commands::Deploy { .. } => config.multisig_address()?,
        Commands::Interact { .. } => config.contract_address()?,
    };
    parse_address(target)?;

    let wallets = wallet::load_wallets(&config.private_keys)?;
    let client: Arc<dyn ChainClient> =
        Arc::new(EthersClient::connect(&config.network, wallets).await?);

    let store = ArtifactStore::new(&config.contracts.artifacts_dir);
    let factory = ContractFactory::load(&store, &config.contracts.contract_name, client.clone())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Deploy { .. } => {
            let deployment = commands::deploy_contract(&factory, client.as_ref(), target, &mut out).await?;
            tracing::info!(
                multisig = %format_address(deployment.beneficiary),
                tx_hash = ?deployment.confirmation.tx_hash,
                "Multisig set as beneficiary"
            );
            writeln!(out, "{}", deployment)?;
        }
        Commands::Interact { .. } => {
            let contract = factory.attach(parse_address(target)?, None);
            writeln!(
                out,
                "{} has been loaded at {}",
                factory.name(),
                format_address(contract.address())
            )?;
            let interactor = Interactor::new(contract, client).await?;
            interactor.announce(&mut out)?;
            run_steps(&interactor, &steps, &mut out).await?;
        }
    }

    Ok(())
}

async fn run_steps<W: Write>(
    interactor: &Interactor,
    steps: &[Step],
    out: &mut W,
) -> anyhow::Result<()> {
    let count = interactor.run(steps, out).await?;
    tracing::info!(steps = count, "Interaction finished");
    Ok(())
}
