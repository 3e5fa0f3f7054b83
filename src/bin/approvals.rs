use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nft_approvals::config::Config;
use nft_approvals::contracts::RpcContractBinder;
use nft_approvals::discovery::ApprovalSession;
use nft_approvals::indexer::MoralisClient;
use nft_approvals::operators::OperatorRegistry;
use nft_approvals::report::commands::{
    RevokeQuery, cmd_about, cmd_operators, cmd_revoke, cmd_scan,
};
use nft_approvals::report::{Explorer, OutputFormat};
use nft_approvals::rpc::RpcClient;
use nft_approvals::transactor::LoggingTransactor;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "approvals")]
#[command(about = "Find and revoke NFT operator approvals", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections where a known operator holds an approval
    Scan,
    /// Clear the approvals held on a contract
    Revoke {
        contract: String,

        #[arg(long)]
        operator: Option<String>,
    },
    /// List the operators that are checked
    Operators,
    /// What is this?
    About,
}

const DEFAULT_LOG_FILTER: &str = "warn,nft_approvals=info,approvals=info";

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Invalid RUST_LOG filters")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::About => return cmd_about(),
        Commands::Operators => {
            let explorer = Explorer::new(&Config::explorer_url_from_env());
            return cmd_operators(&OperatorRegistry::default(), &explorer, &format);
        }
        _ => {}
    }

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let signer = config
        .wallet_private_key
        .as_deref()
        .map(PrivateKeySigner::from_str)
        .transpose()
        .context("Invalid WALLET_PRIVATE_KEY")?;
    match &signer {
        Some(signer) => info!("Wallet: {}", signer.address()),
        None => warn!("WALLET_PRIVATE_KEY not set, approval discovery needs a signer"),
    }

    let client = RpcClient::new(&config.json_rpc_urls, signer.clone())?;
    let chain_id = client.get_chain_id().await?;
    info!("RPC client connected to chain {}", chain_id);

    let indexer = MoralisClient::new(
        &config.moralis_api_url,
        &config.moralis_api_key,
        config.moralis_max_pages,
    )?;

    let session = ApprovalSession::new(
        Arc::new(indexer),
        Arc::new(RpcContractBinder::new(client)),
        Arc::new(LoggingTransactor),
        OperatorRegistry::default(),
        config.failure_policy,
    );
    let explorer = Explorer::new(&config.explorer_url);

    let result = match cli.command {
        Commands::Scan => cmd_scan(&session, signer.as_ref(), chain_id, &explorer, &format).await,
        Commands::Revoke { contract, operator } => {
            let query = RevokeQuery { contract, operator };
            cmd_revoke(
                &session,
                signer.as_ref(),
                chain_id,
                query,
                &explorer,
                &format,
            )
            .await
        }
        Commands::Operators | Commands::About => Ok(()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
