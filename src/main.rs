use alloy::primitives::Address;
use anyhow::{Context, Result};
use bera_multicall::{
    Aggregator,
    addresses::deployments,
    chains::{CONFIGURED_CHAINS, chain_config},
    constants::{CHAIN_ID_ENV, MASTER_CHEF_ENV, RPC_URL_ENV},
    farms::{FarmFetcherV3, cake_per_second},
    multicall_contract,
    teams::{TeamsClient, profile_address},
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Chain to query
    #[arg(long, value_name = "CHAIN_ID", env = CHAIN_ID_ENV, default_value_t = 4002)]
    chain_id: u64,

    /// RPC URL, overriding the chain's configured endpoint
    #[arg(long, value_name = "URL", env = RPC_URL_ENV)]
    rpc_url: Option<Url>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured networks and their deployments
    Chains,
    /// Fetch one profile team merged with its static entry
    Team { id: u32 },
    /// Fetch all profile teams merged with the static list
    Teams,
    /// Show the farm manager's pool count and reward rate
    MasterChef {
        /// MasterChefV3 address, overriding the address book
        #[arg(long, value_name = "ADDRESS", env = MASTER_CHEF_ENV)]
        address: Option<Address>,
    },
}

fn connect(chain_id: u64, rpc_url: Option<Url>) -> Result<impl Aggregator> {
    let rpc_url = chain_config(chain_id)
        .and_then(|chain| chain.with_rpc(rpc_url))
        .with_context(|| format!("No RPC endpoint for chain {chain_id}"))?;
    info!(chain_id, %rpc_url, "connecting");
    multicall_contract(chain_id, rpc_url)
        .with_context(|| format!("No aggregator configured for chain {chain_id}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Chains => {
            for chain in CONFIGURED_CHAINS {
                println!("{}", serde_json::to_string_pretty(chain)?);
                for (kind, address) in deployments(chain.chain_id) {
                    println!("  {kind:?}: {}", chain.explorer_address_url(&address));
                }
            }
        }
        Command::Team { id } => {
            let aggregator = connect(cli.chain_id, cli.rpc_url)?;
            let client = TeamsClient::new(aggregator, profile_address(cli.chain_id)?)?;
            let team = client
                .fetch_team(id)
                .await
                .with_context(|| format!("Failed to fetch team {id}"))?;
            println!("{}", serde_json::to_string_pretty(&team)?);
        }
        Command::Teams => {
            let aggregator = connect(cli.chain_id, cli.rpc_url)?;
            let client = TeamsClient::new(aggregator, profile_address(cli.chain_id)?)?;
            let teams = client.fetch_teams().await.context("Failed to fetch teams")?;
            println!("{}", serde_json::to_string_pretty(&teams)?);
        }
        Command::MasterChef { address } => {
            let aggregator = connect(cli.chain_id, cli.rpc_url)?;
            let mut fetcher = FarmFetcherV3::new(aggregator)?;
            if let Some(address) = address {
                fetcher = fetcher.with_master_chef(cli.chain_id, address);
            }
            let master_chef = fetcher.master_chef(cli.chain_id)?;
            let data = fetcher
                .fetch_master_chef_data(master_chef)
                .await
                .with_context(|| format!("Failed to read MasterChefV3 at {master_chef}"))?;

            println!("MasterChefV3:       {master_chef}");
            println!("Pools:              {}", data.pool_length);
            println!("Total alloc point:  {}", data.total_alloc_point);
            println!(
                "CAKE per second:    {}",
                cake_per_second(data.latest_period_cake_per_second)?
            );
            println!("Testnet:            {}", fetcher.is_testnet(cli.chain_id));
        }
    }

    Ok(())
}
