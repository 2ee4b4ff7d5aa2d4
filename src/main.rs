use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, error};
use std::{fs::File, io, path::PathBuf, process::ExitCode};

use staker_airdrop::{
    config::{RuntimeConfig, SimulationRequest, StakerQuery},
    constants::{
        configured, Env, DEFAULT_TOKEN_SYMBOL, DEFAULT_WEIGHT_AMOUNT, DEFAULT_WEIGHT_DURATION,
        DEFAULT_WEIGHT_SEIGNIORAGE,
    },
    error::AirdropError,
    export::{write_json, write_scores_csv, write_stakers_csv},
    service::AirdropService,
    sources::{BalanceSource, NoBalances, OnchainBalances, SnapshotFile, StakerSource, SubgraphClient},
    utils::setup_logger,
};

#[derive(Parser)]
#[command(name = "staker-airdrop")]
#[command(about = "Staker lookup and airdrop allocation simulator for WTON stakers")]
#[command(version)]
struct Cli {
    /// Read stakers from a saved JSON snapshot instead of the subgraph
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Log level for this crate (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Show a spinner while paging through the subgraph
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stakers that deposited inside a time window
    Stakers {
        /// Window start (YYYY-MM-DD, RFC3339 or unix seconds)
        #[arg(long)]
        from: String,

        /// Window end, inclusive
        #[arg(long)]
        to: String,

        /// Minimum single deposit, in whole WTON
        #[arg(long)]
        min_amount: f64,

        /// Also write the stakers as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Simulate an airdrop over all depositors
    Simulate {
        #[arg(long)]
        from: String,

        /// Snapshot date; staking duration is measured up to here
        #[arg(long)]
        to: String,

        /// Tokens to distribute
        #[arg(long)]
        total_tokens: f64,

        #[arg(long, default_value = DEFAULT_TOKEN_SYMBOL)]
        token_symbol: String,

        /// Weight of current stake (0-100)
        #[arg(long, default_value_t = DEFAULT_WEIGHT_AMOUNT)]
        w_a: u8,

        /// Weight of staking duration (0-100)
        #[arg(long, default_value_t = DEFAULT_WEIGHT_DURATION)]
        w_d: u8,

        /// Weight of seigniorage (0-100)
        #[arg(long, default_value_t = DEFAULT_WEIGHT_SEIGNIORAGE)]
        w_s: u8,

        /// Minimum lifetime deposit, in whole WTON
        #[arg(long, default_value_t = 0.0)]
        min_amount: f64,

        /// Also write the allocations as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let env = Env::new();
    let level = cli
        .log_level
        .clone()
        .or_else(|| configured(&env.log_level))
        .unwrap_or_else(|| "info".to_string());
    if let Err(e) = setup_logger(&level) {
        eprintln!("failed to install logger: {}", e);
    }

    match dispatch(cli, &env).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<AirdropError>() {
            Some(err) if err.is_validation() => {
                eprintln!("{} {}", "invalid request:".red(), err);
                ExitCode::from(2)
            }
            _ => {
                error!("{:#}", e);
                eprintln!("{}", "internal error".red().bold());
                ExitCode::FAILURE
            }
        },
    }
}

/// Offline snapshot runs never read the network settings.
async fn dispatch(cli: Cli, env: &Env) -> Result<()> {
    if let Some(path) = &cli.snapshot {
        let snapshot = SnapshotFile::load(path)?;
        return run(AirdropService::new(snapshot.clone(), snapshot), cli.command).await;
    }

    let runtime = RuntimeConfig::from_env(env)?;
    let subgraph_url = runtime
        .subgraph_url
        .clone()
        .ok_or_else(|| anyhow!("SUBGRAPH_URL is not configured; pass --snapshot to run offline"))?;
    let subgraph = SubgraphClient::new(subgraph_url)
        .with_page_size(runtime.page_size)
        .with_progress(cli.progress);

    match &runtime.rpc_url {
        Some(rpc_url) => {
            debug!("Using RPC endpoint for stakeOf lookups");
            let balances = OnchainBalances::new(rpc_url)?.with_chunk_size(runtime.multicall_chunk);
            run(AirdropService::new(subgraph, balances), cli.command).await
        }
        None => run(AirdropService::new(subgraph, NoBalances), cli.command).await,
    }
}

async fn run<S: StakerSource, B: BalanceSource>(
    service: AirdropService<S, B>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Stakers {
            from,
            to,
            min_amount,
            csv,
        } => {
            let response = service
                .list_stakers(&StakerQuery { from, to, min_amount })
                .await?;
            if let Some(path) = csv {
                write_stakers_csv(File::create(&path)?, &response)?;
            }
            write_json(io::stdout().lock(), &response)?;
            println!();
            eprintln!(
                "{} {}",
                "Unique stakers:".bold(),
                response.summary.unique_stakers
            );
        }
        Command::Simulate {
            from,
            to,
            total_tokens,
            token_symbol,
            w_a,
            w_d,
            w_s,
            min_amount,
            csv,
        } => {
            let request = SimulationRequest {
                from,
                to,
                min_amount,
                total_tokens,
                token_symbol,
                w_a,
                w_d,
                w_s,
            };
            let result = service.simulate_airdrop(&request).await?;
            if let Some(path) = csv {
                write_scores_csv(File::create(&path)?, &result)?;
            }
            write_json(io::stdout().lock(), &result)?;
            println!();
            eprintln!(
                "{} {} | {} {:.2} {} | {} {:.2}%",
                "Eligible:".bold(),
                result.summary.eligible_count,
                "Distributed:".bold(),
                result.summary.total_distributed,
                result.config.token_symbol,
                "Top 10%:".bold(),
                result.summary.top10_pct_concentration
            );
        }
    }
    Ok(())
}
