//! CLI for bidding and reading the auction result

use clap::{Parser, Subcommand};
use miniauction::node::connect_client;
use miniauction::proto::{BidRequest, ResultRequest};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "miniauction")]
#[command(about = "miniauction client")]
#[command(version)]
struct Cli {
    /// Node gRPC address
    #[arg(long, default_value = "http://localhost:50051")]
    target: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a bid
    Bid {
        /// Bidder ID
        #[arg(long, default_value = "user1")]
        id: String,

        /// Bid amount
        #[arg(long)]
        amount: i32,
    },

    /// Show the current result
    Result,
}

async fn run(cli: Cli) -> miniauction::Result<()> {
    let mut client = connect_client(&cli.target, Duration::from_secs(1)).await?;

    match cli.command {
        Commands::Bid { id, amount } => {
            let res = client
                .bid(BidRequest {
                    bidder_id: id,
                    amount,
                })
                .await?
                .into_inner();
            println!(
                "Bid Response: {} (Reason: {})",
                res.status().as_str_name(),
                res.reason
            );
        }

        Commands::Result => {
            let res = client.result(ResultRequest {}).await?.into_inner();
            println!(
                "Result: High Bid: {}, Winner: {}, Over: {}",
                res.highest_bid, res.winner_id, res.is_over
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let target = cli.target.clone();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_retryable() => {
            eprintln!("Error: {} (transient, {} may be down or busy; retry)", e, target);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
