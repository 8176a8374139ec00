//! gbot CLI: run the Telegram escrow bot. Config from env and optional CLI args.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gbot_core::init_tracing;
use gbot_telegram::{run_bot, TelegramConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "gbot")]
#[command(about = "P2P escrow Telegram bot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the escrow bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = match token {
                Some(token) => TelegramConfig::with_token(token),
                None => TelegramConfig::from_env()?,
            };

            let log_file = config
                .log_file
                .clone()
                .unwrap_or_else(|| "gbot.log".to_string());
            init_tracing(&log_file)?;

            info!(
                timeout_secs = config.verification_timeout_secs,
                "starting escrow bot"
            );
            run_bot(config).await
        }
    }
}
