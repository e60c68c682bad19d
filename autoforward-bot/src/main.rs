//! Binary for the autoforward bot.

use anyhow::Result;
use autoforward_bot::{load_config, run_bot, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_bot(config).await
        }
    }
}
