use anyhow::{Context, Result};
use clap::Parser;
use feedboard_logging::FeedboardSubscriberBuilder;
use feedboard_server::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("Failed to load configuration")?;

    match cli.command() {
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
        }
        Command::Serve => {
            let _log_guard = FeedboardSubscriberBuilder::new()
                .with_config(config.logging.clone())
                .try_init()?;

            feedboard_server::serve(config).await?;
        }
    }

    Ok(())
}
