use clap::Parser;
use tracing_subscriber::EnvFilter;

use cronvault_server::cli::{self, CliArgs};

fn load_config() -> cronvault_core::Config {
    cronvault_core::config::load_dotenv();
    cronvault_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let args = CliArgs::parse();
    let config = load_config();

    let code = cli::dispatch(config, args).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
