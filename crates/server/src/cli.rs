//! CLI argument parsing and subcommand dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cronvault_core::Config;

use crate::state::AppState;
use crate::{backup, startup};

/// Scheduled database backups with an encrypted password vault.
#[derive(Parser, Debug)]
#[command(name = "cronvault", version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run one backup now; invoked by the generated job table
    Run {
        /// Database config name
        database: String,
        /// Data directory of the server that scheduled this job
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the job table the server would install
    Crontab,
}

/// Run the selected subcommand. Returns the process exit code.
pub async fn dispatch(config: Config, args: CliArgs) -> anyhow::Result<i32> {
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            config.log_summary();
            startup::serve(config).await?;
            Ok(0)
        }
        Command::Run { database, data_dir } => {
            let config = match data_dir {
                Some(dir) => config.with_data_dir(dir),
                None => config,
            };
            backup::run_scheduled(&config, &database).await
        }
        Command::Crontab => {
            let state = AppState::new(config);
            let plan = state.load_plan()?;
            let vault = state.vault_availability().await;
            print!("{}", state.projector.render(&plan, &vault));
            Ok(0)
        }
    }
}
