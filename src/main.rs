use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use git_autosync::handlers;
use git_autosync::logger;

#[derive(Parser)]
#[command(name = "git-autosync")]
#[command(about = "Keep a local directory and a remote git branch in sync", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/git-autosync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the configuration and prepare the repository
    Init {
        /// Local directory to keep in sync
        #[arg(short, long)]
        repo: Option<String>,

        /// Remote git URL
        #[arg(short = 'u', long)]
        remote: Option<String>,

        /// Branch to sync (default: main)
        #[arg(short, long)]
        branch: Option<String>,

        /// Minutes between syncs for `run` (default: 10)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run one sync and exit
    Sync {
        /// Print every step of the sync
        #[arg(short, long)]
        verbose: bool,
    },

    /// Sync repeatedly on the configured interval
    Run {
        /// Print every step of each sync
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show repository state and the last sync
    Status {
        /// Include the step log of the last sync
        #[arg(short, long)]
        verbose: bool,
    },

    /// Inspect configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    logger::init_logger()?;

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init {
            repo,
            remote,
            branch,
            interval,
        } => {
            handlers::handle_init(config_path, repo, remote, branch, interval)?;
        }
        Commands::Sync { verbose } => {
            let outcome = handlers::handle_sync(config_path, verbose)?;
            if outcome.is_failure() {
                std::process::exit(1);
            }
        }
        Commands::Run { verbose } => {
            handlers::handle_run(config_path, verbose)?;
        }
        Commands::Status { verbose } => {
            handlers::handle_status(config_path, verbose)?;
        }
        Commands::Config { show } => {
            if show {
                handlers::handle_config_show(config_path)?;
            } else {
                handlers::handle_config_path(config_path)?;
            }
        }
    }

    Ok(())
}
