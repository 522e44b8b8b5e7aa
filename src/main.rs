use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod cli;

#[derive(Parser)]
#[command(name = "mission-board")]
#[command(about = "Gamified mission board with unlockable rewards")]
#[command(version)]
struct Cli {
    /// Directory to search for .mission-board/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the scoring table and reward ladder
    Rules,

    /// Replay taps against an in-memory board and print the result
    Demo {
        /// Comma-separated mission numbers, one per tap (first tap selects)
        #[arg(long, value_delimiter = ',')]
        taps: Vec<u32>,

        /// Pause between taps in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// JSON file with initial progress rows ([{"index": 1, "points": 1}])
        #[arg(long)]
        progress: Option<PathBuf>,

        /// JSON file with mission titles and rewards
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Initialize a new config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Some(Commands::Init { force }) => {
            cli::init::init_command(cli.config, force).await?;
        }
        Some(Commands::Demo {
            taps,
            interval_ms,
            progress,
            catalog,
        }) => {
            let config = cli::load_config(&work_dir, cli.config.as_ref())?;
            cli::demo::demo_command(
                config,
                cli::demo::DemoOptions {
                    taps: &taps,
                    interval: Duration::from_millis(interval_ms),
                    progress: progress.as_deref(),
                    catalog: catalog.as_deref(),
                },
            )
            .await?;
        }
        Some(Commands::Rules) | None => {
            let config = cli::load_config(&work_dir, cli.config.as_ref())?;
            cli::rules::rules_command(&config)?;
        }
    }

    Ok(())
}
