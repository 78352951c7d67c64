use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::models::SyncConfig;
use crate::worker::daily_worker::DEFAULT_INTERVAL_HOURS;

#[derive(Parser)]
#[command(name = "msehistory")]
#[command(about = "Macedonian Stock Exchange history sync and RSI signals", long_about = None)]
pub struct Cli {
    /// Directory holding one <CODE>.csv per instrument
    #[arg(long, global = true, env = "MSE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Symbol history endpoint (without the trailing code)
    #[arg(long, global = true, env = "MSE_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch new trading days for every instrument (or the given ones)
    Pull {
        /// Instrument code; repeat to sync several
        #[arg(short, long = "issuer")]
        issuers: Vec<String>,

        /// Start date (dd.mm.yyyy); allows backfilling before the last stored day
        #[arg(long)]
        from: Option<String>,

        /// End date (dd.mm.yyyy), defaults to today
        #[arg(long)]
        to: Option<String>,

        /// Instruments synced in parallel
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Recompute RSI signal files from stored history
    Analyze {
        #[arg(short, long = "issuer")]
        issuers: Vec<String>,

        /// RSI window length
        #[arg(short, long)]
        period: Option<usize>,
    },
    /// Print stored records of one instrument within a date range
    Filter {
        #[arg(short, long)]
        issuer: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show current status
    Status,
    /// Run pull + analyze on a fixed period
    Schedule {
        #[arg(long, default_value_t = DEFAULT_INTERVAL_HOURS)]
        every_hours: u64,

        /// Run a single iteration and exit
        #[arg(long)]
        once: bool,
    },
}

fn load_config(cli: &Cli) -> crate::error::Result<SyncConfig> {
    let mut config = SyncConfig::from_env()?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    Ok(config)
}

pub fn run() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Pull {
            issuers,
            from,
            to,
            workers,
        } => {
            commands::pull::run(config, issuers, from, to, workers);
        }
        Commands::Analyze { issuers, period } => {
            commands::analyze::run(config, issuers, period);
        }
        Commands::Filter {
            issuer,
            from,
            to,
            json,
        } => {
            commands::filter::run(config, issuer, from, to, json);
        }
        Commands::Status => {
            commands::status::run(config);
        }
        Commands::Schedule { every_hours, once } => {
            commands::schedule::run(config, every_hours, once);
        }
    }
}
