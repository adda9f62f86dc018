use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "streamex")]
#[command(about = "streamex - limit order matching over Redis streams")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one matching worker per configured market
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = "deploy/streamex.yaml", env = "STREAMEX_CONFIG")]
        config: PathBuf,

        /// Only run these markets (repeatable); defaults to every configured market
        #[arg(short, long)]
        market: Vec<String>,
    },

    /// Validate configuration without starting the engine
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "deploy/streamex.yaml", env = "STREAMEX_CONFIG")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "streamex.yaml")]
        output: PathBuf,
    },

    /// Print a market's events as JSON lines
    Tail {
        /// Path to the configuration file
        #[arg(short, long, default_value = "deploy/streamex.yaml", env = "STREAMEX_CONFIG")]
        config: PathBuf,

        /// Market to follow
        #[arg(short, long)]
        market: String,

        /// Where to start reading
        #[arg(long, value_enum, default_value = "now")]
        from: TailFrom,

        /// Exit after this many events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailFrom {
    /// Replay the whole event log
    Start,
    /// Only events appended after the command starts
    Now,
}

impl TailFrom {
    /// Stream id to start reading after
    pub fn as_cursor(&self) -> &'static str {
        match self {
            TailFrom::Start => "0-0",
            TailFrom::Now => "$",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
