//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mirror the JLCPCB component catalog into a local SQLite database.
///
/// The default `run` command syncs the vendor listing, evicts parts the
/// vendor no longer lists and normalizes part attributes, in that order.
/// Settings not given on the command line fall back to the config file and
/// then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "partsync")]
#[command(author, version, about)]
#[command(after_help = "Exit codes:\n  0 = all requested phases completed\n  1 = fatal error (configuration, credentials, database)")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// SQLite database file (created if missing)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/partsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Vendor application key
    #[arg(long, global = true, env = "JLCPCB_KEY", hide_env_values = true)]
    pub app_key: Option<String>,

    /// Vendor application secret
    #[arg(long, global = true, env = "JLCPCB_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Vendor API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Pages fetched ahead of the one being applied (1-16)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub lookahead: Option<u8>,

    /// Concurrent normalization batches (1-100)
    #[arg(short = 'w', long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: Option<u8>,

    /// Target number of parts per normalization batch
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_target: Option<u32>,

    /// Evict parts not refreshed for this many days
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=3650))]
    pub retention_days: Option<u32>,

    /// Maximum attempts per page fetch (1-10)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,
}

impl Args {
    /// The subcommand to run, `run` when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

/// Phases the binary can run.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Sync, then evict, then normalize (default)
    Run,
    /// Fetch the vendor listing and upsert categories and parts
    Sync,
    /// Delete parts whose last update is older than the retention window
    Evict,
    /// Parse descriptions into structured attributes
    Normalize,
}

impl Command {
    #[must_use]
    pub fn syncs(self) -> bool {
        matches!(self, Self::Run | Self::Sync)
    }

    #[must_use]
    pub fn evicts(self) -> bool {
        matches!(self, Self::Run | Self::Evict)
    }

    #[must_use]
    pub fn normalizes(self) -> bool {
        matches!(self, Self::Run | Self::Normalize)
    }
}
