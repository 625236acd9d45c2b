use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Token usage tracker for coding agents.
#[derive(Parser, Debug)]
#[command(name = "ttrack", author, version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to the tracker config (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Override the configured port for this run only
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the configured bind address for this run only
        #[arg(long)]
        bind: Option<IpAddr>,
    },
    /// Write random usage records into the configured store
    Seed {
        #[arg(long, default_value_t = 500)]
        count: usize,

        /// Spread records over the last N hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Replay recorded lifecycle events (JSON lines) into the store
    Replay {
        /// Event file, or `-` for stdin
        path: PathBuf,

        /// Worktree the session ran in; names the project
        #[arg(long)]
        worktree: Option<String>,

        /// Directory for the error log
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Post records to a running tracker instead of the store
        #[arg(long)]
        server: Option<String>,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            port: None,
            bind: None,
        })
    }
}
