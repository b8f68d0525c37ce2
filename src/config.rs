use clap::{Parser, Subcommand};

use crate::ipc::DEFAULT_PORT;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Start rotating through targets
    Start,
    /// Stop rotating
    Stop,
    /// Query daemon status
    Status,
    /// Add a target window title fragment
    Add {
        /// Title fragment to match (joined with spaces)
        #[arg(required = true)]
        fragment: Vec<String>,
    },
    /// Remove a target window title fragment
    Remove {
        /// Title fragment to remove (joined with spaces)
        #[arg(required = true)]
        fragment: Vec<String>,
    },
    /// Remove all targets
    Clear,
    /// List current targets
    Targets,
    /// List open application window titles
    Windows,
    /// Shutdown the daemon
    Shutdown,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "win-rotator")]
#[command(about = "Round-robin foreground rotation across target application windows", long_about = None)]
pub struct Config {
    /// Interval between window switches in milliseconds (daemon mode)
    #[arg(short, long, default_value_t = 60_000)]
    pub interval: u64,

    /// Initial target window title fragment, repeatable (daemon mode)
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Loopback port for daemon IPC
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Daemon)
    }
}
