//! CLI module - Command-line interface for Shoreline
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Shoreline - Property rental listings API
#[derive(Parser)]
#[command(name = "shoreline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API server (default)
    #[command(alias = "web")]
    Serve,

    /// Run migrations and create the admin account, then exit
    #[command(alias = "init")]
    Bootstrap,

    /// Validate configuration and print it with secrets masked
    #[command(alias = "config")]
    CheckConfig,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["shoreline"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_subcommands_and_aliases() {
        let cli = Cli::try_parse_from(["shoreline", "check-config"]).unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));

        let cli = Cli::try_parse_from(["shoreline", "init"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Bootstrap));

        assert!(Cli::try_parse_from(["shoreline", "daemon"]).is_err());
    }
}
