//! Command-line interface definition for chatvault
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the HTTP server and inspecting
//! stored sessions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatvault - Conversational session store
///
/// Persist chat conversations as one JSON document per session and
/// serve them over an HTTP API backed by an OpenAI-compatible provider.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "chatvault.yaml")]
    pub config: String,

    /// Session directory override
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute; the server starts when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for chatvault
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the bind port from config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage stored sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored conversations, most recently active first
    List,

    /// Show the full message history of a conversation
    Show {
        /// Session identifier
        session_id: String,
    },

    /// Delete a conversation
    Delete {
        /// Session identifier
        session_id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command_defaults_to_server() {
        let cli = Cli::try_parse_from(["chatvault"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "chatvault.yaml");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["chatvault", "serve", "--port", "8080"]).unwrap();
        if let Some(Commands::Serve { port }) = cli.command {
            assert_eq!(port, Some(8080));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_cli_parse_sessions_list() {
        let cli = Cli::try_parse_from(["chatvault", "sessions", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Sessions {
                command: SessionCommand::List
            })
        ));
    }

    #[test]
    fn test_cli_parse_sessions_show() {
        let cli = Cli::try_parse_from(["chatvault", "sessions", "show", "abc-123"]).unwrap();
        if let Some(Commands::Sessions {
            command: SessionCommand::Show { session_id },
        }) = cli.command
        {
            assert_eq!(session_id, "abc-123");
        } else {
            panic!("Expected Sessions show command");
        }
    }

    #[test]
    fn test_cli_parse_data_dir_override() {
        let cli = Cli::try_parse_from(["chatvault", "--data-dir", "/tmp/sessions"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/sessions")));
    }
}
