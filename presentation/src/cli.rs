//! CLI argument surface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "conductor",
    about = "Local-first coding assistant with specialist worker agents",
    version
)]
pub struct Cli {
    /// One-shot question; omit for interactive chat
    pub question: Option<String>,

    /// Explicit configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project directory the agents work in (default: current directory)
    #[arg(short, long)]
    pub project_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Ignore configuration files and use built-in defaults
    #[arg(long)]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trusted tool-execution client against a remote orchestrator
    ToolClient {
        /// Orchestrator callback address (host:port)
        #[arg(long)]
        connect: String,

        /// Session id to serve
        #[arg(long)]
        session: String,

        /// Bearer token expected by the orchestrator
        #[arg(long, default_value = "")]
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_one_shot_question() {
        let cli = Cli::parse_from(["conductor", "-v", "what does lib.rs do?"]);
        assert_eq!(cli.question.as_deref(), Some("what does lib.rs do?"));
        assert_eq!(cli.verbose, 1);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parses_tool_client_subcommand() {
        let cli = Cli::parse_from([
            "conductor",
            "tool-client",
            "--connect",
            "10.0.0.5:50551",
            "--session",
            "abc",
            "--token",
            "t0k3n",
        ]);
        match cli.command {
            Some(Command::ToolClient {
                connect,
                session,
                token,
            }) => {
                assert_eq!(connect, "10.0.0.5:50551");
                assert_eq!(session, "abc");
                assert_eq!(token, "t0k3n");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
