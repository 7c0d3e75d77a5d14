use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// MCP server exposing JIRA issues, comments, worklogs and projects as tools.
#[derive(Debug, Parser)]
#[command(name = "jira-mcp")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.jira-mcp/config.toml)
    #[arg(long, global = true, env = "JIRA_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand, PartialEq)]
pub enum Commands {
    /// Serve tools over the chosen transport (the default)
    Run {
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,
    },

    /// Connect to JIRA once and report the result
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run {
            transport: Transport::Stdio,
        })
    }
}
