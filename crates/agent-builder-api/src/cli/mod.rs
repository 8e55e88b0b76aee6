//! CLI command definitions for the `agent-builder` binary.
//!
//! Uses clap derive macros for argument parsing. Agent commands read the
//! local store directly, acting as the user given by `--user`.

pub mod agent;

use clap::{Args, Parser, Subcommand};

/// Build, share and run AI agents.
#[derive(Parser)]
#[command(name = "agent-builder", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Interface to bind. Defaults to `[server] host` from config.toml.
        #[arg(long, env = "AGENT_BUILDER_HOST")]
        host: Option<String>,

        /// Port to bind. Defaults to `[server] port` from config.toml.
        #[arg(long, env = "AGENT_BUILDER_PORT")]
        port: Option<u16>,
    },

    /// Inspect stored agents.
    Agents {
        #[command(subcommand)]
        command: AgentCommand,
    },
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List agents owned by a user.
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one agent as seen by a user.
    Show {
        /// Agent identifier.
        id: String,

        /// User to act as.
        #[arg(long, env = "AGENT_BUILDER_USER")]
        user: String,
    },

    /// List the public catalog.
    Public {
        #[command(flatten)]
        page: PageArgs,
    },
}

/// Caller and paging flags shared by the list commands.
#[derive(Args)]
pub struct PageArgs {
    /// User to act as.
    #[arg(long, env = "AGENT_BUILDER_USER")]
    pub user: String,

    /// Maximum number of agents to return.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Continuation token printed by a previous page.
    #[arg(long)]
    pub next_token: Option<String>,
}

/// Log filter for the given `-v` count, used when `RUST_LOG` is unset.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "info,agent_builder=debug",
        _ => "trace",
    }
}
