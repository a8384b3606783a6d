//! CLI module for Hive
//!
//! Provides commands:
//! - `run`: Submit a prompt to the configured agents
//! - `tasks`: Inspect persisted tasks
//! - `quota`: Show today's primary-tier usage
//! - `examples`: Show captured learning examples

use clap::{Parser, Subcommand};

pub mod examples;
pub mod quota;
pub mod run;
pub mod tasks;

/// Hive multi-agent orchestrator
#[derive(Parser, Debug)]
#[command(name = "hive")]
#[command(about = "Coordinate worker agents over tiered language models")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan, dispatch and combine a prompt
    Run {
        /// The request
        prompt: String,
        /// Capability the prompt is routed to (overrides [planner])
        #[arg(long)]
        capability: Option<String>,
        /// Planning notes; skips model enrichment
        #[arg(long)]
        hint: Option<String>,
    },
    /// Inspect persisted tasks
    Tasks {
        #[command(subcommand)]
        command: TasksCommands,
    },
    /// Show primary-tier quota usage
    Quota {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show captured learning examples
    Examples {
        /// Most recent examples to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// List tasks, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one task with its steps
    Show {
        /// Task id
        id: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run {
            prompt,
            capability,
            hint,
        }) => run::run(&prompt, capability, hint).await,
        Some(Commands::Tasks { command }) => tasks::run(command).await,
        Some(Commands::Quota { json }) => quota::run(json).await,
        Some(Commands::Examples { limit, json }) => examples::run(limit, json).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
