//! CLI module for the Agentic Workflow Builder
//!
//! - `serve`: HTTP API server
//! - `execute`: run a workflow definition file once and print the run record

pub mod execute;
pub mod serve;

use clap::{Parser, Subcommand};

/// Agentic Workflow Builder - sequential LLM workflows with validation and retries
#[derive(Parser)]
#[command(name = "agentic-workflow-builder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Execute a workflow definition file once
    Execute(execute::ExecuteArgs),
}
