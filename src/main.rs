use clap::Parser;
use agentic_workflow_builder::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Execute(args) => cli::execute::run(args).await,
    }
}
