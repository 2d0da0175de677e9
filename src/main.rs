use clap::Parser;
use pmp_image_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => cli::generate::run(args).await,
        Command::Report(args) => cli::report::run(args).await,
        Command::Reclaim => cli::maintenance::reclaim().await,
        Command::Prune(args) => cli::maintenance::prune(args).await,
    }
}
