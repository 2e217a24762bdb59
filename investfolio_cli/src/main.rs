mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "investfolio")]
#[command(about = "Track portfolio positions and realized lots from imported broker records")]
struct Cli {
    /// Output format: table or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import normalized transaction/event CSV files into the database
    Import(commands::import::ImportArgs),
    /// Show open positions after FIFO matching
    Positions(commands::positions::PositionsArgs),
    /// Show realized (closed) lots after FIFO matching
    Realized(commands::realized::RealizedArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("investfolio=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    match &cli.command {
        Commands::Import(args) => commands::import::run(args)?,
        Commands::Positions(args) => commands::positions::run(args, &format)?,
        Commands::Realized(args) => commands::realized::run(args, &format)?,
    }

    Ok(())
}
