//! The `positions` subcommand: open lots after FIFO matching.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use investfolio_lib::{CashFlowSource, PositionsFactory, Store, TransactionSource};

use crate::output::{print_open_positions, OpenPositionRow, OutputFormat};

#[derive(Args)]
pub struct PositionsArgs {
    /// SQLite database path
    #[arg(long)]
    pub db: PathBuf,

    /// Restrict to one portfolio (default: aggregate over all)
    #[arg(long)]
    pub portfolio: Option<String>,

    /// Restrict to one instrument key (ISIN, contract, or pair like USD/RUB)
    #[arg(long)]
    pub security: Option<String>,

    /// Start of the query range (YYYY-MM-DD, default: beginning of time)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// End of the query range (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

pub fn run(args: &PositionsArgs, format: &OutputFormat) -> Result<()> {
    let store = Arc::new(Store::open(&args.db)?);
    store.init()?;
    let factory = PositionsFactory::new(
        Arc::clone(&store) as Arc<dyn TransactionSource>,
        Arc::clone(&store) as Arc<dyn CashFlowSource>,
    );

    let scope = super::scope(&args.portfolio);
    let range = super::date_range(args.from, args.to);

    let mut rows = Vec::new();
    for security in super::selected_securities(&store, &args.security)? {
        let positions = factory.get(&scope, &security, &range)?;
        for open in positions.open_positions() {
            rows.push(OpenPositionRow::new(&security, &open));
        }
    }

    print_open_positions(rows, format)
}
