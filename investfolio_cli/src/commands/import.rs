//! The `import` subcommand: loads normalized CSV rows into the database.
//!
//! Two inputs: a transactions file of [`TransactionRecord`] rows and an
//! optional cash-flow events file. Row identity is content-derived, so
//! importing the same file twice changes nothing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use investfolio_lib::model::{CashFlowType, SecurityCashFlow, TransactionRecord};
use investfolio_lib::Store;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Args)]
pub struct ImportArgs {
    /// SQLite database path (created if missing)
    #[arg(long)]
    pub db: PathBuf,

    /// CSV file of normalized transactions
    #[arg(long)]
    pub transactions: Option<PathBuf>,

    /// CSV file of security cash-flow events (redemptions, coupons, ...)
    #[arg(long)]
    pub events: Option<PathBuf>,
}

/// CSV row shape for cash-flow events; dates are plain `YYYY-MM-DD`.
#[derive(Deserialize)]
struct EventRow {
    portfolio: String,
    security: String,
    date: NaiveDate,
    event: CashFlowType,
    count: Decimal,
    value: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "RUB".to_string()
}

pub fn run(args: &ImportArgs) -> Result<()> {
    if args.transactions.is_none() && args.events.is_none() {
        anyhow::bail!("nothing to import: pass --transactions and/or --events");
    }

    let store = Store::open(&args.db)?;
    store.init()?;

    if let Some(path) = &args.transactions {
        let (inserted, skipped) = import_transactions(&store, path)
            .with_context(|| format!("importing transactions from {}", path.display()))?;
        println!("Imported {inserted} transactions ({skipped} duplicates skipped)");
    }

    if let Some(path) = &args.events {
        let (inserted, skipped) = import_events(&store, path)
            .with_context(|| format!("importing events from {}", path.display()))?;
        println!("Imported {inserted} cash-flow events ({skipped} duplicates skipped)");
    }

    Ok(())
}

fn import_transactions(store: &Store, path: &PathBuf) -> Result<(usize, usize)> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut inserted = 0;
    let mut skipped = 0;
    for (line, row) in reader.deserialize::<TransactionRecord>().enumerate() {
        let record = row.with_context(|| format!("row {}", line + 1))?;
        let transaction = record
            .to_transaction()
            .with_context(|| format!("row {}: invalid record", line + 1))?;
        if store.insert_transaction(&transaction)? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }
    Ok((inserted, skipped))
}

fn import_events(store: &Store, path: &PathBuf) -> Result<(usize, usize)> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut inserted = 0;
    let mut skipped = 0;
    for (line, row) in reader.deserialize::<EventRow>().enumerate() {
        let row: EventRow = row.with_context(|| format!("row {}", line + 1))?;
        let event = SecurityCashFlow {
            portfolio: row.portfolio,
            security: row.security,
            timestamp: row
                .date
                .and_hms_opt(0, 0, 0)
                .expect("valid midnight")
                .and_utc(),
            event: row.event,
            count: row.count,
            value: row.value,
            currency: row.currency,
        };
        if store.insert_cash_flow(&event)? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }
    Ok((inserted, skipped))
}
