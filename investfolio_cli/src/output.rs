use anyhow::Result;
use investfolio_lib::{Counterparty, FifoPositions, OpenPosition, Pairing};
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled, Serialize)]
pub struct OpenPositionRow {
    #[tabled(rename = "Security")]
    #[serde(rename = "Security")]
    security: String,
    #[tabled(rename = "Side")]
    #[serde(rename = "Side")]
    side: String,
    #[tabled(rename = "Opened")]
    #[serde(rename = "Opened")]
    opened: String,
    #[tabled(rename = "Portfolio")]
    #[serde(rename = "Portfolio")]
    portfolio: String,
    #[tabled(rename = "Count")]
    #[serde(rename = "Count")]
    count: String,
    #[tabled(rename = "Open")]
    #[serde(rename = "Open")]
    residual: String,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Tx")]
    #[serde(rename = "Tx")]
    tx_id: String,
}

impl OpenPositionRow {
    pub fn new(security: &str, open: &OpenPosition<'_>) -> Self {
        let tx = open.transaction;
        Self {
            security: security.to_string(),
            side: match tx.action {
                investfolio_lib::model::Action::Buy => "LONG".to_string(),
                investfolio_lib::model::Action::Sell => "SHORT".to_string(),
            },
            opened: tx.timestamp.date_naive().to_string(),
            portfolio: tx.portfolio.clone(),
            count: tx.count.to_string(),
            residual: open.residual.to_string(),
            price: format!("{} {}", tx.price, tx.currency),
            tx_id: short_id(&tx.id),
        }
    }
}

#[derive(Tabled, Serialize)]
pub struct RealizedRow {
    #[tabled(rename = "Security")]
    #[serde(rename = "Security")]
    security: String,
    #[tabled(rename = "Opened")]
    #[serde(rename = "Opened")]
    opened: String,
    #[tabled(rename = "Closed")]
    #[serde(rename = "Closed")]
    closed: String,
    #[tabled(rename = "Closed by")]
    #[serde(rename = "Closed by")]
    closed_by: String,
    #[tabled(rename = "Qty")]
    #[serde(rename = "Qty")]
    quantity: String,
}

impl RealizedRow {
    pub fn new(security: &str, positions: &FifoPositions, pairing: &Pairing) -> Self {
        let opening = positions.transaction(pairing.opening);
        let (closed, closed_by) = match pairing.closing {
            Counterparty::Trade(index) => {
                let closer = positions.transaction(index);
                (closer.timestamp.date_naive().to_string(), short_id(&closer.id))
            }
            Counterparty::Redemption(index) => {
                let event = positions.redemption(index);
                (event.timestamp.date_naive().to_string(), "REDEMPTION".to_string())
            }
        };
        Self {
            security: security.to_string(),
            opened: opening.timestamp.date_naive().to_string(),
            closed,
            closed_by,
            quantity: pairing.quantity.to_string(),
        }
    }
}

pub fn print_open_positions(rows: Vec<OpenPositionRow>, format: &OutputFormat) -> Result<()> {
    print_rows(rows, format, "No open positions.")
}

pub fn print_realized(rows: Vec<RealizedRow>, format: &OutputFormat) -> Result<()> {
    print_rows(rows, format, "No realized lots.")
}

fn print_rows<R: Tabled + Serialize>(
    rows: Vec<R>,
    format: &OutputFormat,
    empty_message: &str,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{empty_message}");
            } else {
                println!("{}", Table::new(&rows));
            }
        }
    }
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
