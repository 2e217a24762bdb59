//! SQLite storage for transactions and security cash-flow events.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use investfolio_model::{
    Action, CashFlowType, DateRange, ModelError, PortfolioScope, SecurityCashFlow, Transaction,
};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::error::PositionsError;
use crate::repository::{CashFlowSource, TransactionSource};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("decimal parse error: {0}")]
    Decimal(#[from] rust_decimal::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("unknown cash-flow event type id {0}")]
    UnknownEventType(i64),
}

/// SQLite-backed store. The connection sits behind a mutex so one store
/// can serve the factory from multiple request threads.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Applies the schema. `user_version` gates future migrations.
    pub fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        conn.execute_batch(include_str!("../schema/sqlite.sql"))?;

        if version < 1 {
            conn.pragma_update(None, "user_version", 1)?;
        }
        Ok(())
    }

    /// Inserts a transaction; returns false when a row with the same
    /// content-hash id already exists (idempotent re-import).
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let changed = conn.execute(
            "INSERT OR IGNORE INTO transactions
                 (id, portfolio, security, action, timestamp, count, price, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.id,
                tx.portfolio,
                tx.security,
                tx.action.as_str(),
                encode_timestamp(&tx.timestamp),
                tx.count.to_string(),
                tx.price.to_string(),
                tx.currency,
            ],
        )?;
        Ok(changed == 1)
    }

    /// Inserts a cash-flow event; returns false on a duplicate
    /// `(portfolio, security, timestamp, type)` key.
    pub fn insert_cash_flow(&self, event: &SecurityCashFlow) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let changed = conn.execute(
            "INSERT OR IGNORE INTO security_events
                 (portfolio, security, timestamp, event_type, count, value, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.portfolio,
                event.security,
                encode_timestamp(&event.timestamp),
                event.event.id(),
                event.count.to_string(),
                event.value.to_string(),
                event.currency,
            ],
        )?;
        Ok(changed == 1)
    }

    /// All portfolio names present in the store, sorted.
    pub fn portfolios(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let mut stmt =
            conn.prepare("SELECT DISTINCT portfolio FROM transactions ORDER BY portfolio")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// All instrument keys present in the store, sorted.
    pub fn securities(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let mut stmt =
            conn.prepare("SELECT DISTINCT security FROM transactions ORDER BY security")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn query_transactions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let sql_base = "SELECT id, portfolio, security, action, timestamp, count, price, currency
                        FROM transactions
                        WHERE security = ?1 AND timestamp BETWEEN ?2 AND ?3";
        let from = encode_timestamp(&range.from);
        let to = encode_timestamp(&range.to);

        let raw: Vec<TransactionRow> = match scope.portfolio() {
            Some(portfolio) => {
                let sql = format!("{sql_base} AND portfolio = ?4 ORDER BY timestamp ASC, id ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![security, from, to, portfolio], read_transaction_row)?;
                rows.collect::<Result<_, _>>()?
            }
            None => {
                let sql = format!("{sql_base} ORDER BY timestamp ASC, id ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![security, from, to], read_transaction_row)?;
                rows.collect::<Result<_, _>>()?
            }
        };
        raw.into_iter().map(decode_transaction).collect()
    }

    fn query_fx_contracts(
        &self,
        scope: &PortfolioScope,
        pair: &str,
        range: &DateRange,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        // substr instead of LIKE: '_' is a LIKE wildcard.
        let sql_base = "SELECT DISTINCT security FROM transactions
                        WHERE substr(security, 1, 6) = ?1
                          AND (length(security) = 6 OR substr(security, 7, 1) = '_')
                          AND timestamp BETWEEN ?2 AND ?3";
        let from = encode_timestamp(&range.from);
        let to = encode_timestamp(&range.to);

        let mut result = Vec::new();
        match scope.portfolio() {
            Some(portfolio) => {
                let sql = format!("{sql_base} AND portfolio = ?4 ORDER BY security");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pair, from, to, portfolio], |row| row.get(0))?;
                for row in rows {
                    result.push(row?);
                }
            }
            None => {
                let sql = format!("{sql_base} ORDER BY security");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pair, from, to], |row| row.get(0))?;
                for row in rows {
                    result.push(row?);
                }
            }
        }
        Ok(result)
    }

    fn query_redemptions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<SecurityCashFlow>, StoreError> {
        let conn = self.conn.lock().expect("store lock");
        let sql_base = "SELECT portfolio, security, timestamp, event_type, count, value, currency
                        FROM security_events
                        WHERE security = ?1 AND event_type = ?2 AND timestamp BETWEEN ?3 AND ?4";
        let from = encode_timestamp(&range.from);
        let to = encode_timestamp(&range.to);
        let redemption = CashFlowType::Redemption.id();

        let raw: Vec<EventRow> = match scope.portfolio() {
            Some(portfolio) => {
                let sql = format!("{sql_base} AND portfolio = ?5 ORDER BY timestamp ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![security, redemption, from, to, portfolio],
                    read_event_row,
                )?;
                rows.collect::<Result<_, _>>()?
            }
            None => {
                let sql = format!("{sql_base} ORDER BY timestamp ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows =
                    stmt.query_map(params![security, redemption, from, to], read_event_row)?;
                rows.collect::<Result<_, _>>()?
            }
        };
        raw.into_iter().map(decode_event).collect()
    }
}

impl TransactionSource for Store {
    fn transactions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<Transaction>, PositionsError> {
        Ok(self.query_transactions(scope, security, range)?)
    }

    fn distinct_fx_contracts(
        &self,
        scope: &PortfolioScope,
        pair: &str,
        range: &DateRange,
    ) -> Result<Vec<String>, PositionsError> {
        Ok(self.query_fx_contracts(scope, pair, range)?)
    }
}

impl CashFlowSource for Store {
    fn redemptions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<SecurityCashFlow>, PositionsError> {
        Ok(self.query_redemptions(scope, security, range)?)
    }
}

type TransactionRow = (String, String, String, String, String, String, String, String);
type EventRow = (String, String, String, i64, String, String, String);

fn read_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn read_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode_transaction(row: TransactionRow) -> Result<Transaction, StoreError> {
    let (id, portfolio, security, action, timestamp, count, price, currency) = row;
    Ok(Transaction {
        id,
        portfolio,
        security,
        action: Action::from_str(&action)?,
        timestamp: decode_timestamp(&timestamp)?,
        count: Decimal::from_str(&count)?,
        price: Decimal::from_str(&price)?,
        currency,
    })
}

fn decode_event(row: EventRow) -> Result<SecurityCashFlow, StoreError> {
    let (portfolio, security, timestamp, event_type, count, value, currency) = row;
    Ok(SecurityCashFlow {
        portfolio,
        security,
        timestamp: decode_timestamp(&timestamp)?,
        event: CashFlowType::from_id(event_type).ok_or(StoreError::UnknownEventType(event_type))?,
        count: Decimal::from_str(&count)?,
        value: Decimal::from_str(&value)?,
        currency,
    })
}

/// Fixed-width UTC encoding so lexicographic order in SQL equals
/// chronological order.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
