use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Trade direction. The sell variant's historical wire token is the
/// misspelling `CELL`, kept only for identifier compatibility with
/// previously imported data; everywhere else it reads as `SELL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL", alias = "CELL")]
    Sell,
}

impl Action {
    /// The direction opposite to this one.
    pub fn opposite(self) -> Action {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
        }
    }

    /// Canonical display/storage token.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }

    /// The token hashed into transaction identifiers. Sell keeps the
    /// historical `CELL` spelling so ids stay byte-compatible with
    /// already-persisted rows.
    pub fn wire_token(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "CELL",
        }
    }
}

impl FromStr for Action {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Action::Buy),
            "SELL" | "CELL" => Ok(Action::Sell),
            other => Err(ModelError::UnknownAction(other.to_string())),
        }
    }
}

/// An executed trade in a single instrument. Immutable once created.
///
/// `count` is always positive; `action` carries the direction. The ordering
/// key is `(timestamp, id)` ascending, which is deterministic because ids
/// are content-derived rather than sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub portfolio: String,
    /// Instrument key: ISIN for shares/bonds, contract name for
    /// derivatives and FX.
    pub security: String,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
    pub count: Decimal,
    pub price: Decimal,
    pub currency: String,
}

impl Transaction {
    /// Chronological ordering with the content-hash id as tie-break.
    pub fn chronological(a: &Transaction, b: &Transaction) -> Ordering {
        a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))
    }
}
