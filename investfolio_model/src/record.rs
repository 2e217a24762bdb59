//! Ingest-side transaction record, as it arrives from normalized broker
//! report rows.
//!
//! A record carries the security in `"Name (ISIN)"` form for shares and
//! bonds (bare contract name for derivatives and FX) and derives its own
//! deterministic identifier by hashing normalized content fields, so
//! re-importing the same report never produces duplicate transactions.

use chrono::NaiveDate;
use md5::{Digest, Md5};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::{Action, Transaction};

/// Security class as declared by the broker report row. Distinct from
/// [`crate::types::SecurityType`]: this is the four-way ingest tag, the
/// engine-side classification is derived later from the instrument key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordSecurityType {
    Share,
    Bond,
    Derivative,
    Currency,
}

impl RecordSecurityType {
    fn has_isin(self) -> bool {
        matches!(self, RecordSecurityType::Share | RecordSecurityType::Bond)
    }
}

/// One normalized broker report row describing an executed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub portfolio: String,
    pub action: Action,
    pub date: NaiveDate,
    /// `"Name (ISIN)"` for shares/bonds, contract name otherwise.
    pub security: String,
    pub security_type: RecordSecurityType,
    pub count: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub accrued_interest: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub price_currency: String,
    #[serde(default)]
    pub commission: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub commission_currency: String,
}

fn default_currency() -> String {
    "RUB".to_string()
}

impl TransactionRecord {
    /// Checks positivity constraints the matching engine relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.count <= Decimal::ZERO {
            return Err(ModelError::NonPositive {
                field: "count",
                value: self.count.to_string(),
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(ModelError::NonPositive {
                field: "price",
                value: self.price.to_string(),
            });
        }
        Ok(())
    }

    /// Instrument key: the ISIN for shares/bonds (extracted from the
    /// trailing `(ISIN)` annotation, which must be present), the contract
    /// name as-is otherwise.
    pub fn security_id(&self) -> Result<&str, ModelError> {
        if self.security_type.has_isin() {
            let len = self.security.len();
            if !self.security_has_isin() {
                return Err(ModelError::MissingIsin(self.security.clone()));
            }
            Ok(&self.security[len - 13..len - 1])
        } else {
            Ok(&self.security)
        }
    }

    /// Security display name for shares/bonds, `None` for contracts.
    pub fn security_name(&self) -> Result<Option<&str>, ModelError> {
        if self.security_type.has_isin() {
            if !self.security_has_isin() {
                return Err(ModelError::MissingIsin(self.security.clone()));
            }
            let len = self.security.len();
            Ok(Some(self.security[..len - 14].trim()))
        } else {
            Ok(None)
        }
    }

    fn security_has_isin(&self) -> bool {
        let bytes = self.security.as_bytes();
        bytes.len() >= 15 && bytes[bytes.len() - 14] == b'(' && bytes[bytes.len() - 1] == b')'
    }

    /// Deterministic content-hash identifier: lowercase MD5 hex over the
    /// whitespace-stripped `portfolio + security + date + action + count`
    /// concatenation. The action contributes its historical wire token
    /// (`BUY`/`CELL`), keeping ids byte-compatible with rows persisted by
    /// earlier importers. Each call builds its own digest context.
    pub fn transaction_id(&self) -> String {
        let content = format!(
            "{}{}{}{}{}",
            self.portfolio.replace(' ', ""),
            self.security.replace(' ', ""),
            self.date,
            self.action.wire_token(),
            self.count,
        );
        hex::encode(Md5::digest(content.as_bytes()))
    }

    /// Converts the record into the engine-facing [`Transaction`], stamped
    /// at midnight UTC of the trade date.
    pub fn to_transaction(&self) -> Result<Transaction, ModelError> {
        self.validate()?;
        Ok(Transaction {
            id: self.transaction_id(),
            portfolio: self.portfolio.clone(),
            security: self.security_id()?.to_string(),
            action: self.action,
            timestamp: self.date.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc(),
            count: self.count,
            price: self.price,
            currency: self.price_currency.clone(),
        })
    }
}
