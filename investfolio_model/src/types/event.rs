use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a security cash-flow event.
///
/// Numeric ids match the persisted `security_events.event_type` column;
/// redemption is 1 as in the data imported by earlier versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowType {
    Redemption,
    Coupon,
    Dividend,
    Amortization,
    Tax,
}

impl CashFlowType {
    pub fn id(self) -> i64 {
        match self {
            CashFlowType::Redemption => 1,
            CashFlowType::Coupon => 2,
            CashFlowType::Dividend => 3,
            CashFlowType::Amortization => 4,
            CashFlowType::Tax => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<CashFlowType> {
        match id {
            1 => Some(CashFlowType::Redemption),
            2 => Some(CashFlowType::Coupon),
            3 => Some(CashFlowType::Dividend),
            4 => Some(CashFlowType::Amortization),
            5 => Some(CashFlowType::Tax),
            _ => None,
        }
    }
}

/// A cash-flow record attached to a security position: bond redemption,
/// coupon, dividend, amortization, or withheld tax.
///
/// The matching engine only consumes `Redemption` events, treating each as
/// a forced sell of up to `count` still-open units at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCashFlow {
    pub portfolio: String,
    pub security: String,
    pub timestamp: DateTime<Utc>,
    pub event: CashFlowType,
    pub count: Decimal,
    pub value: Decimal,
    pub currency: String,
}
