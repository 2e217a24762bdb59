//! Domain types for Investfolio: transactions, security cash flows,
//! instrument classification, and the ingest-side transaction record with
//! its deterministic content-hash identifier.

pub mod errors;
pub mod record;
pub mod types;

pub use errors::ModelError;
pub use record::{RecordSecurityType, TransactionRecord};
pub use types::{
    currency_pair, Action, CashFlowType, DateRange, PortfolioScope, SecurityCashFlow,
    SecurityType, Transaction,
};
