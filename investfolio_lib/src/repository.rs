//! Data-access seams the positions factory consumes.
//!
//! The SQLite [`crate::Store`] implements both traits; tests substitute
//! counting fakes to verify caching behavior.

use investfolio_model::{DateRange, PortfolioScope, SecurityCashFlow, Transaction};

use crate::error::PositionsError;

/// Read-only access to executed trades.
pub trait TransactionSource: Send + Sync {
    /// Transactions for one instrument key (or FX contract) within the
    /// inclusive range, ordered by `(timestamp, id)` ascending.
    fn transactions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<Transaction>, PositionsError>;

    /// Distinct broker contract names quoting the given 6-letter currency
    /// pair within the scope and range.
    fn distinct_fx_contracts(
        &self,
        scope: &PortfolioScope,
        pair: &str,
        range: &DateRange,
    ) -> Result<Vec<String>, PositionsError>;
}

/// Read-only access to security cash-flow events.
pub trait CashFlowSource: Send + Sync {
    /// Redemption events for the instrument within the inclusive range,
    /// ordered by timestamp ascending.
    fn redemptions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<SecurityCashFlow>, PositionsError>;
}
