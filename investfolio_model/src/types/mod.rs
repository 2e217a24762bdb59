mod transaction;
pub use self::transaction::{Action, Transaction};

mod event;
pub use self::event::{CashFlowType, SecurityCashFlow};

mod security;
pub use self::security::{currency_pair, SecurityType};

mod scope;
pub use self::scope::{DateRange, PortfolioScope};
