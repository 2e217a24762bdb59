//! Error types for the domain model.

/// Errors raised while validating or normalizing domain values.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// A share/bond security string is missing its `(ISIN)` annotation.
    #[error("security '{0}' must carry its ISIN in parentheses, e.g. 'Gazprom (RU0007661625)'")]
    MissingIsin(String),
    /// A quantity that must be strictly positive was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: String },
    /// A string that should name a currency pair could not be normalized.
    #[error("'{0}' is not a recognizable currency pair or FX contract")]
    InvalidCurrencyPair(String),
    /// An action token was neither BUY nor SELL (nor the historical CELL).
    #[error("unknown action token '{0}'")]
    UnknownAction(String),
}
