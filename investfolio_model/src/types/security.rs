use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Classification of an instrument key, deciding how positions are built:
/// plain lookup, redemption-eligible lookup, or multi-contract FX merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityType {
    /// Exchange-traded share or bond, keyed by ISIN. Eligible for
    /// corporate-action style redemption.
    StockOrBond,
    /// Futures/options contract, keyed by contract name.
    Derivative,
    /// FX pair synthesized from one or more broker contracts
    /// (`USDRUB_TOM`, `USDRUB_TOD`, ...).
    CurrencyPair,
}

impl SecurityType {
    /// Classifies an instrument key.
    ///
    /// A 12-character ISIN (two letters, nine alphanumerics, check digit)
    /// is a stock or bond; a 6-letter pair code with an optional
    /// settlement suffix (`USDRUB`, `USD/RUB`, `USDRUB_TOM`) is a currency
    /// pair; anything else is a derivative contract.
    pub fn classify(key: &str) -> SecurityType {
        if is_isin(key) {
            SecurityType::StockOrBond
        } else if is_currency_pair(key) {
            SecurityType::CurrencyPair
        } else {
            SecurityType::Derivative
        }
    }
}

fn is_isin(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 12
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..11].iter().all(u8::is_ascii_alphanumeric)
        && bytes[11].is_ascii_digit()
}

fn is_currency_pair(key: &str) -> bool {
    let base = key.split('_').next().unwrap_or(key).replace('/', "");
    base.len() == 6 && base.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Canonical 6-letter pair code for an FX instrument key: `USD/RUB` and
/// contract forms like `USDRUB_TOM` both normalize to `USDRUB`.
pub fn currency_pair(key: &str) -> Result<String, ModelError> {
    let base = key.split('_').next().unwrap_or(key).replace('/', "");
    if base.len() == 6 && base.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(base.to_uppercase())
    } else {
        Err(ModelError::InvalidCurrencyPair(key.to_string()))
    }
}
