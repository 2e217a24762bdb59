use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which portfolios a query covers: one specific portfolio or the
/// cross-portfolio aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortfolioScope {
    All,
    Portfolio(String),
}

impl PortfolioScope {
    /// Cache/display token: the portfolio name, or the `all` sentinel.
    pub fn key(&self) -> &str {
        match self {
            PortfolioScope::All => "all",
            PortfolioScope::Portfolio(name) => name,
        }
    }

    pub fn portfolio(&self) -> Option<&str> {
        match self {
            PortfolioScope::All => None,
            PortfolioScope::Portfolio(name) => Some(name),
        }
    }
}

impl From<Option<String>> for PortfolioScope {
    fn from(portfolio: Option<String>) -> Self {
        match portfolio {
            Some(name) => PortfolioScope::Portfolio(name),
            None => PortfolioScope::All,
        }
    }
}

/// Inclusive `[from, to]` timestamp range for position queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Textual boundary token used in cache keys.
    pub fn cache_token(&self) -> String {
        format!("{}{}", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}
