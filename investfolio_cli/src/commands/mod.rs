//! CLI subcommand implementations.

pub mod import;
pub mod positions;
pub mod realized;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use investfolio_lib::model::{DateRange, PortfolioScope};

/// Builds the inclusive query range from optional `--from`/`--to` dates.
/// Defaults span everything up to the end of today.
pub fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> DateRange {
    let from = from
        .map(start_of_day)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH);
    let to = end_of_day(to.unwrap_or_else(|| Utc::now().date_naive()));
    DateRange::new(from, to)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59).expect("valid end of day").and_utc()
}

pub fn scope(portfolio: &Option<String>) -> PortfolioScope {
    PortfolioScope::from(portfolio.clone())
}

/// The securities a report covers: the one requested, or every key in the
/// store. FX contracts collapse into their canonical pair code so a pair
/// quoted by several contracts is reported once.
pub fn selected_securities(
    store: &investfolio_lib::Store,
    security: &Option<String>,
) -> Result<Vec<String>> {
    use investfolio_lib::model::{currency_pair, SecurityType};

    if let Some(key) = security {
        return Ok(vec![key.clone()]);
    }
    let mut keys = Vec::new();
    for key in store.securities()? {
        let normalized = match SecurityType::classify(&key) {
            SecurityType::CurrencyPair => currency_pair(&key)?,
            _ => key,
        };
        if !keys.contains(&normalized) {
            keys.push(normalized);
        }
    }
    Ok(keys)
}
