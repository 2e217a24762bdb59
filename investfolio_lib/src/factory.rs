//! Lazily computed, memoized positions keyed by scope, instrument, and
//! date range.
//!
//! The cache is two-level, mirroring how callers query: an outer map per
//! portfolio scope (with `all` as the aggregate sentinel), an inner map
//! per normalized instrument key + range boundaries. Entries live until
//! [`PositionsFactory::invalidate_cache`] wipes everything, which the
//! importer does after every data change.

use std::sync::Arc;

use dashmap::DashMap;
use investfolio_model::{currency_pair, DateRange, PortfolioScope, SecurityType, Transaction};
use tracing::debug;

use crate::error::PositionsError;
use crate::positions::FifoPositions;
use crate::repository::{CashFlowSource, TransactionSource};

type InstrumentCache = DashMap<String, Arc<FifoPositions>>;

/// Computes and caches [`FifoPositions`] over injected data sources.
pub struct PositionsFactory {
    transactions: Arc<dyn TransactionSource>,
    cash_flows: Arc<dyn CashFlowSource>,
    cache: DashMap<String, Arc<InstrumentCache>>,
}

impl PositionsFactory {
    pub fn new(
        transactions: Arc<dyn TransactionSource>,
        cash_flows: Arc<dyn CashFlowSource>,
    ) -> Self {
        Self {
            transactions,
            cash_flows,
            cache: DashMap::new(),
        }
    }

    /// Positions for `(scope, instrument-or-contract, range)`.
    ///
    /// The first call per key computes; concurrent calls for the same key
    /// compute at most once (the map's entry primitive makes the
    /// absent-key computation atomic). A computation that fails is not
    /// memoized, so the next call retries.
    pub fn get(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Arc<FifoPositions>, PositionsError> {
        let by_instrument = Arc::clone(
            self.cache
                .entry(scope.key().to_string())
                .or_default()
                .value(),
        );
        let entry = by_instrument
            .entry(cache_key(security, range)?)
            .or_try_insert_with(|| {
                debug!("computing positions for {} in scope {}", security, scope.key());
                self.create(scope, security, range).map(Arc::new)
            })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every cached result. Coarse by design: any change to the
    /// underlying transaction data invalidates the whole cache.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    fn create(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<FifoPositions, PositionsError> {
        let class = SecurityType::classify(security);
        let transactions = match class {
            SecurityType::CurrencyPair => self.merged_fx_transactions(scope, security, range)?,
            SecurityType::StockOrBond | SecurityType::Derivative => {
                self.transactions.transactions(scope, security, range)?
            }
        };
        let redemptions = match class {
            // Shares and bonds are the only instruments the issuer can
            // retire.
            SecurityType::StockOrBond => self.cash_flows.redemptions(scope, security, range)?,
            SecurityType::Derivative | SecurityType::CurrencyPair => Vec::new(),
        };
        Ok(FifoPositions::new(transactions, redemptions))
    }

    /// A currency pair is quoted by several broker contracts; their
    /// streams are fetched separately, concatenated, and re-sorted,
    /// because merging sorted streams does not preserve global order.
    fn merged_fx_transactions(
        &self,
        scope: &PortfolioScope,
        security: &str,
        range: &DateRange,
    ) -> Result<Vec<Transaction>, PositionsError> {
        let pair = currency_pair(security)?;
        let mut merged = Vec::new();
        for contract in self.transactions.distinct_fx_contracts(scope, &pair, range)? {
            merged.extend(self.transactions.transactions(scope, &contract, range)?);
        }
        merged.sort_by(Transaction::chronological);
        Ok(merged)
    }
}

fn cache_key(security: &str, range: &DateRange) -> Result<String, PositionsError> {
    let key = match SecurityType::classify(security) {
        SecurityType::CurrencyPair => currency_pair(security)?,
        _ => security.to_string(),
    };
    Ok(format!("{}{}", key, range.cache_token()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use investfolio_model::{Action, SecurityCashFlow, Transaction};
    use rust_decimal_macros::dec;

    use super::*;

    const ISIN: &str = "RU0007661625";

    fn range() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        )
    }

    fn tx(id: &str, security: &str, secs: i64, action: Action) -> Transaction {
        Transaction {
            id: id.to_string(),
            portfolio: "p1".to_string(),
            security: security.to_string(),
            action,
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            count: dec!(10),
            price: dec!(100),
            currency: "RUB".to_string(),
        }
    }

    /// Counting fake: serves canned transactions and records every fetch.
    struct FakeSource {
        transactions: Vec<Transaction>,
        contracts: Vec<String>,
        fetches: AtomicUsize,
        fail_first: Mutex<bool>,
    }

    impl FakeSource {
        fn new(transactions: Vec<Transaction>, contracts: Vec<String>) -> Self {
            Self {
                transactions,
                contracts,
                fetches: AtomicUsize::new(0),
                fail_first: Mutex::new(false),
            }
        }

        fn failing_once(transactions: Vec<Transaction>) -> Self {
            let source = Self::new(transactions, Vec::new());
            *source.fail_first.lock().unwrap() = true;
            source
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl TransactionSource for FakeSource {
        fn transactions(
            &self,
            _scope: &PortfolioScope,
            security: &str,
            _range: &DateRange,
        ) -> Result<Vec<Transaction>, PositionsError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut fail = self.fail_first.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(PositionsError::DataAccess("backend down".to_string()));
            }
            Ok(self
                .transactions
                .iter()
                .filter(|t| t.security == security)
                .cloned()
                .collect())
        }

        fn distinct_fx_contracts(
            &self,
            _scope: &PortfolioScope,
            _pair: &str,
            _range: &DateRange,
        ) -> Result<Vec<String>, PositionsError> {
            Ok(self.contracts.clone())
        }
    }

    struct NoCashFlows {
        fetches: AtomicUsize,
    }

    impl NoCashFlows {
        fn new() -> Self {
            Self { fetches: AtomicUsize::new(0) }
        }
    }

    impl CashFlowSource for NoCashFlows {
        fn redemptions(
            &self,
            _scope: &PortfolioScope,
            _security: &str,
            _range: &DateRange,
        ) -> Result<Vec<SecurityCashFlow>, PositionsError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn factory(source: Arc<FakeSource>) -> (PositionsFactory, Arc<NoCashFlows>) {
        let cash_flows = Arc::new(NoCashFlows::new());
        (
            PositionsFactory::new(source, Arc::clone(&cash_flows) as Arc<dyn CashFlowSource>),
            cash_flows,
        )
    }

    #[test]
    fn repeated_gets_fetch_once_until_invalidated() {
        let source = Arc::new(FakeSource::new(
            vec![tx("a", ISIN, 0, Action::Buy)],
            Vec::new(),
        ));
        let (factory, _) = factory(Arc::clone(&source));
        let scope = PortfolioScope::Portfolio("p1".to_string());

        let first = factory.get(&scope, ISIN, &range()).unwrap();
        let second = factory.get(&scope, ISIN, &range()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 1);

        factory.invalidate_cache();
        factory.get(&scope, ISIN, &range()).unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn scopes_and_ranges_cache_separately() {
        let source = Arc::new(FakeSource::new(
            vec![tx("a", ISIN, 0, Action::Buy)],
            Vec::new(),
        ));
        let (factory, _) = factory(Arc::clone(&source));

        factory.get(&PortfolioScope::All, ISIN, &range()).unwrap();
        factory
            .get(&PortfolioScope::Portfolio("p1".to_string()), ISIN, &range())
            .unwrap();
        assert_eq!(source.fetch_count(), 2);

        let other_range = DateRange::new(range().from, range().from);
        factory.get(&PortfolioScope::All, ISIN, &other_range).unwrap();
        assert_eq!(source.fetch_count(), 3);
    }

    #[test]
    fn concurrent_gets_for_one_key_compute_once() {
        let source = Arc::new(FakeSource::new(
            vec![tx("a", ISIN, 0, Action::Buy)],
            Vec::new(),
        ));
        let (factory, _) = factory(Arc::clone(&source));
        let factory = Arc::new(factory);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                std::thread::spawn(move || {
                    factory
                        .get(&PortfolioScope::All, ISIN, &range())
                        .expect("get")
                        .transactions()
                        .len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("join"), 1);
        }
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn failed_computation_is_not_memoized() {
        let source = Arc::new(FakeSource::failing_once(vec![tx("a", ISIN, 0, Action::Buy)]));
        let (factory, _) = factory(Arc::clone(&source));

        let err = factory.get(&PortfolioScope::All, ISIN, &range());
        assert!(err.is_err());
        // The retry hits the source again and succeeds.
        let positions = factory.get(&PortfolioScope::All, ISIN, &range()).unwrap();
        assert_eq!(positions.transactions().len(), 1);
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn currency_pair_merges_contracts_in_time_order() {
        // Contract A trades at t=0 and t=20, contract B at t=10: the
        // merged stream must interleave them, not concatenate.
        let source = Arc::new(FakeSource::new(
            vec![
                tx("a1", "USDRUB_TOM", 0, Action::Buy),
                tx("a2", "USDRUB_TOM", 20, Action::Buy),
                tx("b1", "USDRUB_TOD", 10, Action::Buy),
            ],
            vec!["USDRUB_TOM".to_string(), "USDRUB_TOD".to_string()],
        ));
        let (factory, _) = factory(Arc::clone(&source));

        let positions = factory.get(&PortfolioScope::All, "USD/RUB", &range()).unwrap();
        let ids: Vec<_> = positions.transactions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a1", "b1", "a2"]);
        // One fetch per contract.
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn pair_spellings_share_a_cache_entry() {
        let source = Arc::new(FakeSource::new(
            vec![tx("a1", "USDRUB_TOM", 0, Action::Buy)],
            vec!["USDRUB_TOM".to_string()],
        ));
        let (factory, _) = factory(Arc::clone(&source));

        let via_slash = factory.get(&PortfolioScope::All, "USD/RUB", &range()).unwrap();
        let via_code = factory.get(&PortfolioScope::All, "USDRUB", &range()).unwrap();
        assert!(Arc::ptr_eq(&via_slash, &via_code));
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn redemptions_collected_only_for_stock_or_bond() {
        let source = Arc::new(FakeSource::new(
            vec![
                tx("a", ISIN, 0, Action::Buy),
                tx("d", "Si-6.21", 0, Action::Buy),
            ],
            Vec::new(),
        ));
        let (factory, cash_flows) = factory(Arc::clone(&source));

        factory.get(&PortfolioScope::All, "Si-6.21", &range()).unwrap();
        assert_eq!(cash_flows.fetches.load(Ordering::SeqCst), 0);

        factory.get(&PortfolioScope::All, ISIN, &range()).unwrap();
        assert_eq!(cash_flows.fetches.load(Ordering::SeqCst), 1);
    }
}
