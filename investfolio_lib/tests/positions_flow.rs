//! End-to-end flow: normalized records → SQLite store → positions
//! factory → FIFO positions.

use std::sync::Arc;

use chrono::NaiveDate;
use investfolio_lib::{CashFlowSource, PositionsFactory, Store, TransactionSource};
use investfolio_model::{
    Action, CashFlowType, DateRange, PortfolioScope, RecordSecurityType, SecurityCashFlow,
    TransactionRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BOND: &str = "RU000A0JX0J2";

fn record(
    portfolio: &str,
    security: &str,
    security_type: RecordSecurityType,
    action: Action,
    day: u32,
    count: Decimal,
) -> TransactionRecord {
    TransactionRecord {
        portfolio: portfolio.to_string(),
        action,
        date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        security: security.to_string(),
        security_type,
        count,
        price: dec!(1000),
        accrued_interest: None,
        price_currency: "RUB".to_string(),
        commission: Some(dec!(2.5)),
        commission_currency: "RUB".to_string(),
    }
}

fn year_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc(),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap().and_hms_opt(23, 59, 59).unwrap().and_utc(),
    )
}

fn setup() -> (Arc<Store>, PositionsFactory) {
    let store = Arc::new(Store::open_in_memory().expect("open"));
    store.init().expect("init");
    let factory = PositionsFactory::new(
        Arc::clone(&store) as Arc<dyn TransactionSource>,
        Arc::clone(&store) as Arc<dyn CashFlowSource>,
    );
    (store, factory)
}

#[test]
fn bond_redemption_closes_position_end_to_end() {
    let (store, factory) = setup();

    let buy = record(
        "broker-1",
        &format!("OFZ 26207 ({BOND})"),
        RecordSecurityType::Bond,
        Action::Buy,
        1,
        dec!(100),
    );
    store
        .insert_transaction(&buy.to_transaction().expect("record"))
        .expect("insert");
    store
        .insert_cash_flow(&SecurityCashFlow {
            portfolio: "broker-1".to_string(),
            security: BOND.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_utc(),
            event: CashFlowType::Redemption,
            count: dec!(100),
            value: dec!(100000),
            currency: "RUB".to_string(),
        })
        .expect("insert event");

    let positions = factory
        .get(&PortfolioScope::Portfolio("broker-1".to_string()), BOND, &year_range())
        .expect("get");
    assert_eq!(positions.transactions().len(), 1);
    assert!(positions.is_closed(0));
    assert_eq!(positions.net_open_count(), Decimal::ZERO);
    assert_eq!(positions.realized_count(), dec!(100));
}

#[test]
fn reimport_then_invalidate_reflects_no_duplicates() {
    let (store, factory) = setup();

    let buy = record(
        "broker-1",
        "Gazprom (RU0007661625)",
        RecordSecurityType::Share,
        Action::Buy,
        1,
        dec!(50),
    );
    let tx = buy.to_transaction().expect("record");
    assert!(store.insert_transaction(&tx).expect("insert"));

    let scope = PortfolioScope::All;
    let before = factory.get(&scope, "RU0007661625", &year_range()).expect("get");
    assert_eq!(before.transactions().len(), 1);

    // Re-importing the same report row hits the same content-hash id.
    assert!(!store.insert_transaction(&tx).expect("reinsert"));
    factory.invalidate_cache();

    let after = factory.get(&scope, "RU0007661625", &year_range()).expect("get");
    assert_eq!(after.transactions().len(), 1);
}

#[test]
fn currency_pair_view_spans_contracts_and_portfolios() {
    let (store, factory) = setup();

    let legs = [
        ("broker-1", "USDRUB_TOM", Action::Buy, 1, dec!(100)),
        ("broker-1", "USDRUB_TOD", Action::Buy, 2, dec!(50)),
        ("broker-2", "USDRUB_TOM", Action::Sell, 3, dec!(30)),
    ];
    for (portfolio, contract, action, day, count) in legs {
        let rec = record(portfolio, contract, RecordSecurityType::Currency, action, day, count);
        store
            .insert_transaction(&rec.to_transaction().expect("record"))
            .expect("insert");
    }

    let positions = factory
        .get(&PortfolioScope::All, "USD/RUB", &year_range())
        .expect("get");
    assert_eq!(positions.transactions().len(), 3);
    // Merged across contracts, in time order.
    let contracts: Vec<_> = positions
        .transactions()
        .iter()
        .map(|t| t.security.as_str())
        .collect();
    assert_eq!(contracts, ["USDRUB_TOM", "USDRUB_TOD", "USDRUB_TOM"]);
    // The sell closes the oldest buy first.
    assert_eq!(positions.net_open_count(), dec!(120));
    assert_eq!(positions.realized_count(), dec!(30));

    // Scoped to one portfolio, the other broker's legs disappear.
    let scoped = factory
        .get(
            &PortfolioScope::Portfolio("broker-2".to_string()),
            "USDRUB",
            &year_range(),
        )
        .expect("get");
    assert_eq!(scoped.transactions().len(), 1);
    assert_eq!(scoped.net_open_count(), dec!(-30));
}
