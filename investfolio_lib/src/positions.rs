//! The result of FIFO matching over one instrument's event stream.

use investfolio_model::{SecurityCashFlow, Transaction};
use rust_decimal::Decimal;

use crate::fifo;

/// The event that closed (part of) an opening transaction: either a later
/// opposite-direction trade or a bond redemption, referenced by index into
/// the sequences held by [`FifoPositions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterparty {
    Trade(usize),
    Redemption(usize),
}

/// One matched lot: `quantity` units of the opening transaction at
/// `opening` were closed by `closing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub opening: usize,
    pub closing: Counterparty,
    pub quantity: Decimal,
}

/// One side of a pairing as seen from a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub counterparty: Counterparty,
    pub quantity: Decimal,
}

/// A transaction with unmatched quantity left at the end of the stream.
#[derive(Debug, Clone, Copy)]
pub struct OpenPosition<'a> {
    pub transaction: &'a Transaction,
    pub residual: Decimal,
}

/// FIFO partition of one instrument's transactions into closed and open.
///
/// Holds the input sequences plus, for every transaction, the list of
/// (counterparty, matched quantity) pairs that closed it and the residual
/// open quantity. Constructed once per cache entry from immutable inputs
/// and never mutated afterwards.
#[derive(Debug)]
pub struct FifoPositions {
    transactions: Vec<Transaction>,
    redemptions: Vec<SecurityCashFlow>,
    matches: Vec<Vec<Match>>,
    residuals: Vec<Decimal>,
    pairings: Vec<Pairing>,
}

impl FifoPositions {
    /// Runs the matching engine over the given sequences.
    ///
    /// Inputs are re-sorted by `(timestamp, id)` / timestamp before
    /// matching, so results are independent of input row order.
    pub fn new(
        mut transactions: Vec<Transaction>,
        mut redemptions: Vec<SecurityCashFlow>,
    ) -> Self {
        transactions.sort_by(Transaction::chronological);
        redemptions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let outcome = fifo::match_events(&transactions, &redemptions);

        let positions = Self {
            transactions,
            redemptions,
            matches: outcome.matches,
            residuals: outcome.residuals,
            pairings: outcome.pairings,
        };
        positions.check_conservation();
        positions
    }

    // Matched quantity + residual must equal the original count for every
    // transaction; anything else is a logic defect in the engine.
    fn check_conservation(&self) {
        for (i, tx) in self.transactions.iter().enumerate() {
            let matched: Decimal = self.matches[i].iter().map(|m| m.quantity).sum();
            assert!(
                matched + self.residuals[i] == tx.count && self.residuals[i] >= Decimal::ZERO,
                "FIFO conservation violated for transaction {}: matched {} + residual {} != count {}",
                tx.id,
                matched,
                self.residuals[i],
                tx.count,
            );
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn redemptions(&self) -> &[SecurityCashFlow] {
        &self.redemptions
    }

    pub fn transaction(&self, index: usize) -> &Transaction {
        &self.transactions[index]
    }

    pub fn redemption(&self, index: usize) -> &SecurityCashFlow {
        &self.redemptions[index]
    }

    /// The pairs that closed (part of) the transaction at `index`. Empty
    /// if it was never matched.
    pub fn matches(&self, index: usize) -> &[Match] {
        &self.matches[index]
    }

    /// Unmatched quantity of the transaction at `index`; zero when fully
    /// closed.
    pub fn residual(&self, index: usize) -> Decimal {
        self.residuals[index]
    }

    /// True when the transaction was matched at least once and nothing of
    /// it remains open.
    pub fn is_closed(&self, index: usize) -> bool {
        self.residuals[index].is_zero() && !self.matches[index].is_empty()
    }

    /// All matched lots in the order they were paired.
    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    /// Transactions still (partially) open, with their residual
    /// quantities, in stream order.
    pub fn open_positions(&self) -> Vec<OpenPosition<'_>> {
        self.transactions
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.residuals[*i].is_zero())
            .map(|(i, transaction)| OpenPosition {
                transaction,
                residual: self.residuals[i],
            })
            .collect()
    }

    /// Total quantity closed by matching: every pairing counted once.
    pub fn realized_count(&self) -> Decimal {
        self.pairings.iter().map(|p| p.quantity).sum()
    }

    /// Net open quantity, positive for a long position, negative for a
    /// short one.
    pub fn net_open_count(&self) -> Decimal {
        self.transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| match tx.action {
                investfolio_model::Action::Buy => self.residuals[i],
                investfolio_model::Action::Sell => -self.residuals[i],
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.redemptions.is_empty()
    }
}
