//! The FIFO lot-matching algorithm.
//!
//! Trades and redemptions are replayed strictly in timestamp order (ties
//! broken by content-hash id; a redemption at the same instant as a trade
//! runs after it). Two queues hold open lots: buys that opened long
//! exposure and sells that opened short exposure. An incoming trade first
//! consumes the oldest opposite-direction lots; only what it cannot match
//! becomes a new open lot of its own direction, so long and short never
//! accumulate simultaneously. A redemption is a forced close: it consumes
//! long-side lots of its instrument and never opens anything.

use std::collections::VecDeque;

use investfolio_model::{Action, SecurityCashFlow, Transaction};
use rust_decimal::Decimal;
use tracing::warn;

use crate::positions::{Counterparty, Match, Pairing};

pub(crate) struct MatchOutcome {
    pub pairings: Vec<Pairing>,
    /// Per-transaction pair lists, parallel to the input sequence.
    pub matches: Vec<Vec<Match>>,
    /// Per-transaction unmatched quantity, parallel to the input sequence.
    pub residuals: Vec<Decimal>,
}

struct OpenLot {
    index: usize,
    remaining: Decimal,
}

/// Matches the (already sorted) transaction and redemption sequences.
pub(crate) fn match_events(
    transactions: &[Transaction],
    redemptions: &[SecurityCashFlow],
) -> MatchOutcome {
    let mut pairings: Vec<Pairing> = Vec::new();
    let mut longs: VecDeque<OpenLot> = VecDeque::new();
    let mut shorts: VecDeque<OpenLot> = VecDeque::new();

    let mut next_redemption = 0;
    for (i, tx) in transactions.iter().enumerate() {
        // Redemptions strictly before this trade's timestamp fire first;
        // one at the same instant waits until the trade has been netted.
        while next_redemption < redemptions.len()
            && redemptions[next_redemption].timestamp < tx.timestamp
        {
            redeem(next_redemption, redemptions, transactions, &mut longs, &mut pairings);
            next_redemption += 1;
        }

        let (opposite, own) = match tx.action {
            Action::Buy => (&mut shorts, &mut longs),
            Action::Sell => (&mut longs, &mut shorts),
        };
        let remainder = close_lots(
            opposite,
            tx.count,
            Counterparty::Trade(i),
            None,
            transactions,
            &mut pairings,
        );
        if !remainder.is_zero() {
            own.push_back(OpenLot {
                index: i,
                remaining: remainder,
            });
        }
    }
    while next_redemption < redemptions.len() {
        redeem(next_redemption, redemptions, transactions, &mut longs, &mut pairings);
        next_redemption += 1;
    }

    collect(transactions.len(), pairings, &longs, &shorts)
}

fn redeem(
    index: usize,
    redemptions: &[SecurityCashFlow],
    transactions: &[Transaction],
    longs: &mut VecDeque<OpenLot>,
    pairings: &mut Vec<Pairing>,
) {
    let event = &redemptions[index];
    let remainder = close_lots(
        longs,
        event.count,
        Counterparty::Redemption(index),
        Some(&event.security),
        transactions,
        pairings,
    );
    if !remainder.is_zero() {
        // Data inconsistency in the imported reports, not a caller error:
        // cap at the available open quantity and keep going.
        warn!(
            "redemption of {} x {} at {} exceeds open quantity by {}; clamping",
            event.count, event.security, event.timestamp, remainder
        );
    }
}

/// Consumes open lots from the front of `queue` until `quantity` is
/// exhausted, recording a pairing per consumed lot. Returns the unmatched
/// remainder. With `security` set, only lots of that instrument are
/// touched.
fn close_lots(
    queue: &mut VecDeque<OpenLot>,
    mut quantity: Decimal,
    closing: Counterparty,
    security: Option<&str>,
    transactions: &[Transaction],
    pairings: &mut Vec<Pairing>,
) -> Decimal {
    while !quantity.is_zero() {
        let Some(front) = queue.front_mut() else {
            break;
        };
        if let Some(security) = security {
            if transactions[front.index].security != security {
                break;
            }
        }
        let matched = quantity.min(front.remaining);
        pairings.push(Pairing {
            opening: front.index,
            closing,
            quantity: matched,
        });
        quantity -= matched;
        front.remaining -= matched;
        if front.remaining.is_zero() {
            queue.pop_front();
        }
    }
    quantity
}

fn collect(
    transaction_count: usize,
    pairings: Vec<Pairing>,
    longs: &VecDeque<OpenLot>,
    shorts: &VecDeque<OpenLot>,
) -> MatchOutcome {
    let mut matches = vec![Vec::new(); transaction_count];
    for pairing in &pairings {
        matches[pairing.opening].push(Match {
            counterparty: pairing.closing,
            quantity: pairing.quantity,
        });
        if let Counterparty::Trade(closer) = pairing.closing {
            matches[closer].push(Match {
                counterparty: Counterparty::Trade(pairing.opening),
                quantity: pairing.quantity,
            });
        }
    }

    let mut residuals = vec![Decimal::ZERO; transaction_count];
    for lot in longs.iter().chain(shorts.iter()) {
        residuals[lot.index] = lot.remaining;
    }

    MatchOutcome {
        pairings,
        matches,
        residuals,
    }
}
