//! Library layer for Investfolio: FIFO position matching, the memoized
//! positions factory, and the SQLite transaction store.
//!
//! The core is [`FifoPositions`], the partition of one instrument's trade
//! stream into closed and still-open lots under first-in-first-out
//! matching, and [`PositionsFactory`], which assembles inputs from the
//! store and caches results until the next import invalidates them.

pub mod error;
pub mod factory;
mod fifo;
pub mod positions;
pub mod repository;
pub mod store;

pub use investfolio_model as model;

pub use error::PositionsError;
pub use factory::PositionsFactory;
pub use positions::{Counterparty, FifoPositions, Match, OpenPosition, Pairing};
pub use repository::{CashFlowSource, TransactionSource};
pub use store::{Store, StoreError};
