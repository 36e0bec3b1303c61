//! Market and trade data structures.
//!
//! # Types
//!
//! - [`DailyBar`] - One day of OHLCV data for a ticker
//! - [`LegKind`] / [`TradeLeg`] - Option and underlying position legs
//! - [`Direction`] - Directional bias of a trade
//! - [`Position`] / [`PositionId`] / [`ExitReason`] - Tracked open/closed trades
//! - [`EventKind`] / [`EconomicEvent`] - Scheduled macro events

mod bar;
mod event;
mod leg;
mod position;

pub use bar::{DailyBar, DailyBarBuilder};
pub use event::{EconomicEvent, EventKind};
pub use leg::{Direction, LegKind, TradeLeg};
pub use position::{
    ClosedTrade, ExitReason, Position, PositionEntry, PositionId, CONTRACT_MULTIPLIER,
};

/// Validation error for data structure construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataValidationError {
    /// A required builder field was not set
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// OHLC prices are mutually inconsistent
    #[error("invalid price relation: {0}")]
    InvalidPriceRelation(String),

    /// An option leg was constructed with underlying kind or vice versa
    #[error("invalid leg: {0}")]
    InvalidLeg(String),

    /// Position economics violate an invariant (non-positive max loss, zero contracts)
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// A terminal state transition was attempted twice
    #[error("position {0} is already closed")]
    AlreadyClosed(u64),
}
