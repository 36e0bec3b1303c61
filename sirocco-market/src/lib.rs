//! # Sirocco Market
//!
//! Market snapshot construction for the Sirocco backtesting system.
//!
//! This crate provides:
//! - Technical indicators (moving averages, trend slope, true-range
//!   volatility, oscillator, volatility rank)
//! - Rule-based market regime classification
//! - An immutable economic event calendar
//! - The per-day `MarketSnapshot` bundle and its builder
//!
//! The simulation loop builds exactly one snapshot per trading day;
//! strategies receive it by shared reference and must treat it as
//! read-only.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::float_cmp))]

/// Technical indicator calculations.
pub mod indicators;
/// Market regime classification.
pub mod regime;
/// Economic event calendar.
pub mod events;
/// Daily market snapshot and builder.
pub mod snapshot;

pub use events::EventCalendar;
pub use regime::{classify, Regime};
pub use snapshot::{MarketData, MarketSnapshot, SnapshotBuilder, SnapshotConfig, TickerStats};

/// Market data error type.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// No price data available for any requested ticker
    #[error("no price data available for any requested ticker")]
    NoData,

    /// Bars for a symbol are not sorted chronologically
    #[error("bars for {symbol} are not sorted chronologically at index {index}")]
    UnsortedData {
        /// Symbol with unsorted data
        symbol: sirocco_core::types::Symbol,
        /// Index where the order breaks
        index: usize,
    },
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::EventCalendar;
    pub use crate::regime::{classify, Regime};
    pub use crate::snapshot::{
        MarketData, MarketSnapshot, SnapshotBuilder, SnapshotConfig, TickerStats,
    };
    pub use crate::MarketError;
}
