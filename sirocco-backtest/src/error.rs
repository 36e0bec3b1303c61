//! Backtest error types.

use thiserror::Error;

use sirocco_core::data::PositionId;

/// Backtest error type.
///
/// Recoverable conditions (a ticker missing for a day, a strategy
/// erroring on one day) are handled inside the loop and never surface
/// here. A whole-run failure means either invalid inputs or
/// engine-internal state corruption.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// Invalid simulation configuration
    #[error(transparent)]
    Config(#[from] sirocco_core::config::ConfigError),

    /// Market data was unusable (empty or unsorted)
    #[error(transparent)]
    Market(#[from] sirocco_market::MarketError),

    /// Position construction or transition failed
    #[error(transparent)]
    Data(#[from] sirocco_core::data::DataValidationError),

    /// A position was found in neither the open nor the closed set, or an
    /// equivalent structural invariant broke. Indicates engine-internal
    /// state corruption; never recovered.
    #[error("state corruption: {0}")]
    StateCorruption(String),

    /// No settlement price available for a position that must close
    #[error("no settlement price for position {0}")]
    NoSettlementPrice(PositionId),
}
