//! NewType wrappers for financial primitives.
//!
//! This module provides type-safe wrappers around decimal and calendar
//! values to prevent mixing incompatible types at compile time.
//!
//! # Types
//!
//! - [`Price`] - Non-negative per-unit prices
//! - [`Amount`] - Signed monetary amounts
//! - [`Symbol`] - Ticker identifiers
//! - [`TradeDate`] - Calendar trading dates

mod amount;
mod date;
mod price;
mod symbol;

pub use amount::Amount;
pub use date::TradeDate;
pub use price::Price;
pub use symbol::Symbol;

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Price value is negative
    #[error("price cannot be negative: {0}")]
    NegativePrice(rust_decimal::Decimal),

    /// Symbol is empty
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// Symbol contains invalid characters
    #[error("invalid symbol format: {0}")]
    InvalidSymbol(String),

    /// Date string could not be parsed
    #[error("invalid date: {0}")]
    InvalidDate(String),
}
