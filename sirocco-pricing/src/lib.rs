//! # Sirocco Pricing
//!
//! Option pricing and multi-leg position valuation for the Sirocco
//! backtesting system.
//!
//! This crate provides:
//! - Closed-form lognormal (Black-Scholes) option pricing with degenerate
//!   inputs clamped to safe floors
//! - Delta calculation and delta-targeted strike selection
//! - Signed multi-leg position valuation used both for entry economics and
//!   for mark-to-market exit decisions
//! - Intrinsic settlement for positions held to expiration
//!
//! Monetary values cross the API as `Decimal`-backed types; the pricing
//! kernel itself runs in `f64` (the normal CDF uses `libm::erf`).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::suboptimal_flops)]
#![cfg_attr(test, allow(clippy::float_cmp))]

/// Black-Scholes pricing kernel.
pub mod bs;
/// Multi-leg position valuation and settlement.
pub mod valuation;

pub use bs::{delta, option_price, strike_for_delta, years_between};
pub use valuation::{intrinsic_settlement, leg_value, position_value};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bs::{delta, option_price, strike_for_delta, years_between};
    pub use crate::valuation::{intrinsic_settlement, leg_value, position_value};
}
