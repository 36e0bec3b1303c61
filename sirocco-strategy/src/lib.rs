//! # Sirocco Strategy
//!
//! Strategy plugin interface and concrete trading strategies for the
//! Sirocco backtesting system.
//!
//! This crate provides:
//! - The [`Strategy`] trait every strategy implements: signal generation,
//!   open-position management, position sizing, and the tunable parameter
//!   space
//! - [`TradeSignal`] candidates with construction-time economic validation
//! - The [`PortfolioView`] read-only sizing view
//! - A name-to-constructor [`registry`] for building strategies from
//!   configuration
//! - Seven concrete strategy implementations
//!
//! Strategies are deliberately synchronous and stateless across days:
//! they receive read-only views (`MarketSnapshot`, `PortfolioView`) and
//! must never retain references across calls.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

/// Position management actions.
pub mod action;
/// Read-only portfolio view for sizing decisions.
pub mod context;
/// Tunable parameter descriptors.
pub mod params;
/// Strategy registry (name to constructor lookup).
pub mod registry;
/// Trade signal candidates.
pub mod signal;
/// Concrete strategy implementations.
pub mod strategies;
/// The core strategy trait.
pub mod r#trait;

pub use action::PositionAction;
pub use context::PortfolioView;
pub use params::ParameterDescriptor;
pub use r#trait::Strategy;
pub use signal::{SignalError, TradeSignal};

/// Strategy execution error.
///
/// Distinguishes "the strategy errored" from the routine empty-signal
/// "no opportunity" case, which is expressed as `Ok(vec![])`.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Signal generation failed for one strategy on one day
    #[error("strategy '{strategy}' failed: {message}")]
    Failed {
        /// Strategy name
        strategy: String,
        /// What went wrong
        message: String,
    },

    /// Strategy parameters were invalid at construction
    #[error("invalid parameters for strategy '{strategy}': {message}")]
    InvalidParams {
        /// Strategy name
        strategy: String,
        /// What was invalid
        message: String,
    },
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::action::PositionAction;
    pub use crate::context::PortfolioView;
    pub use crate::params::ParameterDescriptor;
    pub use crate::r#trait::Strategy;
    pub use crate::registry;
    pub use crate::signal::{SignalError, TradeSignal};
    pub use crate::StrategyError;
}
