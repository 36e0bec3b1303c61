//! Core strategy trait definition.

use sirocco_core::data::Position;
use sirocco_market::MarketSnapshot;

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::StrategyError;

/// Core strategy trait.
///
/// All trading strategies implement this trait. The trait is designed to
/// be:
/// - **Synchronous**: the simulation loop is sequential by construction
/// - **Stateless across days**: strategies hold parameters, not market
///   state; everything they need arrives in the snapshot and views
/// - **Thread-safe**: `Send + Sync` so independent engine instances can
///   run concurrently
///
/// # Contract
///
/// - `generate_signals` must not mutate the snapshot and must express
///   routine "no opportunity" days as `Ok(vec![])`; an `Err` means the
///   strategy itself failed and is quarantined for that day only.
/// - `manage_position` is called for every open position of the strategy
///   every day, before new entries are considered.
/// - `size_position` returns the contract count for an accepted signal;
///   zero rejects the signal. Implementations enforce their per-strategy
///   risk budget and the portfolio-wide heat cap.
pub trait Strategy: Send + Sync {
    /// Returns the unique name of this strategy instance.
    ///
    /// Used for position bookkeeping, per-strategy caps, logging, and
    /// reporting.
    fn name(&self) -> &str;

    /// Scans the snapshot and returns zero or more candidate signals.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyError`] only for genuine failures; "nothing to
    /// do today" is `Ok(vec![])`.
    fn generate_signals(&self, snapshot: &MarketSnapshot)
        -> Result<Vec<TradeSignal>, StrategyError>;

    /// Evaluates an open position and returns the management action.
    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction;

    /// Decides the contract count for an accepted signal.
    ///
    /// Returning 0 rejects the signal.
    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32;

    /// Advertises the tunable parameter space for the optimizer.
    fn parameter_space(&self) -> Vec<ParameterDescriptor>;
}
