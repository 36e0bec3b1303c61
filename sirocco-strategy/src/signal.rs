//! Trade signal candidates.
//!
//! A [`TradeSignal`] is a candidate trade proposed by a strategy for the
//! current day. Signals are created fresh each day and discarded if not
//! accepted. Economically invalid signals (non-positive entry value or
//! max loss) are rejected at construction time and never reach the
//! admission-control stage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use sirocco_core::data::{Direction, TradeLeg};
use sirocco_core::types::{Price, Symbol, TradeDate};

/// Error rejecting an economically invalid signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// Net credit or debit per unit must be positive
    #[error("entry value must be positive, got {0}")]
    NonPositiveEntryValue(Decimal),

    /// Maximum loss per unit must be positive
    #[error("max loss must be positive, got {0}")]
    NonPositiveMaxLoss(Decimal),

    /// A signal needs at least one leg
    #[error("signal has no legs")]
    NoLegs,
}

/// A candidate trade proposed by a strategy for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Originating strategy name
    pub strategy: String,
    /// Underlying ticker
    pub symbol: Symbol,
    /// Directional bias
    pub direction: Direction,
    /// Ordered legs
    pub legs: Vec<TradeLeg>,
    /// True if the trade is entered for a net credit
    pub entry_is_credit: bool,
    /// Net credit received or debit paid per unit
    pub entry_value: Price,
    /// Maximum loss per unit
    pub max_loss_per_unit: Price,
    /// Maximum profit per unit
    pub max_profit_per_unit: Price,
    /// Exit when profit reaches this fraction of the maximum
    pub profit_target: Decimal,
    /// Exit when loss reaches this multiple of the entry value
    pub stop_loss_multiple: Decimal,
    /// Ranking score (higher is admitted first)
    pub score: Decimal,
    /// Free-form strategy metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Date the signal was generated; stamped by the simulation loop
    #[serde(default)]
    pub signal_date: Option<TradeDate>,
}

impl TradeSignal {
    /// Validates the signal's entry economics.
    ///
    /// # Errors
    ///
    /// Returns a [`SignalError`] for a non-positive entry value, a
    /// non-positive max loss, or an empty leg set.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.legs.is_empty() {
            return Err(SignalError::NoLegs);
        }
        if self.entry_value.is_zero() {
            return Err(SignalError::NonPositiveEntryValue(
                self.entry_value.as_decimal(),
            ));
        }
        if self.max_loss_per_unit.is_zero() {
            return Err(SignalError::NonPositiveMaxLoss(
                self.max_loss_per_unit.as_decimal(),
            ));
        }
        Ok(())
    }

    /// Undiversified one-unit dollar risk estimate:
    /// `max_loss_per_unit x 100`.
    #[must_use]
    pub fn unit_risk(&self) -> Decimal {
        self.max_loss_per_unit.as_decimal() * sirocco_core::data::CONTRACT_MULTIPLIER
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {}@{} score={}",
            self.strategy,
            self.symbol,
            self.direction,
            if self.entry_is_credit { "credit" } else { "debit" },
            self.entry_value,
            self.score
        )
    }
}
