//! Position management actions.

use serde::{Deserialize, Serialize};
use std::fmt;

use sirocco_core::data::ExitReason;

/// Outcome of one `manage_position` evaluation.
///
/// Every open position is evaluated every day before new entries are
/// considered; any non-hold value moves the position to the closed set.
/// The action determines how realized P&L is computed: expiration closes
/// settle intrinsically, all others mark to market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionAction {
    /// Keep the position open
    Hold,
    /// Profit target reached
    CloseProfitTarget,
    /// Stop loss triggered
    CloseStopLoss,
    /// The nearest option leg has reached expiration
    CloseExpiration,
    /// Close early to avoid terminal time decay
    CloseTimeDecay,
    /// Close around a scheduled macro event
    CloseEvent,
    /// Strategy-specific exit condition
    CloseSignalExit,
}

impl PositionAction {
    /// Returns true for any non-hold action.
    #[must_use]
    pub const fn is_close(&self) -> bool {
        !matches!(self, Self::Hold)
    }

    /// Maps a close action to its exit reason.
    ///
    /// Returns `None` for `Hold`.
    #[must_use]
    pub const fn to_exit_reason(&self) -> Option<ExitReason> {
        match self {
            Self::Hold => None,
            Self::CloseProfitTarget => Some(ExitReason::ProfitTarget),
            Self::CloseStopLoss => Some(ExitReason::StopLoss),
            Self::CloseExpiration => Some(ExitReason::Expiration),
            Self::CloseTimeDecay => Some(ExitReason::TimeDecay),
            Self::CloseEvent => Some(ExitReason::EventRisk),
            Self::CloseSignalExit => Some(ExitReason::SignalExit),
        }
    }
}

impl fmt::Display for PositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => write!(f, "hold"),
            Self::CloseProfitTarget => write!(f, "close_profit_target"),
            Self::CloseStopLoss => write!(f, "close_stop_loss"),
            Self::CloseExpiration => write!(f, "close_expiration"),
            Self::CloseTimeDecay => write!(f, "close_time_decay"),
            Self::CloseEvent => write!(f, "close_event"),
            Self::CloseSignalExit => write!(f, "close_signal_exit"),
        }
    }
}
