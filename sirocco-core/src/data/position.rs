//! Tracked positions and their lifecycle.
//!
//! A [`Position`] is an accepted signal promoted to an open trade. It is
//! owned exclusively by the simulation loop; strategies only ever see it
//! by shared reference. The lifecycle is a two-state machine: open, then
//! closed. Closing is terminal - the close fields are all-or-nothing and
//! a second close attempt is a structural invariant violation that fails
//! loudly rather than being papered over.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Amount, Price, Symbol, TradeDate};

use super::{DataValidationError, Direction, TradeLeg};

/// Standard option contract multiplier (shares per contract).
pub const CONTRACT_MULTIPLIER: Decimal = dec!(100);

/// Unique identifier for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PositionId(pub u64);

impl PositionId {
    /// Creates a new `PositionId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos_{}", self.0)
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Profit target reached
    ProfitTarget,
    /// Stop loss triggered
    StopLoss,
    /// Held to expiration and settled intrinsically
    Expiration,
    /// Closed early to avoid terminal time decay
    TimeDecay,
    /// Closed ahead of (or after) a scheduled macro event
    EventRisk,
    /// Strategy-specific exit signal
    SignalExit,
    /// Force-closed on the final simulated date
    EndOfBacktest,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProfitTarget => write!(f, "profit_target"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::Expiration => write!(f, "expiration"),
            Self::TimeDecay => write!(f, "time_decay"),
            Self::EventRisk => write!(f, "event_risk"),
            Self::SignalExit => write!(f, "signal_exit"),
            Self::EndOfBacktest => write!(f, "end_of_backtest"),
        }
    }
}

/// Terminal close fields, set together exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Exit date
    pub exit_date: TradeDate,
    /// Why the position was closed
    pub exit_reason: ExitReason,
    /// Realized profit or loss, net of all commissions
    pub realized_pnl: Amount,
}

/// An accepted signal promoted to a tracked trade.
///
/// Legs and entry economics are copied from the originating signal and
/// never mutated afterward; the only state transition is the terminal
/// close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Stable identifier
    pub id: PositionId,
    /// Originating strategy name
    pub strategy: String,
    /// Underlying ticker
    pub symbol: Symbol,
    /// Directional bias
    pub direction: Direction,
    /// Position legs
    pub legs: Vec<TradeLeg>,
    /// True if the position was entered for a net credit
    pub entry_is_credit: bool,
    /// Net credit received or debit paid per unit
    pub entry_value: Price,
    /// Maximum loss per unit (always > 0)
    pub max_loss_per_unit: Price,
    /// Maximum profit per unit
    pub max_profit_per_unit: Price,
    /// Exit when profit reaches this fraction of the maximum
    pub profit_target: Decimal,
    /// Exit when loss reaches this multiple of the entry value
    pub stop_loss_multiple: Decimal,
    /// Number of contracts (always >= 1)
    pub contracts: u32,
    /// Entry date
    pub entry_date: TradeDate,
    /// Total commission charged so far (entry, then entry + exit)
    pub commission_paid: Amount,
    /// Terminal close fields; `None` while open
    closed: Option<ClosedTrade>,
}

/// Arguments for opening a position.
///
/// Groups the entry economics so `Position::open` stays readable.
#[derive(Debug, Clone)]
pub struct PositionEntry {
    /// Originating strategy name
    pub strategy: String,
    /// Underlying ticker
    pub symbol: Symbol,
    /// Directional bias
    pub direction: Direction,
    /// Position legs
    pub legs: Vec<TradeLeg>,
    /// True if entered for a net credit
    pub entry_is_credit: bool,
    /// Net credit or debit per unit
    pub entry_value: Price,
    /// Maximum loss per unit
    pub max_loss_per_unit: Price,
    /// Maximum profit per unit
    pub max_profit_per_unit: Price,
    /// Profit-target fraction
    pub profit_target: Decimal,
    /// Stop-loss multiple
    pub stop_loss_multiple: Decimal,
    /// Contract count
    pub contracts: u32,
    /// Entry date
    pub entry_date: TradeDate,
    /// Entry commission already charged
    pub entry_commission: Amount,
}

impl Position {
    /// Opens a new position.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_loss_per_unit` is not positive, if
    /// `contracts` is zero, or if the position has no legs.
    pub fn open(id: PositionId, entry: PositionEntry) -> Result<Self, DataValidationError> {
        if entry.max_loss_per_unit.is_zero() {
            return Err(DataValidationError::InvalidPosition(
                "max loss per unit must be positive".to_string(),
            ));
        }
        if entry.contracts == 0 {
            return Err(DataValidationError::InvalidPosition(
                "contracts must be at least 1".to_string(),
            ));
        }
        if entry.legs.is_empty() {
            return Err(DataValidationError::InvalidPosition(
                "position requires at least one leg".to_string(),
            ));
        }
        Ok(Self {
            id,
            strategy: entry.strategy,
            symbol: entry.symbol,
            direction: entry.direction,
            legs: entry.legs,
            entry_is_credit: entry.entry_is_credit,
            entry_value: entry.entry_value,
            max_loss_per_unit: entry.max_loss_per_unit,
            max_profit_per_unit: entry.max_profit_per_unit,
            profit_target: entry.profit_target,
            stop_loss_multiple: entry.stop_loss_multiple,
            contracts: entry.contracts,
            entry_date: entry.entry_date,
            commission_paid: entry.entry_commission,
            closed: None,
        })
    }

    /// Returns true while the position has not been closed.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.closed.is_none()
    }

    /// Returns the terminal close record, if closed.
    #[must_use]
    pub const fn closed(&self) -> Option<&ClosedTrade> {
        self.closed.as_ref()
    }

    /// Closes the position.
    ///
    /// `exit_commission` is added to the running commission total.
    ///
    /// # Errors
    ///
    /// Returns `DataValidationError::AlreadyClosed` if the position was
    /// closed before; this indicates engine-internal state corruption and
    /// callers are expected to propagate it.
    pub fn close(
        &mut self,
        exit_date: TradeDate,
        exit_reason: ExitReason,
        realized_pnl: Amount,
        exit_commission: Amount,
    ) -> Result<(), DataValidationError> {
        if self.closed.is_some() {
            return Err(DataValidationError::AlreadyClosed(self.id.as_u64()));
        }
        self.commission_paid += exit_commission;
        self.closed = Some(ClosedTrade {
            exit_date,
            exit_reason,
            realized_pnl,
        });
        Ok(())
    }

    /// Dollar risk committed by this position:
    /// `max_loss_per_unit x contracts x 100`.
    #[must_use]
    pub fn committed_risk(&self) -> Amount {
        Amount::new(
            self.max_loss_per_unit.as_decimal()
                * Decimal::from(self.contracts)
                * CONTRACT_MULTIPLIER,
        )
    }

    /// Returns the number of legs.
    #[must_use]
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Returns true if any leg is an option leg.
    #[must_use]
    pub fn has_option_legs(&self) -> bool {
        self.legs.iter().any(|l| l.kind.is_option())
    }

    /// Earliest expiration among option legs, if any.
    #[must_use]
    pub fn nearest_expiration(&self) -> Option<TradeDate> {
        self.legs
            .iter()
            .filter(|l| l.kind.is_option())
            .map(|l| l.expiration)
            .min()
    }

    /// Calendar days until the nearest option expiration, as of `date`.
    ///
    /// Negative when the nearest expiration has passed. `None` for
    /// underlying-only positions.
    #[must_use]
    pub fn days_to_expiration(&self, date: TradeDate) -> Option<i64> {
        self.nearest_expiration().map(|exp| date.days_until(exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LegKind;
    use rust_decimal_macros::dec;

    fn create_entry() -> PositionEntry {
        let expiry = TradeDate::from_ymd(2024, 2, 16).unwrap();
        PositionEntry {
            strategy: "credit_spread".to_string(),
            symbol: Symbol::new("SPY").unwrap(),
            direction: Direction::Long,
            legs: vec![
                TradeLeg::option(
                    LegKind::ShortPut,
                    Price::new(dec!(450)).unwrap(),
                    expiry,
                    Price::new(dec!(3.20)).unwrap(),
                )
                .unwrap(),
                TradeLeg::option(
                    LegKind::LongPut,
                    Price::new(dec!(445)).unwrap(),
                    expiry,
                    Price::new(dec!(1.45)).unwrap(),
                )
                .unwrap(),
            ],
            entry_is_credit: true,
            entry_value: Price::new(dec!(1.75)).unwrap(),
            max_loss_per_unit: Price::new(dec!(3.25)).unwrap(),
            max_profit_per_unit: Price::new(dec!(1.75)).unwrap(),
            profit_target: dec!(0.5),
            stop_loss_multiple: dec!(2.0),
            contracts: 2,
            entry_date: TradeDate::from_ymd(2024, 1, 15).unwrap(),
            entry_commission: Amount::new(dec!(2.60)),
        }
    }

    #[test]
    fn test_position_open_valid() {
        let position = Position::open(PositionId::new(1), create_entry()).unwrap();
        assert!(position.is_open());
        assert_eq!(position.committed_risk().as_decimal(), dec!(650));
        assert_eq!(position.leg_count(), 2);
        assert!(position.has_option_legs());
    }

    #[test]
    fn test_position_open_rejects_zero_max_loss() {
        let mut entry = create_entry();
        entry.max_loss_per_unit = Price::ZERO;
        let result = Position::open(PositionId::new(1), entry);
        assert!(matches!(
            result,
            Err(DataValidationError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_position_open_rejects_zero_contracts() {
        let mut entry = create_entry();
        entry.contracts = 0;
        let result = Position::open(PositionId::new(1), entry);
        assert!(matches!(
            result,
            Err(DataValidationError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_position_close_is_terminal() {
        let mut position = Position::open(PositionId::new(7), create_entry()).unwrap();
        let exit_date = TradeDate::from_ymd(2024, 2, 16).unwrap();
        position
            .close(
                exit_date,
                ExitReason::Expiration,
                Amount::new(dec!(350)),
                Amount::new(dec!(2.60)),
            )
            .unwrap();

        assert!(!position.is_open());
        let closed = position.closed().unwrap();
        assert_eq!(closed.exit_reason, ExitReason::Expiration);
        assert_eq!(closed.realized_pnl.as_decimal(), dec!(350));
        assert_eq!(position.commission_paid.as_decimal(), dec!(5.20));

        let again = position.close(
            exit_date,
            ExitReason::StopLoss,
            Amount::ZERO,
            Amount::ZERO,
        );
        assert!(matches!(again, Err(DataValidationError::AlreadyClosed(7))));
    }

    #[test]
    fn test_position_days_to_expiration() {
        let position = Position::open(PositionId::new(1), create_entry()).unwrap();
        let asof = TradeDate::from_ymd(2024, 2, 9).unwrap();
        assert_eq!(position.days_to_expiration(asof), Some(7));
        assert_eq!(
            position.nearest_expiration(),
            Some(TradeDate::from_ymd(2024, 2, 16).unwrap())
        );
    }
}
