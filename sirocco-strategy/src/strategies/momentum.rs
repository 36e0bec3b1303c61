//! Momentum swing strategy on the underlying.
//!
//! The only strategy in the set that trades shares instead of options:
//! rides an established trend with a fixed fractional stop and target.
//! One contract unit corresponds to 100 shares, matching the option
//! contract multiplier used everywhere else.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::{Direction, LegKind, Position, TradeLeg};
use sirocco_core::types::{Price, Symbol};
use sirocco_market::{MarketSnapshot, Regime};

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::r#trait::Strategy;
use crate::StrategyError;

use super::common;

/// Placeholder expiration horizon for underlying legs (they never
/// expire).
const UNDERLYING_HORIZON_DAYS: u64 = 365;

/// Momentum strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Minimum absolute trend slope required
    #[serde(default = "default_min_trend")]
    pub min_trend: Decimal,
    /// Oscillator floor for longs (avoid catching falling knives)
    #[serde(default = "default_min_oscillator_long")]
    pub min_oscillator_long: Decimal,
    /// Oscillator ceiling for longs (avoid chasing overbought tape)
    #[serde(default = "default_max_oscillator_long")]
    pub max_oscillator_long: Decimal,
    /// Stop distance as a fraction of the entry price
    #[serde(default = "default_stop_fraction")]
    pub stop_fraction: Decimal,
    /// Target distance as a fraction of the entry price
    #[serde(default = "default_target_fraction")]
    pub target_fraction: Decimal,
    /// Time stop in calendar days
    #[serde(default = "default_max_hold_days")]
    pub max_hold_days: i64,
    /// Per-trade risk budget as a fraction of equity
    #[serde(default = "default_risk_budget")]
    pub risk_budget: Decimal,
}

fn default_name() -> String {
    "momentum".to_string()
}

fn default_min_trend() -> Decimal {
    dec!(0.15)
}

fn default_min_oscillator_long() -> Decimal {
    dec!(50)
}

fn default_max_oscillator_long() -> Decimal {
    dec!(80)
}

fn default_stop_fraction() -> Decimal {
    dec!(0.05)
}

fn default_target_fraction() -> Decimal {
    dec!(0.10)
}

fn default_max_hold_days() -> i64 {
    21
}

fn default_risk_budget() -> Decimal {
    dec!(0.02)
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            min_trend: default_min_trend(),
            min_oscillator_long: default_min_oscillator_long(),
            max_oscillator_long: default_max_oscillator_long(),
            stop_fraction: default_stop_fraction(),
            target_fraction: default_target_fraction(),
            max_hold_days: default_max_hold_days(),
            risk_budget: default_risk_budget(),
        }
    }
}

impl MomentumParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.min_trend <= Decimal::ZERO {
            return Err(anyhow!("min_trend must be positive"));
        }
        if self.stop_fraction <= Decimal::ZERO || self.stop_fraction >= Decimal::ONE {
            return Err(anyhow!("stop_fraction must be in (0, 1)"));
        }
        if self.target_fraction <= Decimal::ZERO {
            return Err(anyhow!("target_fraction must be positive"));
        }
        if self.max_hold_days <= 0 {
            return Err(anyhow!("max_hold_days must be positive"));
        }
        if self.risk_budget <= Decimal::ZERO || self.risk_budget > Decimal::ONE {
            return Err(anyhow!("risk_budget must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Momentum swing strategy.
pub struct Momentum {
    params: MomentumParams,
}

impl Momentum {
    /// Creates the strategy from validated parameters.
    pub fn new(params: MomentumParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_ticker(&self, snapshot: &MarketSnapshot, symbol: &Symbol) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;

        let (direction, kind) = if stats.trend >= self.params.min_trend
            && stats.oscillator >= self.params.min_oscillator_long
            && stats.oscillator <= self.params.max_oscillator_long
        {
            (Direction::Long, LegKind::LongUnderlying)
        } else if stats.trend <= -self.params.min_trend
            && stats.oscillator <= dec!(100) - self.params.min_oscillator_long
            && stats.oscillator >= dec!(100) - self.params.max_oscillator_long
        {
            (Direction::Short, LegKind::ShortUnderlying)
        } else {
            return None;
        };

        let spot = snapshot.close_for(symbol)?;
        if spot.is_zero() {
            return None;
        }
        let horizon = snapshot.date.add_days(UNDERLYING_HORIZON_DAYS);
        let legs = vec![TradeLeg::underlying(kind, horizon, spot).ok()?];

        let max_loss = spot.as_decimal() * self.params.stop_fraction;
        let max_profit = spot.as_decimal() * self.params.target_fraction;

        let mut metadata = BTreeMap::new();
        metadata.insert("trend".to_string(), stats.trend.round_dp(4).to_string());

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction,
            legs,
            // A short sale collects proceeds; a purchase pays them.
            entry_is_credit: direction == Direction::Short,
            entry_value: spot,
            max_loss_per_unit: Price::new_unchecked(max_loss),
            max_profit_per_unit: Price::new_unchecked(max_profit),
            profit_target: Decimal::ONE,
            stop_loss_multiple: self.params.stop_fraction,
            score: stats.trend.abs() * dec!(100),
            metadata,
            signal_date: None,
        };
        signal.validate().ok()?;
        Some(signal)
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn generate_signals(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<TradeSignal>, StrategyError> {
        if matches!(snapshot.regime, Regime::Crash) {
            return Ok(Vec::new());
        }
        Ok(snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol))
            .collect())
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        let Some(spot) = snapshot.close_for(&position.symbol) else {
            return PositionAction::Hold;
        };

        let entry = position.entry_value.as_decimal();
        let pnl_per_share = match position.direction {
            Direction::Short => entry - spot.as_decimal(),
            _ => spot.as_decimal() - entry,
        };

        if pnl_per_share >= position.max_profit_per_unit.as_decimal() {
            return PositionAction::CloseProfitTarget;
        }
        if pnl_per_share <= -position.max_loss_per_unit.as_decimal() {
            return PositionAction::CloseStopLoss;
        }
        if position.entry_date.days_until(snapshot.date) >= self.params.max_hold_days {
            return PositionAction::CloseSignalExit;
        }
        PositionAction::Hold
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("min_trend", dec!(0.05), dec!(0.40), dec!(0.05)),
            ParameterDescriptor::new("stop_fraction", dec!(0.02), dec!(0.10), dec!(0.01)),
            ParameterDescriptor::new("target_fraction", dec!(0.05), dec!(0.25), dec!(0.05)),
            ParameterDescriptor::new("max_hold_days", dec!(5), dec!(60), dec!(5)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.05), dec!(0.005)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil;
    use sirocco_core::data::{PositionEntry, PositionId};
    use sirocco_core::types::Amount;

    fn create_strategy() -> Momentum {
        Momentum::new(MomentumParams::default()).unwrap()
    }

    fn underlying_position(direction: Direction, entry: Decimal) -> Position {
        let kind = if direction == Direction::Short {
            LegKind::ShortUnderlying
        } else {
            LegKind::LongUnderlying
        };
        let entry_date = testutil::snap_date(50);
        Position::open(
            PositionId::new(1),
            PositionEntry {
                strategy: "momentum".to_string(),
                symbol: testutil::sym(),
                direction,
                legs: vec![TradeLeg::underlying(
                    kind,
                    entry_date.add_days(365),
                    Price::new_unchecked(entry),
                )
                .unwrap()],
                entry_is_credit: direction == Direction::Short,
                entry_value: Price::new_unchecked(entry),
                max_loss_per_unit: Price::new_unchecked(entry * dec!(0.05)),
                max_profit_per_unit: Price::new_unchecked(entry * dec!(0.10)),
                profit_target: Decimal::ONE,
                stop_loss_multiple: dec!(0.05),
                contracts: 1,
                entry_date,
                entry_commission: Amount::ZERO,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_enters_long_in_uptrend() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);

        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.legs.len(), 1);
        assert_eq!(signal.legs[0].kind, LegKind::LongUnderlying);
        assert!(!signal.entry_is_credit);
        // Stop distance defines the risk.
        assert_eq!(
            signal.max_loss_per_unit.as_decimal(),
            signal.entry_value.as_decimal() * dec!(0.05)
        );
    }

    #[test]
    fn test_flat_market_blocks_entry() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_manage_profit_target_long() {
        let strategy = create_strategy();
        // Entered at 440, spot now 460: moved only ~4.5%, below the 10%
        // target, so the position holds. At 490 the target is cleared.
        let holding = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        let position = underlying_position(Direction::Long, dec!(440));
        assert_eq!(
            strategy.manage_position(&position, &holding),
            PositionAction::Hold
        );

        let target_hit = testutil::snapshot(
            &testutil::flat_closes(60, dec!(490)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        assert_eq!(
            strategy.manage_position(&position, &target_hit),
            PositionAction::CloseProfitTarget
        );
    }

    #[test]
    fn test_manage_stop_loss_short() {
        let strategy = create_strategy();
        // Short from 440, spot rallies to 470: loss 30 > 5% stop (22).
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(470)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        let position = underlying_position(Direction::Short, dec!(440));
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseStopLoss
        );
    }

    #[test]
    fn test_manage_time_stop() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(80, dec!(441)),
            dec!(3),
            &testutil::vix_falling(80),
            &[],
        );
        // Entered a month before the snapshot date: stale regardless of
        // P&L.
        let position = underlying_position(Direction::Long, dec!(440));
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseSignalExit
        );
    }
}
