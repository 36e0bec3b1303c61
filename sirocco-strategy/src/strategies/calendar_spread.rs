//! Calendar spread strategy.
//!
//! Buys a far-dated option and sells a near-dated option at the same
//! at-the-money strike, paying a net debit and harvesting the faster time
//! decay of the short front leg. Entered in quiet, low-volatility-rank
//! conditions where a pinned underlying lets the front leg bleed out.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::{Direction, LegKind, Position, TradeLeg};
use sirocco_core::types::{Price, Symbol};
use sirocco_market::{MarketSnapshot, Regime};
use sirocco_pricing::{option_price, years_between};

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::r#trait::Strategy;
use crate::StrategyError;

use super::common;

/// Calendar spread strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSpreadParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Calendar days to the short (front) expiration
    #[serde(default = "default_near_dte")]
    pub near_dte: u32,
    /// Calendar days to the long (back) expiration
    #[serde(default = "default_far_dte")]
    pub far_dte: u32,
    /// Maximum volatility rank tolerated (calendars buy vol)
    #[serde(default = "default_max_iv_rank")]
    pub max_iv_rank: Decimal,
    /// Maximum absolute trend slope tolerated
    #[serde(default = "default_max_trend")]
    pub max_trend: Decimal,
    /// Exit when profit reaches this fraction of the debit
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Exit when loss reaches this fraction of the debit
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: Decimal,
    /// Close when the front leg is within this many days of expiry
    #[serde(default = "default_front_close_dte")]
    pub front_close_dte: i64,
    /// Skip entries when an event falls within this many days
    #[serde(default = "default_event_buffer_days")]
    pub event_buffer_days: u32,
    /// Per-trade risk budget as a fraction of equity
    #[serde(default = "default_risk_budget")]
    pub risk_budget: Decimal,
    /// Strike grid step
    #[serde(default = "default_strike_step")]
    pub strike_step: Decimal,
}

fn default_name() -> String {
    "calendar_spread".to_string()
}

fn default_near_dte() -> u32 {
    20
}

fn default_far_dte() -> u32 {
    50
}

fn default_max_iv_rank() -> Decimal {
    dec!(40)
}

fn default_max_trend() -> Decimal {
    dec!(0.10)
}

fn default_profit_target() -> Decimal {
    dec!(0.30)
}

fn default_stop_loss_fraction() -> Decimal {
    dec!(0.5)
}

fn default_front_close_dte() -> i64 {
    1
}

fn default_event_buffer_days() -> u32 {
    2
}

fn default_risk_budget() -> Decimal {
    dec!(0.01)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for CalendarSpreadParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            near_dte: default_near_dte(),
            far_dte: default_far_dte(),
            max_iv_rank: default_max_iv_rank(),
            max_trend: default_max_trend(),
            profit_target: default_profit_target(),
            stop_loss_fraction: default_stop_loss_fraction(),
            front_close_dte: default_front_close_dte(),
            event_buffer_days: default_event_buffer_days(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl CalendarSpreadParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.near_dte == 0 || self.far_dte <= self.near_dte {
            return Err(anyhow!("far_dte must exceed near_dte, both positive"));
        }
        if self.profit_target <= Decimal::ZERO {
            return Err(anyhow!("profit_target must be positive"));
        }
        if self.stop_loss_fraction <= Decimal::ZERO || self.stop_loss_fraction > Decimal::ONE {
            return Err(anyhow!("stop_loss_fraction must be in (0, 1]"));
        }
        if self.risk_budget <= Decimal::ZERO || self.risk_budget > Decimal::ONE {
            return Err(anyhow!("risk_budget must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Calendar spread strategy.
pub struct CalendarSpread {
    params: CalendarSpreadParams,
}

impl CalendarSpread {
    /// Creates the strategy from validated parameters.
    pub fn new(params: CalendarSpreadParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_ticker(&self, snapshot: &MarketSnapshot, symbol: &Symbol) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank > self.params.max_iv_rank {
            return None;
        }
        if stats.trend.abs() > self.params.max_trend {
            return None;
        }

        let spot = snapshot.close_for(symbol)?;
        let strike_value = (spot.as_decimal() / self.params.strike_step).round()
            * self.params.strike_step;
        if strike_value <= Decimal::ZERO {
            return None;
        }
        let strike = Price::new_unchecked(strike_value);

        let near_expiry = snapshot.date.add_days(u64::from(self.params.near_dte));
        let far_expiry = snapshot.date.add_days(u64::from(self.params.far_dte));
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        // Puts when drifting down, calls otherwise.
        let is_call = stats.trend >= Decimal::ZERO;
        let near_price = option_price(
            spot,
            strike,
            years_between(snapshot.date, near_expiry),
            rate,
            vol,
            is_call,
        );
        let far_price = option_price(
            spot,
            strike,
            years_between(snapshot.date, far_expiry),
            rate,
            vol,
            is_call,
        );
        let debit = far_price - near_price;
        if debit <= Decimal::ZERO {
            return None;
        }

        let (short_kind, long_kind) = if is_call {
            (LegKind::ShortCall, LegKind::LongCall)
        } else {
            (LegKind::ShortPut, LegKind::LongPut)
        };
        let legs = vec![
            TradeLeg::option(short_kind, strike, near_expiry, near_price).ok()?,
            TradeLeg::option(long_kind, strike, far_expiry, far_price).ok()?,
        ];

        // The front leg's share of the back leg's price proxies the decay
        // capture on offer.
        let score = if far_price.is_zero() {
            Decimal::ZERO
        } else {
            near_price.as_decimal() / far_price.as_decimal() * dec!(100)
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("strike".to_string(), strike.to_string());

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction: Direction::Neutral,
            legs,
            entry_is_credit: false,
            entry_value: Price::new_unchecked(debit),
            // A calendar cannot lose more than the debit paid.
            max_loss_per_unit: Price::new_unchecked(debit),
            max_profit_per_unit: Price::new_unchecked(debit),
            profit_target: self.params.profit_target,
            stop_loss_multiple: self.params.stop_loss_fraction,
            score,
            metadata,
            signal_date: None,
        };
        signal.validate().ok()?;
        Some(signal)
    }
}

impl Strategy for CalendarSpread {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn generate_signals(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<TradeSignal>, StrategyError> {
        if matches!(snapshot.regime, Regime::Crash | Regime::HighVol) {
            return Ok(Vec::new());
        }
        if snapshot.has_event_within(self.params.event_buffer_days) {
            return Ok(Vec::new());
        }
        Ok(snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol))
            .collect())
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        // The front leg drives the clock: closing before it expires is the
        // whole point of the structure.
        if let Some(dte) = position.days_to_expiration(snapshot.date) {
            if dte <= 0 {
                return PositionAction::CloseExpiration;
            }
            if dte <= self.params.front_close_dte {
                return PositionAction::CloseTimeDecay;
            }
        }
        common::manage_debit(position, snapshot, i64::MIN)
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("near_dte", dec!(7), dec!(30), dec!(7)),
            ParameterDescriptor::new("far_dte", dec!(30), dec!(90), dec!(10)),
            ParameterDescriptor::new("max_iv_rank", dec!(20), dec!(60), dec!(10)),
            ParameterDescriptor::new("profit_target", dec!(0.15), dec!(0.6), dec!(0.05)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.03), dec!(0.005)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil;

    fn create_strategy() -> CalendarSpread {
        CalendarSpread::new(CalendarSpreadParams::default()).unwrap()
    }

    #[test]
    fn test_emits_calendar_in_quiet_low_vol_rank() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);

        let signal = &signals[0];
        assert!(!signal.entry_is_credit);
        assert_eq!(signal.legs.len(), 2);
        // Same strike, different expirations; short leg expires first.
        assert_eq!(signal.legs[0].strike, signal.legs[1].strike);
        assert!(signal.legs[0].expiration < signal.legs[1].expiration);
        assert!(!signal.legs[0].kind.is_long());
        assert!(signal.legs[1].kind.is_long());
        // Max loss of a calendar is the debit paid.
        assert_eq!(signal.max_loss_per_unit, signal.entry_value);
    }

    #[test]
    fn test_high_iv_rank_blocks_calendar() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_manage_closes_before_front_expiry() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        // Front leg expires tomorrow.
        let position = testutil::credit_position(
            "calendar_spread",
            testutil::snap_date(40),
            snapshot.date.add_days(1),
            dec!(460),
            dec!(455),
            dec!(2.0),
            1,
        );
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseTimeDecay
        );
    }
}
