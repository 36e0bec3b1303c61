//! Directional debit spread strategy.
//!
//! Buys a vertical spread in the direction of a strong trend: bull call
//! spreads in uptrends, bear put spreads in downtrends. Pays a net debit
//! and profits from directional follow-through; prefers quiet volatility
//! so the long leg is not overpaying for vol.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::{Direction, LegKind, Position, TradeLeg};
use sirocco_core::types::{Price, Symbol};
use sirocco_market::{MarketSnapshot, Regime};
use sirocco_pricing::{option_price, strike_for_delta, years_between};

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::r#trait::Strategy;
use crate::StrategyError;

use super::common;

/// Debit spread strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitSpreadParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Absolute delta targeted for the long strike (near the money)
    #[serde(default = "default_long_delta")]
    pub long_delta: Decimal,
    /// Distance between long and short strikes
    #[serde(default = "default_spread_width")]
    pub spread_width: Decimal,
    /// Calendar days to expiration at entry
    #[serde(default = "default_days_to_expiration")]
    pub days_to_expiration: u32,
    /// Minimum absolute trend slope required
    #[serde(default = "default_min_trend")]
    pub min_trend: Decimal,
    /// Maximum volatility rank tolerated (debit trades buy premium)
    #[serde(default = "default_max_iv_rank")]
    pub max_iv_rank: Decimal,
    /// Exit when profit reaches this fraction of the max profit
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Exit when loss reaches this fraction of the debit
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: Decimal,
    /// Close at or below this many days to expiry
    #[serde(default = "default_time_decay_close_dte")]
    pub time_decay_close_dte: i64,
    /// Per-trade risk budget as a fraction of equity
    #[serde(default = "default_risk_budget")]
    pub risk_budget: Decimal,
    /// Strike grid step
    #[serde(default = "default_strike_step")]
    pub strike_step: Decimal,
}

fn default_name() -> String {
    "debit_spread".to_string()
}

fn default_long_delta() -> Decimal {
    dec!(0.45)
}

fn default_spread_width() -> Decimal {
    dec!(5)
}

fn default_days_to_expiration() -> u32 {
    45
}

fn default_min_trend() -> Decimal {
    dec!(0.10)
}

fn default_max_iv_rank() -> Decimal {
    dec!(60)
}

fn default_profit_target() -> Decimal {
    dec!(0.6)
}

fn default_stop_loss_fraction() -> Decimal {
    dec!(0.5)
}

fn default_time_decay_close_dte() -> i64 {
    10
}

fn default_risk_budget() -> Decimal {
    dec!(0.015)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for DebitSpreadParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            long_delta: default_long_delta(),
            spread_width: default_spread_width(),
            days_to_expiration: default_days_to_expiration(),
            min_trend: default_min_trend(),
            max_iv_rank: default_max_iv_rank(),
            profit_target: default_profit_target(),
            stop_loss_fraction: default_stop_loss_fraction(),
            time_decay_close_dte: default_time_decay_close_dte(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl DebitSpreadParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.long_delta <= Decimal::ZERO || self.long_delta >= dec!(0.6) {
            return Err(anyhow!("long_delta must be in (0, 0.6)"));
        }
        if self.spread_width <= Decimal::ZERO {
            return Err(anyhow!("spread_width must be positive"));
        }
        if self.days_to_expiration == 0 {
            return Err(anyhow!("days_to_expiration must be positive"));
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

/// Directional debit spread strategy.
pub struct DebitSpread {
    params: DebitSpreadParams,
}

impl DebitSpread {
    /// Creates the strategy from validated parameters.
    pub fn new(params: DebitSpreadParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_ticker(&self, snapshot: &MarketSnapshot, symbol: &Symbol) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank > self.params.max_iv_rank {
            return None;
        }

        let (direction, is_call) = if stats.trend >= self.params.min_trend {
            (Direction::Long, true) // bull call spread
        } else if stats.trend <= -self.params.min_trend {
            (Direction::Short, false) // bear put spread
        } else {
            return None;
        };

        let spot = snapshot.close_for(symbol)?;
        let expiry = snapshot
            .date
            .add_days(u64::from(self.params.days_to_expiration));
        let years = years_between(snapshot.date, expiry);
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        let long_strike = strike_for_delta(
            spot,
            self.params.long_delta,
            years,
            rate,
            vol,
            is_call,
            self.params.strike_step,
        );
        // The short strike sits one width further out of the money.
        let short_strike_value = if is_call {
            long_strike.as_decimal() + self.params.spread_width
        } else {
            long_strike.as_decimal() - self.params.spread_width
        };
        if short_strike_value <= Decimal::ZERO {
            return None;
        }
        let short_strike = Price::new_unchecked(short_strike_value);

        let long_price = option_price(spot, long_strike, years, rate, vol, is_call);
        let short_price = option_price(spot, short_strike, years, rate, vol, is_call);
        let debit = long_price - short_price;
        let max_profit = self.params.spread_width - debit;
        if debit <= Decimal::ZERO || max_profit <= Decimal::ZERO {
            return None;
        }

        let (long_kind, short_kind) = if is_call {
            (LegKind::LongCall, LegKind::ShortCall)
        } else {
            (LegKind::LongPut, LegKind::ShortPut)
        };
        let legs = vec![
            TradeLeg::option(long_kind, long_strike, expiry, long_price).ok()?,
            TradeLeg::option(short_kind, short_strike, expiry, short_price).ok()?,
        ];

        // Stronger trends rank first; reward-to-cost breaks ties.
        let score = stats.trend.abs() * dec!(100) + max_profit / debit * dec!(10);

        let mut metadata = BTreeMap::new();
        metadata.insert("trend".to_string(), stats.trend.round_dp(4).to_string());

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction,
            legs,
            entry_is_credit: false,
            entry_value: Price::new_unchecked(debit),
            max_loss_per_unit: Price::new_unchecked(debit),
            max_profit_per_unit: Price::new_unchecked(max_profit),
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

impl Strategy for DebitSpread {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn generate_signals(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<TradeSignal>, StrategyError> {
        if snapshot.regime == Regime::Crash {
            return Ok(Vec::new());
        }
        Ok(snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol))
            .collect())
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        common::manage_debit(position, snapshot, self.params.time_decay_close_dte)
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("long_delta", dec!(0.25), dec!(0.55), dec!(0.05)),
            ParameterDescriptor::new("spread_width", dec!(1), dec!(20), dec!(1)),
            ParameterDescriptor::new("days_to_expiration", dec!(14), dec!(90), dec!(7)),
            ParameterDescriptor::new("min_trend", dec!(0.05), dec!(0.30), dec!(0.05)),
            ParameterDescriptor::new("profit_target", dec!(0.3), dec!(0.9), dec!(0.1)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.04), dec!(0.005)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil;

    fn create_strategy() -> DebitSpread {
        DebitSpread::new(DebitSpreadParams::default()).unwrap()
    }

    #[test]
    fn test_emits_bull_call_in_strong_uptrend() {
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
        assert!(!signal.entry_is_credit);
        assert_eq!(signal.legs[0].kind, LegKind::LongCall);
        assert_eq!(signal.legs[1].kind, LegKind::ShortCall);
        assert!(signal.legs[1].strike.as_decimal() > signal.legs[0].strike.as_decimal());
        // Debit plus max profit equals the width.
        assert_eq!(
            signal.entry_value.as_decimal() + signal.max_profit_per_unit.as_decimal(),
            dec!(5)
        );
    }

    #[test]
    fn test_emits_bear_put_in_strong_downtrend() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_falling(60, dec!(500)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Short);
        assert_eq!(signals[0].legs[0].kind, LegKind::LongPut);
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
    fn test_high_iv_rank_blocks_entry() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }
}
