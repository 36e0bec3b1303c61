//! Directional credit spread strategy.
//!
//! Sells a delta-targeted vertical spread in the direction of the
//! prevailing trend: bull put spreads in uptrends, bear call spreads in
//! downtrends. Premium selling is gated on elevated volatility rank so
//! spreads are sold when options are rich, and entries step aside around
//! scheduled macro events.
//!
//! # Entry rules
//!
//! - Volatility rank at or above `min_iv_rank`
//! - Trend slope beyond `min_trend` picks the direction; the oscillator
//!   must not be stretched against the trade
//! - Optional weekday gate and a no-entry buffer around macro events
//! - Short strike chosen by target delta, long strike one width further
//!   out; credit and max loss derived from theoretical prices
//!
//! # Exit rules
//!
//! Expiration, profit target (fraction of credit), stop loss (multiple of
//! credit), and a terminal time-decay close a few days before expiry.

use anyhow::{anyhow, Result};
use chrono::Weekday;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use sirocco_core::data::{Direction, LegKind, Position, TradeLeg};
use sirocco_market::{MarketSnapshot, Regime};
use sirocco_pricing::{option_price, strike_for_delta, years_between};

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::r#trait::Strategy;
use crate::StrategyError;

use super::common;

/// Credit spread strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Absolute delta targeted for the short strike
    #[serde(default = "default_target_delta")]
    pub target_delta: Decimal,
    /// Distance between short and long strikes
    #[serde(default = "default_spread_width")]
    pub spread_width: Decimal,
    /// Calendar days to expiration at entry
    #[serde(default = "default_days_to_expiration")]
    pub days_to_expiration: u32,
    /// Minimum volatility rank required to sell premium
    #[serde(default = "default_min_iv_rank")]
    pub min_iv_rank: Decimal,
    /// Exit when profit reaches this fraction of the credit
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Exit when the cost to close reaches this multiple of the credit
    #[serde(default = "default_stop_loss_multiple")]
    pub stop_loss_multiple: Decimal,
    /// Close profitable spreads at or below this many days to expiry
    #[serde(default = "default_time_decay_close_dte")]
    pub time_decay_close_dte: i64,
    /// Minimum absolute trend slope to pick a direction
    #[serde(default = "default_min_trend")]
    pub min_trend: Decimal,
    /// Skip short-put entries when the oscillator is above this level
    #[serde(default = "default_max_oscillator_long")]
    pub max_oscillator_long: Decimal,
    /// Skip short-call entries when the oscillator is below this level
    #[serde(default = "default_min_oscillator_short")]
    pub min_oscillator_short: Decimal,
    /// Allowed entry weekdays (empty means every day)
    #[serde(default)]
    pub entry_weekdays: Vec<String>,
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
    "credit_spread".to_string()
}

fn default_target_delta() -> Decimal {
    dec!(0.30)
}

fn default_spread_width() -> Decimal {
    dec!(5)
}

fn default_days_to_expiration() -> u32 {
    30
}

fn default_min_iv_rank() -> Decimal {
    dec!(30)
}

fn default_profit_target() -> Decimal {
    dec!(0.5)
}

fn default_stop_loss_multiple() -> Decimal {
    dec!(2.0)
}

fn default_time_decay_close_dte() -> i64 {
    7
}

fn default_min_trend() -> Decimal {
    dec!(0.05)
}

fn default_max_oscillator_long() -> Decimal {
    dec!(80)
}

fn default_min_oscillator_short() -> Decimal {
    dec!(20)
}

fn default_event_buffer_days() -> u32 {
    2
}

fn default_risk_budget() -> Decimal {
    dec!(0.02)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for CreditSpreadParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            target_delta: default_target_delta(),
            spread_width: default_spread_width(),
            days_to_expiration: default_days_to_expiration(),
            min_iv_rank: default_min_iv_rank(),
            profit_target: default_profit_target(),
            stop_loss_multiple: default_stop_loss_multiple(),
            time_decay_close_dte: default_time_decay_close_dte(),
            min_trend: default_min_trend(),
            max_oscillator_long: default_max_oscillator_long(),
            min_oscillator_short: default_min_oscillator_short(),
            entry_weekdays: Vec::new(),
            event_buffer_days: default_event_buffer_days(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl CreditSpreadParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.target_delta <= Decimal::ZERO || self.target_delta >= dec!(0.5) {
            return Err(anyhow!("target_delta must be in (0, 0.5)"));
        }
        if self.spread_width <= Decimal::ZERO {
            return Err(anyhow!("spread_width must be positive"));
        }
        if self.days_to_expiration == 0 {
            return Err(anyhow!("days_to_expiration must be positive"));
        }
        if self.profit_target <= Decimal::ZERO || self.profit_target > Decimal::ONE {
            return Err(anyhow!("profit_target must be in (0, 1]"));
        }
        if self.stop_loss_multiple <= Decimal::ZERO {
            return Err(anyhow!("stop_loss_multiple must be positive"));
        }
        if self.risk_budget <= Decimal::ZERO || self.risk_budget > Decimal::ONE {
            return Err(anyhow!("risk_budget must be in (0, 1]"));
        }
        if self.strike_step <= Decimal::ZERO {
            return Err(anyhow!("strike_step must be positive"));
        }
        Ok(())
    }
}

/// Directional credit spread strategy.
pub struct CreditSpread {
    params: CreditSpreadParams,
    entry_weekdays: Vec<Weekday>,
}

impl CreditSpread {
    /// Creates the strategy from validated parameters.
    pub fn new(params: CreditSpreadParams) -> Result<Self> {
        params.validate()?;
        let entry_weekdays = common::parse_weekdays(&params.entry_weekdays)?;
        Ok(Self {
            params,
            entry_weekdays,
        })
    }

    /// Builds a vertical credit spread signal for one ticker, if the
    /// filters pass.
    fn scan_ticker(&self, snapshot: &MarketSnapshot, symbol: &sirocco_core::types::Symbol) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank < self.params.min_iv_rank {
            return None;
        }

        // Trend picks the side; the oscillator must not be stretched
        // against it.
        let (direction, is_call) = if stats.trend >= self.params.min_trend
            && stats.oscillator <= self.params.max_oscillator_long
        {
            (Direction::Long, false) // bull put spread
        } else if stats.trend <= -self.params.min_trend
            && stats.oscillator >= self.params.min_oscillator_short
        {
            (Direction::Short, true) // bear call spread
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

        let short_strike = strike_for_delta(
            spot,
            self.params.target_delta,
            years,
            rate,
            vol,
            is_call,
            self.params.strike_step,
        );
        let long_strike_value = if is_call {
            short_strike.as_decimal() + self.params.spread_width
        } else {
            short_strike.as_decimal() - self.params.spread_width
        };
        if long_strike_value <= Decimal::ZERO {
            return None;
        }
        let long_strike = sirocco_core::types::Price::new_unchecked(long_strike_value);

        let short_price = option_price(spot, short_strike, years, rate, vol, is_call);
        let long_price = option_price(spot, long_strike, years, rate, vol, is_call);
        let credit = short_price - long_price;
        let max_loss = self.params.spread_width - credit;
        if credit <= Decimal::ZERO || max_loss <= Decimal::ZERO {
            return None;
        }

        let (short_kind, long_kind) = if is_call {
            (LegKind::ShortCall, LegKind::LongCall)
        } else {
            (LegKind::ShortPut, LegKind::LongPut)
        };
        let legs = vec![
            TradeLeg::option(short_kind, short_strike, expiry, short_price).ok()?,
            TradeLeg::option(long_kind, long_strike, expiry, long_price).ok()?,
        ];

        // Richer spreads (more credit per unit of width) rank first.
        let score = credit / self.params.spread_width * dec!(100);

        let mut metadata = BTreeMap::new();
        metadata.insert("iv_rank".to_string(), stats.iv_rank.round_dp(2).to_string());
        metadata.insert("short_strike".to_string(), short_strike.to_string());

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction,
            legs,
            entry_is_credit: true,
            entry_value: sirocco_core::types::Price::new_unchecked(credit),
            max_loss_per_unit: sirocco_core::types::Price::new_unchecked(max_loss),
            max_profit_per_unit: sirocco_core::types::Price::new_unchecked(credit),
            profit_target: self.params.profit_target,
            stop_loss_multiple: self.params.stop_loss_multiple,
            score,
            metadata,
            signal_date: None,
        };
        signal.validate().ok()?;
        Some(signal)
    }
}

impl Strategy for CreditSpread {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn generate_signals(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<TradeSignal>, StrategyError> {
        if !common::weekday_allowed(&self.entry_weekdays, snapshot.date) {
            return Ok(Vec::new());
        }
        if snapshot.regime == Regime::Crash {
            debug!(strategy = %self.params.name, "no entries in crash regime");
            return Ok(Vec::new());
        }
        if snapshot.has_event_within(self.params.event_buffer_days) {
            debug!(strategy = %self.params.name, "entries paused around macro event");
            return Ok(Vec::new());
        }

        let signals = snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol))
            .collect();
        Ok(signals)
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        common::manage_credit(position, snapshot, self.params.time_decay_close_dte, None)
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("target_delta", dec!(0.10), dec!(0.45), dec!(0.05)),
            ParameterDescriptor::new("spread_width", dec!(1), dec!(20), dec!(1)),
            ParameterDescriptor::new("days_to_expiration", dec!(7), dec!(60), dec!(7)),
            ParameterDescriptor::new("min_iv_rank", dec!(0), dec!(80), dec!(10)),
            ParameterDescriptor::new("profit_target", dec!(0.25), dec!(0.9), dec!(0.05)),
            ParameterDescriptor::new("stop_loss_multiple", dec!(1.0), dec!(4.0), dec!(0.5)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.05), dec!(0.005)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil;
    use sirocco_core::types::Amount;

    fn create_strategy() -> CreditSpread {
        CreditSpread::new(CreditSpreadParams::default()).unwrap()
    }

    #[test]
    fn test_params_validation() {
        assert!(CreditSpreadParams::default().validate().is_ok());

        let mut params = CreditSpreadParams::default();
        params.target_delta = dec!(0.6);
        assert!(params.validate().is_err());

        let mut params = CreditSpreadParams::default();
        params.spread_width = Decimal::ZERO;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_emits_bull_put_in_uptrend() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);

        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Long);
        assert!(signal.entry_is_credit);
        assert_eq!(signal.legs.len(), 2);
        assert_eq!(signal.legs[0].kind, LegKind::ShortPut);
        assert_eq!(signal.legs[1].kind, LegKind::LongPut);
        // Short strike below spot, long strike one width further down.
        let spot = snapshot.close_for(&testutil::sym()).unwrap();
        assert!(signal.legs[0].strike < spot);
        assert_eq!(signal.legs[0].strike - signal.legs[1].strike, dec!(5));
        // Economics: credit + max loss = width.
        assert_eq!(
            signal.entry_value.as_decimal() + signal.max_loss_per_unit.as_decimal(),
            dec!(5)
        );
        assert!(signal.validate().is_ok());
    }

    #[test]
    fn test_emits_bear_call_in_downtrend() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_falling(60, dec!(500)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Short);
        assert_eq!(signals[0].legs[0].kind, LegKind::ShortCall);
        let spot = snapshot.close_for(&testutil::sym()).unwrap();
        assert!(signals[0].legs[0].strike > spot);
    }

    #[test]
    fn test_low_iv_rank_blocks_entry() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_falling(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_flat_trend_blocks_entry() {
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
    fn test_event_buffer_blocks_entry() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[1],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_weekday_gate() {
        let mut params = CreditSpreadParams::default();
        // snap_date(60) = 2024-02-29, a Thursday.
        params.entry_weekdays = vec!["mon".to_string()];
        let strategy = CreditSpread::new(params).unwrap();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_manage_expiration() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let position = testutil::credit_position(
            "credit_spread",
            testutil::snap_date(30),
            snapshot.date,
            dec!(450),
            dec!(445),
            dec!(1.75),
            1,
        );
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseExpiration
        );
    }

    #[test]
    fn test_manage_profit_target_when_far_otm() {
        let strategy = create_strategy();
        // Spot far above the short strike, expiry still weeks away: the
        // spread has decayed well past half its credit.
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(520)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let position = testutil::credit_position(
            "credit_spread",
            testutil::snap_date(40),
            snapshot.date.add_days(21),
            dec!(450),
            dec!(445),
            dec!(1.75),
            1,
        );
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseProfitTarget
        );
    }

    #[test]
    fn test_manage_stop_loss_when_breached() {
        let strategy = create_strategy();
        // Spot crashed through both strikes: closing costs near full width.
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let position = testutil::credit_position(
            "credit_spread",
            testutil::snap_date(40),
            snapshot.date.add_days(21),
            dec!(450),
            dec!(445),
            dec!(1.75),
            1,
        );
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::CloseStopLoss
        );
    }

    #[test]
    fn test_manage_holds_in_between() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(455)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let position = testutil::credit_position(
            "credit_spread",
            testutil::snap_date(55),
            snapshot.date.add_days(25),
            dec!(450),
            dec!(445),
            dec!(1.75),
            1,
        );
        assert_eq!(
            strategy.manage_position(&position, &snapshot),
            PositionAction::Hold
        );
    }

    #[test]
    fn test_sizing_respects_budget_and_heat_cap() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        let signal = &signals[0];

        // 2% of 100k = 2000 budget; unit risk is max_loss x 100.
        let view = PortfolioView::new(
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            &[],
            dec!(0.5),
        );
        let contracts = strategy.size_position(signal, &view);
        assert!(contracts >= 1);
        let expected = (dec!(2000) / signal.unit_risk()).floor();
        assert_eq!(Decimal::from(contracts), expected);

        // A tiny account cannot fit one contract.
        let tiny = PortfolioView::new(
            Amount::new(dec!(1000)),
            Amount::new(dec!(1000)),
            Amount::new(dec!(1000)),
            &[],
            dec!(0.5),
        );
        assert_eq!(strategy.size_position(signal, &tiny), 0);
    }

    #[test]
    fn test_parameter_space_nonempty() {
        let strategy = create_strategy();
        let space = strategy.parameter_space();
        assert!(space.iter().any(|d| d.name == "target_delta"));
        assert!(space.len() >= 5);
    }
}
