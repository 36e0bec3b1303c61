//! Volatility straddle/strangle strategy.
//!
//! Trades volatility itself rather than direction. Two modes:
//!
//! - **Long straddle**: buys the at-the-money call and put when
//!   volatility rank is depressed and a catalyst is coming, betting on a
//!   move bigger than the combined premium.
//! - **Short strangle**: sells an out-of-the-money call and put when
//!   volatility rank is elevated and no catalyst is near, collecting
//!   premium while the underlying stays inside the strikes. The risk
//!   proxy caps the open-ended short exposure at a multiple of the
//!   credit.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

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

/// Which volatility structure to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StraddleMode {
    /// Buy the at-the-money straddle
    #[default]
    LongStraddle,
    /// Sell an out-of-the-money strangle
    ShortStrangle,
}

impl fmt::Display for StraddleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongStraddle => write!(f, "long_straddle"),
            Self::ShortStrangle => write!(f, "short_strangle"),
        }
    }
}

/// Straddle/strangle strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StraddleParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Structure to trade
    #[serde(default)]
    pub mode: StraddleMode,
    /// Calendar days to expiration at entry
    #[serde(default = "default_days_to_expiration")]
    pub days_to_expiration: u32,
    /// Long straddles require volatility rank at or below this level
    #[serde(default = "default_max_iv_rank_long")]
    pub max_iv_rank_long: Decimal,
    /// Short strangles require volatility rank at or above this level
    #[serde(default = "default_min_iv_rank_short")]
    pub min_iv_rank_short: Decimal,
    /// Long straddles want a catalyst within this many days
    #[serde(default = "default_event_window_days")]
    pub event_window_days: u32,
    /// Absolute delta for short strangle strikes
    #[serde(default = "default_strangle_delta")]
    pub strangle_delta: Decimal,
    /// Max-loss proxy for short strangles, as a multiple of the credit
    #[serde(default = "default_margin_multiple")]
    pub margin_multiple: Decimal,
    /// Exit when profit reaches this fraction of the entry value
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Stop as a multiple of credit (short) or fraction of debit (long)
    #[serde(default = "default_stop_loss")]
    pub stop_loss: Decimal,
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
    "straddle".to_string()
}

fn default_days_to_expiration() -> u32 {
    30
}

fn default_max_iv_rank_long() -> Decimal {
    dec!(25)
}

fn default_min_iv_rank_short() -> Decimal {
    dec!(60)
}

fn default_event_window_days() -> u32 {
    5
}

fn default_strangle_delta() -> Decimal {
    dec!(0.16)
}

fn default_margin_multiple() -> Decimal {
    dec!(3)
}

fn default_profit_target() -> Decimal {
    dec!(0.5)
}

fn default_stop_loss() -> Decimal {
    dec!(2.0)
}

fn default_time_decay_close_dte() -> i64 {
    7
}

fn default_risk_budget() -> Decimal {
    dec!(0.01)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for StraddleParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            mode: StraddleMode::default(),
            days_to_expiration: default_days_to_expiration(),
            max_iv_rank_long: default_max_iv_rank_long(),
            min_iv_rank_short: default_min_iv_rank_short(),
            event_window_days: default_event_window_days(),
            strangle_delta: default_strangle_delta(),
            margin_multiple: default_margin_multiple(),
            profit_target: default_profit_target(),
            stop_loss: default_stop_loss(),
            time_decay_close_dte: default_time_decay_close_dte(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl StraddleParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.days_to_expiration == 0 {
            return Err(anyhow!("days_to_expiration must be positive"));
        }
        if self.strangle_delta <= Decimal::ZERO || self.strangle_delta >= dec!(0.5) {
            return Err(anyhow!("strangle_delta must be in (0, 0.5)"));
        }
        if self.margin_multiple < Decimal::ONE {
            return Err(anyhow!("margin_multiple must be at least 1"));
        }
        if self.risk_budget <= Decimal::ZERO || self.risk_budget > Decimal::ONE {
            return Err(anyhow!("risk_budget must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Volatility straddle/strangle strategy.
pub struct Straddle {
    params: StraddleParams,
}

impl Straddle {
    /// Creates the strategy from validated parameters.
    pub fn new(params: StraddleParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_long_straddle(
        &self,
        snapshot: &MarketSnapshot,
        symbol: &Symbol,
    ) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank > self.params.max_iv_rank_long {
            return None;
        }
        if !snapshot.has_event_within(self.params.event_window_days) {
            return None;
        }

        let spot = snapshot.close_for(symbol)?;
        let strike_value =
            (spot.as_decimal() / self.params.strike_step).round() * self.params.strike_step;
        if strike_value <= Decimal::ZERO {
            return None;
        }
        let strike = Price::new_unchecked(strike_value);
        let expiry = snapshot
            .date
            .add_days(u64::from(self.params.days_to_expiration));
        let years = years_between(snapshot.date, expiry);
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        let call_price = option_price(spot, strike, years, rate, vol, true);
        let put_price = option_price(spot, strike, years, rate, vol, false);
        let debit = call_price + put_price;
        if debit.is_zero() {
            return None;
        }

        let legs = vec![
            TradeLeg::option(LegKind::LongCall, strike, expiry, call_price).ok()?,
            TradeLeg::option(LegKind::LongPut, strike, expiry, put_price).ok()?,
        ];

        let score = self.params.max_iv_rank_long - stats.iv_rank;

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction: Direction::Neutral,
            legs,
            entry_is_credit: false,
            entry_value: debit,
            max_loss_per_unit: debit,
            max_profit_per_unit: debit,
            profit_target: self.params.profit_target,
            stop_loss_multiple: self.params.stop_loss.min(Decimal::ONE),
            score,
            metadata: BTreeMap::new(),
            signal_date: None,
        };
        signal.validate().ok()?;
        Some(signal)
    }

    fn scan_short_strangle(
        &self,
        snapshot: &MarketSnapshot,
        symbol: &Symbol,
    ) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank < self.params.min_iv_rank_short {
            return None;
        }
        if snapshot.has_event_within(self.params.event_window_days) {
            return None;
        }

        let spot = snapshot.close_for(symbol)?;
        let expiry = snapshot
            .date
            .add_days(u64::from(self.params.days_to_expiration));
        let years = years_between(snapshot.date, expiry);
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        let put_strike = strike_for_delta(
            spot,
            self.params.strangle_delta,
            years,
            rate,
            vol,
            false,
            self.params.strike_step,
        );
        let call_strike = strike_for_delta(
            spot,
            self.params.strangle_delta,
            years,
            rate,
            vol,
            true,
            self.params.strike_step,
        );
        if put_strike.as_decimal() >= call_strike.as_decimal() {
            return None;
        }

        let put_price = option_price(spot, put_strike, years, rate, vol, false);
        let call_price = option_price(spot, call_strike, years, rate, vol, true);
        let credit = put_price + call_price;
        if credit.is_zero() {
            return None;
        }

        let legs = vec![
            TradeLeg::option(LegKind::ShortPut, put_strike, expiry, put_price).ok()?,
            TradeLeg::option(LegKind::ShortCall, call_strike, expiry, call_price).ok()?,
        ];

        let score = stats.iv_rank - self.params.min_iv_rank_short;

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction: Direction::Neutral,
            legs,
            entry_is_credit: true,
            entry_value: credit,
            // Naked short risk is open-ended; the margin multiple stands
            // in for it in sizing and the heat cap.
            max_loss_per_unit: Price::new_unchecked(
                credit.as_decimal() * self.params.margin_multiple,
            ),
            max_profit_per_unit: credit,
            profit_target: self.params.profit_target,
            stop_loss_multiple: self.params.stop_loss,
            score,
            metadata: BTreeMap::new(),
            signal_date: None,
        };
        signal.validate().ok()?;
        Some(signal)
    }
}

impl Strategy for Straddle {
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
        let signals = snapshot
            .tickers()
            .filter_map(|symbol| match self.params.mode {
                StraddleMode::LongStraddle => self.scan_long_straddle(snapshot, symbol),
                StraddleMode::ShortStrangle => self.scan_short_strangle(snapshot, symbol),
            })
            .collect();
        Ok(signals)
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        match self.params.mode {
            StraddleMode::LongStraddle => {
                common::manage_debit(position, snapshot, self.params.time_decay_close_dte)
            }
            StraddleMode::ShortStrangle => common::manage_credit(
                position,
                snapshot,
                self.params.time_decay_close_dte,
                Some(self.params.event_window_days),
            ),
        }
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("days_to_expiration", dec!(14), dec!(60), dec!(7)),
            ParameterDescriptor::new("max_iv_rank_long", dec!(10), dec!(40), dec!(5)),
            ParameterDescriptor::new("min_iv_rank_short", dec!(40), dec!(90), dec!(10)),
            ParameterDescriptor::new("strangle_delta", dec!(0.05), dec!(0.30), dec!(0.05)),
            ParameterDescriptor::new("margin_multiple", dec!(2), dec!(6), dec!(1)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.03), dec!(0.005)),
        ]
    }
}
