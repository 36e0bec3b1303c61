//! Event-driven long option ("lotto") strategy.
//!
//! Buys a small out-of-the-money option ahead of a scheduled macro event
//! (FOMC, CPI), betting on an outsized move while the debit caps the
//! loss. Positions are flattened once the event has passed, whatever the
//! outcome.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::{Direction, LegKind, Position, TradeLeg};
use sirocco_core::types::{Price, Symbol};
use sirocco_market::MarketSnapshot;
use sirocco_pricing::{option_price, strike_for_delta, years_between};

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::params::ParameterDescriptor;
use crate::signal::TradeSignal;
use crate::r#trait::Strategy;
use crate::StrategyError;

use super::common;

/// Event lotto strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLottoParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Enter when an event falls within this many days ahead
    #[serde(default = "default_entry_window_days")]
    pub entry_window_days: u32,
    /// Absolute delta targeted for the long option
    #[serde(default = "default_target_delta")]
    pub target_delta: Decimal,
    /// Calendar days to expiration beyond the event
    #[serde(default = "default_dte_past_event")]
    pub dte_past_event: u32,
    /// Maximum volatility rank tolerated (buy vol before it spikes)
    #[serde(default = "default_max_iv_rank")]
    pub max_iv_rank: Decimal,
    /// Exit when profit reaches this fraction of the max (debit doubles)
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Exit when loss reaches this fraction of the debit
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: Decimal,
    /// Per-trade risk budget as a fraction of equity
    #[serde(default = "default_risk_budget")]
    pub risk_budget: Decimal,
    /// Strike grid step
    #[serde(default = "default_strike_step")]
    pub strike_step: Decimal,
}

fn default_name() -> String {
    "event_lotto".to_string()
}

fn default_entry_window_days() -> u32 {
    3
}

fn default_target_delta() -> Decimal {
    dec!(0.20)
}

fn default_dte_past_event() -> u32 {
    7
}

fn default_max_iv_rank() -> Decimal {
    dec!(50)
}

fn default_profit_target() -> Decimal {
    dec!(1.0)
}

fn default_stop_loss_fraction() -> Decimal {
    dec!(0.5)
}

fn default_risk_budget() -> Decimal {
    dec!(0.005)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for EventLottoParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            entry_window_days: default_entry_window_days(),
            target_delta: default_target_delta(),
            dte_past_event: default_dte_past_event(),
            max_iv_rank: default_max_iv_rank(),
            profit_target: default_profit_target(),
            stop_loss_fraction: default_stop_loss_fraction(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl EventLottoParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.entry_window_days == 0 {
            return Err(anyhow!("entry_window_days must be positive"));
        }
        if self.target_delta <= Decimal::ZERO || self.target_delta >= dec!(0.5) {
            return Err(anyhow!("target_delta must be in (0, 0.5)"));
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

/// Event-driven long option strategy.
pub struct EventLotto {
    params: EventLottoParams,
}

impl EventLotto {
    /// Creates the strategy from validated parameters.
    pub fn new(params: EventLottoParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_ticker(
        &self,
        snapshot: &MarketSnapshot,
        symbol: &Symbol,
        days_to_event: i64,
    ) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank > self.params.max_iv_rank {
            return None;
        }

        let spot = snapshot.close_for(symbol)?;
        // Lean with the drift; a flat tape defaults to the upside.
        let is_call = stats.trend >= Decimal::ZERO;
        let direction = if is_call {
            Direction::Long
        } else {
            Direction::Short
        };

        let expiry = snapshot.date.add_days(
            u64::try_from(days_to_event).unwrap_or(0) + u64::from(self.params.dte_past_event),
        );
        let years = years_between(snapshot.date, expiry);
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        let strike = strike_for_delta(
            spot,
            self.params.target_delta,
            years,
            rate,
            vol,
            is_call,
            self.params.strike_step,
        );
        let premium = option_price(spot, strike, years, rate, vol, is_call);
        if premium.is_zero() {
            return None;
        }

        let kind = if is_call {
            LegKind::LongCall
        } else {
            LegKind::LongPut
        };
        let legs = vec![TradeLeg::option(kind, strike, expiry, premium).ok()?];

        // Sooner events score higher: the vol ramp has less time to fade.
        let score = dec!(10)
            - Decimal::from(days_to_event.max(0))
            + (self.params.max_iv_rank - stats.iv_rank) / dec!(10);

        let mut metadata = BTreeMap::new();
        metadata.insert("days_to_event".to_string(), days_to_event.to_string());

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction,
            legs,
            entry_is_credit: false,
            entry_value: premium,
            // A long option cannot lose more than the premium.
            max_loss_per_unit: premium,
            max_profit_per_unit: premium, // target: the debit doubles
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

impl Strategy for EventLotto {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn generate_signals(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<TradeSignal>, StrategyError> {
        // Only trade into a scheduled event.
        let days_to_event = snapshot
            .upcoming_events()
            .iter()
            .map(|e| snapshot.date.days_until(e.date))
            .filter(|&d| d >= 0 && d <= i64::from(self.params.entry_window_days))
            .min();
        let Some(days_to_event) = days_to_event else {
            return Ok(Vec::new());
        };

        Ok(snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol, days_to_event))
            .collect())
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        // Once the event window is behind us the thesis is spent: flatten
        // regardless of P&L. Past events drop out of the snapshot, so "no
        // event left inside the entry window" means it has passed.
        if position.entry_date < snapshot.date
            && !snapshot.has_event_within(self.params.entry_window_days)
        {
            return PositionAction::CloseEvent;
        }
        common::manage_debit(position, snapshot, 1)
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("entry_window_days", dec!(1), dec!(5), dec!(1)),
            ParameterDescriptor::new("target_delta", dec!(0.10), dec!(0.40), dec!(0.05)),
            ParameterDescriptor::new("dte_past_event", dec!(3), dec!(21), dec!(2)),
            ParameterDescriptor::new("max_iv_rank", dec!(20), dec!(80), dec!(10)),
            ParameterDescriptor::new("risk_budget", dec!(0.0025), dec!(0.02), dec!(0.0025)),
        ]
    }
}
