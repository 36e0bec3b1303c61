//! Iron condor strategy.
//!
//! Sells a bull put spread and a bear call spread on the same underlying
//! and expiration, profiting if price stays between the short strikes.
//! Entered only in rangebound conditions with elevated volatility rank.

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

/// Iron condor strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronCondorParams {
    /// Strategy instance name
    #[serde(default = "default_name")]
    pub name: String,
    /// Absolute delta targeted for both short strikes
    #[serde(default = "default_short_delta")]
    pub short_delta: Decimal,
    /// Width of each wing
    #[serde(default = "default_wing_width")]
    pub wing_width: Decimal,
    /// Calendar days to expiration at entry
    #[serde(default = "default_days_to_expiration")]
    pub days_to_expiration: u32,
    /// Minimum volatility rank required
    #[serde(default = "default_min_iv_rank")]
    pub min_iv_rank: Decimal,
    /// Maximum absolute trend slope tolerated (condors want no trend)
    #[serde(default = "default_max_trend")]
    pub max_trend: Decimal,
    /// Exit when profit reaches this fraction of the credit
    #[serde(default = "default_profit_target")]
    pub profit_target: Decimal,
    /// Exit when the cost to close reaches this multiple of the credit
    #[serde(default = "default_stop_loss_multiple")]
    pub stop_loss_multiple: Decimal,
    /// Close profitable condors at or below this many days to expiry
    #[serde(default = "default_time_decay_close_dte")]
    pub time_decay_close_dte: i64,
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
    "iron_condor".to_string()
}

fn default_short_delta() -> Decimal {
    dec!(0.16)
}

fn default_wing_width() -> Decimal {
    dec!(5)
}

fn default_days_to_expiration() -> u32 {
    35
}

fn default_min_iv_rank() -> Decimal {
    dec!(40)
}

fn default_max_trend() -> Decimal {
    dec!(0.10)
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

fn default_event_buffer_days() -> u32 {
    2
}

fn default_risk_budget() -> Decimal {
    dec!(0.02)
}

fn default_strike_step() -> Decimal {
    dec!(5)
}

impl Default for IronCondorParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            short_delta: default_short_delta(),
            wing_width: default_wing_width(),
            days_to_expiration: default_days_to_expiration(),
            min_iv_rank: default_min_iv_rank(),
            max_trend: default_max_trend(),
            profit_target: default_profit_target(),
            stop_loss_multiple: default_stop_loss_multiple(),
            time_decay_close_dte: default_time_decay_close_dte(),
            event_buffer_days: default_event_buffer_days(),
            risk_budget: default_risk_budget(),
            strike_step: default_strike_step(),
        }
    }
}

impl IronCondorParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.short_delta <= Decimal::ZERO || self.short_delta >= dec!(0.5) {
            return Err(anyhow!("short_delta must be in (0, 0.5)"));
        }
        if self.wing_width <= Decimal::ZERO {
            return Err(anyhow!("wing_width must be positive"));
        }
        if self.days_to_expiration == 0 {
            return Err(anyhow!("days_to_expiration must be positive"));
        }
        if self.risk_budget <= Decimal::ZERO || self.risk_budget > Decimal::ONE {
            return Err(anyhow!("risk_budget must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Iron condor strategy.
pub struct IronCondor {
    params: IronCondorParams,
}

impl IronCondor {
    /// Creates the strategy from validated parameters.
    pub fn new(params: IronCondorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn scan_ticker(&self, snapshot: &MarketSnapshot, symbol: &Symbol) -> Option<TradeSignal> {
        let stats = snapshot.stats_for(symbol)?;
        if stats.iv_rank < self.params.min_iv_rank {
            return None;
        }
        if stats.trend.abs() > self.params.max_trend {
            return None;
        }

        let spot = snapshot.close_for(symbol)?;
        let expiry = snapshot
            .date
            .add_days(u64::from(self.params.days_to_expiration));
        let years = years_between(snapshot.date, expiry);
        let vol = stats.realized_vol;
        let rate = snapshot.risk_free_rate;

        let short_put = strike_for_delta(
            spot,
            self.params.short_delta,
            years,
            rate,
            vol,
            false,
            self.params.strike_step,
        );
        let short_call = strike_for_delta(
            spot,
            self.params.short_delta,
            years,
            rate,
            vol,
            true,
            self.params.strike_step,
        );
        // A condor needs distinct bodies on both sides of the spot.
        if short_put.as_decimal() >= short_call.as_decimal() {
            return None;
        }
        let long_put_value = short_put.as_decimal() - self.params.wing_width;
        if long_put_value <= Decimal::ZERO {
            return None;
        }
        let long_put = Price::new_unchecked(long_put_value);
        let long_call = Price::new_unchecked(short_call.as_decimal() + self.params.wing_width);

        let short_put_price = option_price(spot, short_put, years, rate, vol, false);
        let long_put_price = option_price(spot, long_put, years, rate, vol, false);
        let short_call_price = option_price(spot, short_call, years, rate, vol, true);
        let long_call_price = option_price(spot, long_call, years, rate, vol, true);

        let credit = (short_put_price - long_put_price) + (short_call_price - long_call_price);
        // Only one side can be breached at expiration.
        let max_loss = self.params.wing_width - credit;
        if credit <= Decimal::ZERO || max_loss <= Decimal::ZERO {
            return None;
        }

        let legs = vec![
            TradeLeg::option(LegKind::ShortPut, short_put, expiry, short_put_price).ok()?,
            TradeLeg::option(LegKind::LongPut, long_put, expiry, long_put_price).ok()?,
            TradeLeg::option(LegKind::ShortCall, short_call, expiry, short_call_price).ok()?,
            TradeLeg::option(LegKind::LongCall, long_call, expiry, long_call_price).ok()?,
        ];

        let score = credit / self.params.wing_width * dec!(100);
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "body".to_string(),
            format!("{short_put}/{short_call}"),
        );

        let signal = TradeSignal {
            strategy: self.params.name.clone(),
            symbol: symbol.clone(),
            direction: Direction::Neutral,
            legs,
            entry_is_credit: true,
            entry_value: Price::new_unchecked(credit),
            max_loss_per_unit: Price::new_unchecked(max_loss),
            max_profit_per_unit: Price::new_unchecked(credit),
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

impl Strategy for IronCondor {
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
        if snapshot.has_event_within(self.params.event_buffer_days) {
            return Ok(Vec::new());
        }
        Ok(snapshot
            .tickers()
            .filter_map(|symbol| self.scan_ticker(snapshot, symbol))
            .collect())
    }

    fn manage_position(&self, position: &Position, snapshot: &MarketSnapshot) -> PositionAction {
        common::manage_credit(position, snapshot, self.params.time_decay_close_dte, None)
    }

    fn size_position(&self, signal: &TradeSignal, portfolio: &PortfolioView<'_>) -> u32 {
        common::size_by_risk_budget(signal, portfolio, self.params.risk_budget)
    }

    fn parameter_space(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new("short_delta", dec!(0.05), dec!(0.35), dec!(0.05)),
            ParameterDescriptor::new("wing_width", dec!(1), dec!(20), dec!(1)),
            ParameterDescriptor::new("days_to_expiration", dec!(14), dec!(60), dec!(7)),
            ParameterDescriptor::new("min_iv_rank", dec!(20), dec!(80), dec!(10)),
            ParameterDescriptor::new("profit_target", dec!(0.25), dec!(0.75), dec!(0.05)),
            ParameterDescriptor::new("risk_budget", dec!(0.005), dec!(0.05), dec!(0.005)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil;

    fn create_strategy() -> IronCondor {
        IronCondor::new(IronCondorParams::default()).unwrap()
    }

    #[test]
    fn test_emits_condor_in_rangebound_high_vol() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        let signals = strategy.generate_signals(&snapshot).unwrap();
        assert_eq!(signals.len(), 1);

        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.legs.len(), 4);
        assert!(signal.entry_is_credit);

        // Put body below spot, call body above.
        let spot = snapshot.close_for(&testutil::sym()).unwrap();
        let short_put = &signal.legs[0];
        let short_call = &signal.legs[2];
        assert_eq!(short_put.kind, LegKind::ShortPut);
        assert_eq!(short_call.kind, LegKind::ShortCall);
        assert!(short_put.strike < spot);
        assert!(short_call.strike > spot);

        // Max loss is one wing minus the whole credit.
        assert_eq!(
            signal.entry_value.as_decimal() + signal.max_loss_per_unit.as_decimal(),
            dec!(5)
        );
    }

    #[test]
    fn test_trending_market_blocks_condor() {
        let strategy = create_strategy();
        let snapshot = testutil::snapshot(
            &testutil::zigzag_rising(60, dec!(430)),
            dec!(3),
            &testutil::vix_rising(60),
            &[],
        );
        assert!(strategy.generate_signals(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_low_iv_rank_blocks_condor() {
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
    fn test_manage_profit_target_when_pinned() {
        let strategy = create_strategy();
        // Price pinned between the bodies close to expiry: both sides
        // have decayed.
        let snapshot = testutil::snapshot(
            &testutil::flat_closes(60, dec!(460)),
            dec!(1),
            &testutil::vix_rising(60),
            &[],
        );
        let mut position = testutil::credit_position(
            "iron_condor",
            testutil::snap_date(40),
            snapshot.date.add_days(10),
            dec!(440),
            dec!(435),
            dec!(1.0),
            1,
        );
        // Add the call side to make it a condor.
        position.legs.push(
            TradeLeg::option(
                LegKind::ShortCall,
                Price::new_unchecked(dec!(480)),
                snapshot.date.add_days(10),
                Price::new_unchecked(dec!(1.2)),
            )
            .unwrap(),
        );
        position.legs.push(
            TradeLeg::option(
                LegKind::LongCall,
                Price::new_unchecked(dec!(485)),
                snapshot.date.add_days(10),
                Price::new_unchecked(dec!(0.6)),
            )
            .unwrap(),
        );
        let action = strategy.manage_position(&position, &snapshot);
        assert_eq!(action, PositionAction::CloseProfitTarget);
    }
}
