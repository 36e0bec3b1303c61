//! Simulation configuration surface.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Amount, Symbol, TradeDate};

use super::ConfigError;

/// Configuration for one backtest run.
///
/// All monetary values are in account currency. `max_portfolio_risk_pct`
/// is the portfolio-wide heat cap: the total committed dollar risk of open
/// positions may not exceed this fraction of current equity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Tickers to simulate
    pub tickers: Vec<Symbol>,
    /// First simulated date (inclusive)
    pub start_date: TradeDate,
    /// Last simulated date (inclusive)
    pub end_date: TradeDate,
    /// Starting account capital
    #[serde(default = "default_starting_capital")]
    pub starting_capital: Amount,
    /// Commission charged per leg per contract, each way
    #[serde(default = "default_commission_per_leg")]
    pub commission_per_leg: Amount,
    /// Fractional slippage applied to mark-to-market closes
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
    /// Global cap on simultaneously open positions
    #[serde(default = "default_max_positions")]
    pub max_positions: u32,
    /// Per-strategy cap on simultaneously open positions
    #[serde(default = "default_max_positions_per_strategy")]
    pub max_positions_per_strategy: u32,
    /// Portfolio-wide heat cap as a fraction of equity
    #[serde(default = "default_max_portfolio_risk_pct")]
    pub max_portfolio_risk_pct: Decimal,
    /// Annualized risk-free rate used for pricing and Sharpe
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Decimal,
}

fn default_starting_capital() -> Amount {
    Amount::new(dec!(100000))
}

fn default_commission_per_leg() -> Amount {
    Amount::new(dec!(0.65))
}

fn default_slippage() -> Decimal {
    dec!(0.01)
}

fn default_max_positions() -> u32 {
    10
}

fn default_max_positions_per_strategy() -> u32 {
    3
}

fn default_max_portfolio_risk_pct() -> Decimal {
    dec!(0.5)
}

fn default_risk_free_rate() -> Decimal {
    dec!(0.02)
}

impl SimulationConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` on any inconsistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one ticker is required".to_string(),
            ));
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::Validation(format!(
                "start_date ({}) must be before end_date ({})",
                self.start_date, self.end_date
            )));
        }
        if !self.starting_capital.is_positive() {
            return Err(ConfigError::Validation(
                "starting_capital must be positive".to_string(),
            ));
        }
        if self.commission_per_leg.is_negative() {
            return Err(ConfigError::Validation(
                "commission_per_leg cannot be negative".to_string(),
            ));
        }
        if self.slippage < Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(ConfigError::Validation(
                "slippage must be in [0, 1)".to_string(),
            ));
        }
        if self.max_positions == 0 || self.max_positions_per_strategy == 0 {
            return Err(ConfigError::Validation(
                "position caps must be at least 1".to_string(),
            ));
        }
        if self.max_portfolio_risk_pct <= Decimal::ZERO || self.max_portfolio_risk_pct > Decimal::ONE
        {
            return Err(ConfigError::Validation(
                "max_portfolio_risk_pct must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
