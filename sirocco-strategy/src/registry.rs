//! Strategy registry: name to constructor lookup.
//!
//! Strategies are registered under stable names so a backtest
//! configuration can instantiate them from a parameter table. There is no
//! shared mutable base state: each call constructs a fresh boxed
//! instance.

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::r#trait::Strategy;
use crate::strategies::{
    CalendarSpread, CalendarSpreadParams, CreditSpread, CreditSpreadParams, DebitSpread,
    DebitSpreadParams, EventLotto, EventLottoParams, IronCondor, IronCondorParams, Momentum,
    MomentumParams, Straddle, StraddleParams,
};

/// Names of all registered strategies.
pub const REGISTERED: &[&str] = &[
    "credit_spread",
    "iron_condor",
    "calendar_spread",
    "debit_spread",
    "event_lotto",
    "straddle",
    "momentum",
];

/// Builds a strategy by registered name from a JSON parameter table.
///
/// Missing parameters fall back to the strategy's defaults; an empty
/// object (`{}`) builds the stock configuration.
///
/// # Errors
///
/// Returns an error for an unknown name, undeserializable parameters, or
/// parameters that fail the strategy's own validation.
pub fn build_strategy(name: &str, params: Value) -> Result<Box<dyn Strategy>> {
    match name {
        "credit_spread" => {
            let params: CreditSpreadParams = serde_json::from_value(params)?;
            Ok(Box::new(CreditSpread::new(params)?))
        }
        "iron_condor" => {
            let params: IronCondorParams = serde_json::from_value(params)?;
            Ok(Box::new(IronCondor::new(params)?))
        }
        "calendar_spread" => {
            let params: CalendarSpreadParams = serde_json::from_value(params)?;
            Ok(Box::new(CalendarSpread::new(params)?))
        }
        "debit_spread" => {
            let params: DebitSpreadParams = serde_json::from_value(params)?;
            Ok(Box::new(DebitSpread::new(params)?))
        }
        "event_lotto" => {
            let params: EventLottoParams = serde_json::from_value(params)?;
            Ok(Box::new(EventLotto::new(params)?))
        }
        "straddle" => {
            let params: StraddleParams = serde_json::from_value(params)?;
            Ok(Box::new(Straddle::new(params)?))
        }
        "momentum" => {
            let params: MomentumParams = serde_json::from_value(params)?;
            Ok(Box::new(Momentum::new(params)?))
        }
        other => Err(anyhow!("unknown strategy: {other}")),
    }
}
