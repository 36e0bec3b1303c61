//! Rule-based market regime classification.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::trend_slope;

/// Sessions used for the crash-detection return window.
const CRASH_RETURN_SESSIONS: usize = 10;

/// Moving-average period for trend detection.
const TREND_SMA_PERIOD: usize = 20;

/// Lookback sessions for the trend slope.
const TREND_LOOKBACK: usize = 10;

/// Discrete market regime labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Rising prices, benign volatility
    Bull,
    /// Falling prices, elevated volatility
    Bear,
    /// Elevated volatility without crash conditions
    HighVol,
    /// Depressed volatility, rangebound prices
    LowVol,
    /// Volatility spike combined with a sharp recent decline
    Crash,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bull => write!(f, "bull"),
            Self::Bear => write!(f, "bear"),
            Self::HighVol => write!(f, "high_vol"),
            Self::LowVol => write!(f, "low_vol"),
            Self::Crash => write!(f, "crash"),
        }
    }
}

/// Classifies the day's regime from the volatility index level and the
/// benchmark close history.
///
/// Priority order, highest first: `Crash` (vix above 40 and a drop of
/// more than 5% over the last 10 sessions), then `HighVol` (vix above
/// 30), then trend-based labels using the annualized slope of the 20-day
/// moving average thresholded at `trend_threshold` per year. Ambiguous
/// combinations resolve toward the nearest directional label; the final
/// fallback when genuinely flat and vix is not low is `Bull`.
///
/// The asymmetric `Bull` fallback is intentional and load-bearing for
/// behavioral compatibility with downstream strategy gates.
#[must_use]
pub fn classify(vix: Decimal, closes: &[Decimal], trend_threshold: Decimal) -> Regime {
    if vix > dec!(40) && recent_return(closes, CRASH_RETURN_SESSIONS) < dec!(-0.05) {
        return Regime::Crash;
    }
    if vix > dec!(30) {
        return Regime::HighVol;
    }

    let trend = trend_slope(closes, TREND_SMA_PERIOD, TREND_LOOKBACK).unwrap_or(Decimal::ZERO);

    if vix > dec!(25) && trend < -trend_threshold {
        return Regime::Bear;
    }
    if vix < dec!(20) && trend > trend_threshold {
        return Regime::Bull;
    }
    if vix < dec!(15) && trend.abs() <= trend_threshold {
        return Regime::LowVol;
    }
    if trend > trend_threshold {
        return Regime::Bull;
    }
    if trend < -trend_threshold {
        return Regime::Bear;
    }
    Regime::Bull
}

/// Percentage return over the last `sessions` sessions.
fn recent_return(closes: &[Decimal], sessions: usize) -> Decimal {
    if closes.len() <= sessions {
        return Decimal::ZERO;
    }
    let now = closes[closes.len() - 1];
    let then = closes[closes.len() - 1 - sessions];
    if then.is_zero() {
        return Decimal::ZERO;
    }
    now / then - Decimal::ONE
}
