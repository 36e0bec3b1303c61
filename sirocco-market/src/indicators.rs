//! Technical indicator calculations.
//!
//! All indicators operate on `Decimal` series and return `None` when the
//! input is too short, leaving fallback policy to the caller.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sirocco_core::data::DailyBar;

/// Trading sessions per year, used for annualization.
pub const SESSIONS_PER_YEAR: Decimal = dec!(252);

/// Lower clip bound for annualized realized volatility.
pub const MIN_REALIZED_VOL: Decimal = dec!(0.10);

/// Upper clip bound for annualized realized volatility.
pub const MAX_REALIZED_VOL: Decimal = dec!(1.00);

/// Calculates the square root of a `Decimal` using Newton's method.
#[must_use]
pub fn decimal_sqrt(value: Decimal) -> Option<Decimal> {
    if value < Decimal::ZERO {
        return None;
    }
    if value.is_zero() {
        return Some(Decimal::ZERO);
    }

    let mut guess = value / dec!(2);
    let epsilon = dec!(0.0000001);

    for _ in 0..100 {
        let new_guess = (guess + value / guess) / dec!(2);
        if (new_guess - guess).abs() < epsilon {
            return Some(new_guess);
        }
        guess = new_guess;
    }

    Some(guess)
}

/// Simple moving average over the last `period` values.
///
/// Returns `None` when fewer than `period` values are available.
#[must_use]
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: Decimal = values[values.len() - period..].iter().copied().sum();
    Some(sum / Decimal::from(period as u64))
}

/// Annualized trend slope: percentage change per year of the
/// `sma_period`-session moving average over the last `lookback` sessions.
///
/// Returns `None` when the series is too short.
#[must_use]
pub fn trend_slope(closes: &[Decimal], sma_period: usize, lookback: usize) -> Option<Decimal> {
    if lookback == 0 || closes.len() < sma_period + lookback {
        return None;
    }
    let now = sma(closes, sma_period)?;
    let then = sma(&closes[..closes.len() - lookback], sma_period)?;
    if then.is_zero() {
        return None;
    }
    let change = now / then - Decimal::ONE;
    Some(change * SESSIONS_PER_YEAR / Decimal::from(lookback as u64))
}

/// RSI-style oscillator over the last `period` close-to-close changes,
/// expressed 0-100.
///
/// Returns `None` when fewer than `period + 1` closes are available.
#[must_use]
pub fn oscillator(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses -= change;
        }
    }

    if losses.is_zero() {
        return Some(dec!(100));
    }
    let rs = gains / losses;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + rs))
}

/// Annualized realized volatility from a true-range proxy, clipped to
/// `[MIN_REALIZED_VOL, MAX_REALIZED_VOL]`.
///
/// Uses the average true range over the last `period` sessions divided by
/// the latest close, annualized by `sqrt(252)`. Returns `None` when fewer
/// than `period + 1` bars are available.
#[must_use]
pub fn realized_volatility(bars: &[DailyBar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let window = &bars[bars.len() - period - 1..];
    let mut tr_sum = Decimal::ZERO;
    for pair in window.windows(2) {
        let prev_close = pair[0].close.as_decimal();
        let high = pair[1].high.as_decimal();
        let low = pair[1].low.as_decimal();
        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        tr_sum += tr;
    }
    let atr = tr_sum / Decimal::from(period as u64);

    let last_close = bars[bars.len() - 1].close.as_decimal();
    if last_close.is_zero() {
        return None;
    }
    let annualized = atr / last_close * decimal_sqrt(SESSIONS_PER_YEAR)?;
    Some(clip_volatility(annualized))
}

/// Clips an annualized volatility value to the sane band.
#[must_use]
pub fn clip_volatility(vol: Decimal) -> Decimal {
    vol.clamp(MIN_REALIZED_VOL, MAX_REALIZED_VOL)
}

/// Rank of `current` within the min-max range of `history`, expressed
/// 0-100.
///
/// A flat history (max equals min) ranks at 50.
#[must_use]
pub fn volatility_rank(history: &[Decimal], current: Decimal) -> Decimal {
    let Some(min) = history.iter().copied().min() else {
        return dec!(50);
    };
    let max = history.iter().copied().max().unwrap_or(min);
    let min = min.min(current);
    let max = max.max(current);
    if max == min {
        return dec!(50);
    }
    ((current - min) / (max - min) * dec!(100)).clamp(Decimal::ZERO, dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirocco_core::types::{Price, Symbol, TradeDate};

    fn create_bars(closes: &[(i64, i64)]) -> Vec<DailyBar> {
        // (close, range) pairs; high = close + range, low = close - range.
        let symbol = Symbol::new("SPY").unwrap();
        let start = TradeDate::from_ymd(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &(close, range))| {
                let close = Decimal::from(close);
                let range = Decimal::from(range);
                DailyBar {
                    symbol: symbol.clone(),
                    date: start.add_days(i as u64),
                    open: Price::new_unchecked(close),
                    high: Price::new_unchecked(close + range),
                    low: Price::new_unchecked(close - range),
                    close: Price::new_unchecked(close),
                    volume: 1_000_000,
                }
            })
            .collect()
    }

    #[test]
    fn test_decimal_sqrt() {
        assert_eq!(decimal_sqrt(dec!(0)), Some(dec!(0)));
        assert_eq!(decimal_sqrt(dec!(-1)), None);
        let sqrt252 = decimal_sqrt(dec!(252)).unwrap();
        assert!((sqrt252 - dec!(15.8745)).abs() < dec!(0.001));
    }

    #[test]
    fn test_sma() {
        let values = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(sma(&values, 5), Some(dec!(3)));
        assert_eq!(sma(&values, 2), Some(dec!(4.5)));
        assert_eq!(sma(&values, 6), None);
    }

    #[test]
    fn test_trend_slope_positive() {
        // Steadily rising closes produce a positive annualized slope.
        let closes: Vec<Decimal> = (0..40).map(|i| Decimal::from(100 + i)).collect();
        let slope = trend_slope(&closes, 20, 10).unwrap();
        assert!(slope > Decimal::ZERO);
    }

    #[test]
    fn test_trend_slope_flat() {
        let closes: Vec<Decimal> = std::iter::repeat(dec!(100)).take(40).collect();
        assert_eq!(trend_slope(&closes, 20, 10), Some(Decimal::ZERO));
    }

    #[test]
    fn test_oscillator_extremes() {
        let rising: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + i)).collect();
        assert_eq!(oscillator(&rising, 14), Some(dec!(100)));

        let falling: Vec<Decimal> = (0..20).map(|i| Decimal::from(200 - i)).collect();
        assert_eq!(oscillator(&falling, 14), Some(dec!(0)));
    }

    #[test]
    fn test_oscillator_balanced_near_50() {
        // Alternating +1/-1 changes should hover near 50.
        let mut closes = vec![dec!(100)];
        for i in 0..20 {
            let last = *closes.last().unwrap();
            let next = if i % 2 == 0 { last + dec!(1) } else { last - dec!(1) };
            closes.push(next);
        }
        let value = oscillator(&closes, 14).unwrap();
        assert!((value - dec!(50)).abs() < dec!(10));
    }

    #[test]
    fn test_realized_volatility_clipped() {
        // Tiny ranges clip to the lower band.
        let quiet = create_bars(&[(100, 0); 20]);
        assert_eq!(realized_volatility(&quiet, 14), Some(MIN_REALIZED_VOL));

        // Huge ranges clip to the upper band.
        let wild = create_bars(&[(100, 20); 20]);
        assert_eq!(realized_volatility(&wild, 14), Some(MAX_REALIZED_VOL));
    }

    #[test]
    fn test_realized_volatility_insufficient_data() {
        let bars = create_bars(&[(100, 1); 5]);
        assert_eq!(realized_volatility(&bars, 14), None);
    }

    #[test]
    fn test_volatility_rank() {
        let history = vec![dec!(12), dec!(20), dec!(28)];
        assert_eq!(volatility_rank(&history, dec!(28)), dec!(100));
        assert_eq!(volatility_rank(&history, dec!(12)), dec!(0));
        assert_eq!(volatility_rank(&history, dec!(20)), dec!(50));
        // Flat history ranks mid.
        assert_eq!(volatility_rank(&[dec!(20)], dec!(20)), dec!(50));
        // Empty history ranks mid.
        assert_eq!(volatility_rank(&[], dec!(20)), dec!(50));
    }
}
