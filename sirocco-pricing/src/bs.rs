//! Closed-form lognormal (Black-Scholes) option pricing.
//!
//! Degenerate inputs are clamped to safe floors rather than raised as
//! errors: near-zero time to expiry, near-zero volatility, and
//! non-positive spot or strike all produce a well-defined price. An
//! expired option (`years_to_expiry <= 0`) is priced at intrinsic value.

use libm::erf;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::f64::consts::SQRT_2;

use sirocco_core::types::{Price, TradeDate};

/// Minimum time to expiration used by the pricing kernel (one day).
const MIN_YEARS: f64 = 1.0 / 365.0;

/// Volatility floor.
const MIN_VOL: f64 = 0.05;

/// Floor for spot and strike inputs.
const MIN_UNDERLYING: f64 = 0.01;

/// Strike-scan bound for delta targeting, as a fraction of spot.
const STRIKE_SCAN_RANGE: f64 = 0.6;

fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_TWO_PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_TWO_PI * (-0.5 * x * x).exp()
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

fn dec_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Fraction of a year between two dates (365-day convention).
///
/// Negative when `to` precedes `from`.
#[must_use]
pub fn years_between(from: TradeDate, to: TradeDate) -> Decimal {
    Decimal::from(from.days_until(to)) / Decimal::from(365)
}

fn intrinsic(spot: f64, strike: f64, is_call: bool) -> f64 {
    if is_call {
        (spot - strike).max(0.0)
    } else {
        (strike - spot).max(0.0)
    }
}

fn d1_d2(spot: f64, strike: f64, years: f64, rate: f64, vol: f64) -> (f64, f64) {
    let denom = vol * years.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * years) / denom;
    (d1, d1 - denom)
}

/// Prices a European option under the lognormal closed form.
///
/// `years_to_expiry <= 0` returns intrinsic value. Otherwise time is
/// clamped to at least one day, volatility to at least the floor, and
/// spot/strike to a minimum positive value, so the result is always a
/// finite non-negative price.
#[must_use]
pub fn option_price(
    spot: Price,
    strike: Price,
    years_to_expiry: Decimal,
    rate: Decimal,
    volatility: Decimal,
    is_call: bool,
) -> Price {
    let spot = dec_to_f64(spot.as_decimal()).max(MIN_UNDERLYING);
    let strike = dec_to_f64(strike.as_decimal()).max(MIN_UNDERLYING);
    let years = dec_to_f64(years_to_expiry);

    if years <= 0.0 {
        return Price::new_unchecked(f64_to_decimal(intrinsic(spot, strike, is_call)));
    }

    let years = years.max(MIN_YEARS);
    let vol = dec_to_f64(volatility).max(MIN_VOL);
    let rate = dec_to_f64(rate);

    let (d1, d2) = d1_d2(spot, strike, years, rate, vol);
    let disc = (-rate * years).exp();
    let price = if is_call {
        spot * norm_cdf(d1) - strike * disc * norm_cdf(d2)
    } else {
        strike * disc * norm_cdf(-d2) - spot * norm_cdf(-d1)
    };

    Price::new_unchecked(f64_to_decimal(price.max(0.0)))
}

/// Option delta: sensitivity of price to a unit spot move.
///
/// Used as a proxy for the probability the option expires in the money.
/// Calls return a value in `[0, 1]`, puts in `[-1, 0]`. An expired option
/// returns its settlement delta (0 or +/-1).
#[must_use]
pub fn delta(
    spot: Price,
    strike: Price,
    years_to_expiry: Decimal,
    rate: Decimal,
    volatility: Decimal,
    is_call: bool,
) -> Decimal {
    let spot_f = dec_to_f64(spot.as_decimal()).max(MIN_UNDERLYING);
    let strike_f = dec_to_f64(strike.as_decimal()).max(MIN_UNDERLYING);
    let years = dec_to_f64(years_to_expiry);

    if years <= 0.0 {
        let itm = intrinsic(spot_f, strike_f, is_call) > 0.0;
        let settled = match (is_call, itm) {
            (true, true) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        return f64_to_decimal(settled);
    }

    let years = years.max(MIN_YEARS);
    let vol = dec_to_f64(volatility).max(MIN_VOL);
    let rate = dec_to_f64(rate);
    let (d1, _) = d1_d2(spot_f, strike_f, years, rate, vol);

    let value = if is_call {
        norm_cdf(d1)
    } else {
        norm_cdf(d1) - 1.0
    };
    f64_to_decimal(value)
}

/// Finds the strike on a fixed-step grid whose absolute delta is closest
/// to `target_delta`.
///
/// Calls scan upward from the spot-adjacent grid strike, puts scan
/// downward; the scan covers roughly +/-60% of spot. `target_delta` is the
/// absolute delta (e.g. `0.30`).
#[must_use]
pub fn strike_for_delta(
    spot: Price,
    target_delta: Decimal,
    years_to_expiry: Decimal,
    rate: Decimal,
    volatility: Decimal,
    is_call: bool,
    strike_step: Decimal,
) -> Price {
    let step = if strike_step <= Decimal::ZERO {
        Decimal::ONE
    } else {
        strike_step
    };

    // Nearest grid strike at or around the money.
    let ratio = (spot.as_decimal() / step).round();
    let mut strike = ratio * step;
    if strike <= Decimal::ZERO {
        strike = step;
    }

    let spot_f = dec_to_f64(spot.as_decimal()).max(MIN_UNDERLYING);
    let max_distance = f64_to_decimal(spot_f * STRIKE_SCAN_RANGE);

    let mut best_strike = strike;
    let mut best_error: Option<Decimal> = None;
    let mut distance = Decimal::ZERO;

    while distance <= max_distance {
        let candidate = Price::new_unchecked(strike);
        let d = delta(spot, candidate, years_to_expiry, rate, volatility, is_call).abs();
        let error = (d - target_delta).abs();
        if best_error.is_none_or(|b| error < b) {
            best_error = Some(error);
            best_strike = strike;
        }

        if is_call {
            strike += step;
        } else {
            strike -= step;
            if strike <= Decimal::ZERO {
                break;
            }
        }
        distance += step;
    }

    Price::new_unchecked(best_strike)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(spot: f64, strike: f64, years: f64, vol: f64, is_call: bool) -> Decimal {
        option_price(
            Price::new_unchecked(f64_to_decimal(spot)),
            Price::new_unchecked(f64_to_decimal(strike)),
            f64_to_decimal(years),
            dec!(0.02),
            f64_to_decimal(vol),
            is_call,
        )
        .as_decimal()
    }

    #[test]
    fn test_price_above_intrinsic() {
        let call = price(460.0, 450.0, 30.0 / 365.0, 0.20, true);
        assert!(call > dec!(10.0));
        let put = price(460.0, 450.0, 30.0 / 365.0, 0.20, false);
        assert!(put > Decimal::ZERO);
    }

    #[test]
    fn test_price_increases_with_volatility() {
        let low = price(460.0, 460.0, 30.0 / 365.0, 0.15, true);
        let high = price(460.0, 460.0, 30.0 / 365.0, 0.45, true);
        assert!(high > low);
    }

    #[test]
    fn test_put_call_parity() {
        // C - P = S - K * exp(-rT)
        let spot = 460.0;
        let strike = 455.0;
        let years = 45.0 / 365.0;
        let call = price(spot, strike, years, 0.25, true);
        let put = price(spot, strike, years, 0.25, false);
        let forward = f64_to_decimal(spot - strike * (-0.02_f64 * years).exp());
        assert!(((call - put) - forward).abs() < dec!(0.01));
    }

    #[test]
    fn test_expired_option_is_intrinsic() {
        assert_eq!(price(460.0, 450.0, 0.0, 0.20, true), dec!(10));
        assert_eq!(price(460.0, 450.0, -1.0, 0.20, false), dec!(0));
        assert_eq!(price(440.0, 450.0, 0.0, 0.20, false), dec!(10));
    }

    #[test]
    fn test_degenerate_inputs_clamped() {
        // Zero spot, zero strike, zero vol: all must produce a finite price.
        let p = option_price(
            Price::ZERO,
            Price::ZERO,
            dec!(0.1),
            dec!(0.02),
            Decimal::ZERO,
            true,
        );
        assert!(p.as_decimal() >= Decimal::ZERO);
    }

    #[test]
    fn test_delta_ranges() {
        let spot = Price::new_unchecked(dec!(460));
        let years = dec!(0.0822); // ~30 days
        let atm_call = delta(spot, spot, years, dec!(0.02), dec!(0.2), true);
        assert!(atm_call > dec!(0.45) && atm_call < dec!(0.60));

        let otm_put = delta(
            spot,
            Price::new_unchecked(dec!(430)),
            years,
            dec!(0.02),
            dec!(0.2),
            false,
        );
        assert!(otm_put < Decimal::ZERO && otm_put > dec!(-0.5));
    }

    #[test]
    fn test_delta_settlement() {
        let spot = Price::new_unchecked(dec!(460));
        let strike = Price::new_unchecked(dec!(450));
        assert_eq!(delta(spot, strike, Decimal::ZERO, dec!(0.02), dec!(0.2), true), dec!(1));
        assert_eq!(
            delta(spot, strike, Decimal::ZERO, dec!(0.02), dec!(0.2), false),
            dec!(0)
        );
    }

    #[test]
    fn test_strike_for_delta_put() {
        let spot = Price::new_unchecked(dec!(460));
        let strike = strike_for_delta(
            spot,
            dec!(0.30),
            dec!(0.0822),
            dec!(0.02),
            dec!(0.2),
            false,
            dec!(5),
        );
        // A 30-delta put sits below the money.
        assert!(strike.as_decimal() < dec!(460));
        assert!(strike.as_decimal() > dec!(420));
        // The strike lands on the grid.
        assert_eq!(strike.as_decimal() % dec!(5), Decimal::ZERO);
    }

    #[test]
    fn test_strike_for_delta_call_above_money() {
        let spot = Price::new_unchecked(dec!(460));
        let strike = strike_for_delta(
            spot,
            dec!(0.25),
            dec!(0.0822),
            dec!(0.02),
            dec!(0.2),
            true,
            dec!(5),
        );
        assert!(strike.as_decimal() > dec!(460));
    }

    #[test]
    fn test_years_between() {
        let from = TradeDate::from_ymd(2024, 1, 1).unwrap();
        let to = TradeDate::from_ymd(2024, 12, 31).unwrap();
        assert_eq!(years_between(from, to), Decimal::from(365) / Decimal::from(365));
        assert!(years_between(to, from) < Decimal::ZERO);
    }
}
