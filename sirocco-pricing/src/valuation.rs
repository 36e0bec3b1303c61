//! Multi-leg position valuation and settlement.
//!
//! [`position_value`] is the single source of truth for "what would it
//! cost to close this position today": it is used both when estimating
//! entry credit/debit from theoretical prices and when marking a position
//! to market during exit evaluation.

use rust_decimal::Decimal;

use sirocco_core::data::TradeLeg;
use sirocco_core::types::{Amount, Price, TradeDate};

use crate::bs::{option_price, years_between};

/// Signed per-unit value of a single leg as of `as_of`.
///
/// Long option legs contribute `+price`, short option legs `-price`,
/// underlying legs `+/-spot`. A leg past its expiration is valued at zero
/// time to expiry, i.e. intrinsic only.
#[must_use]
pub fn leg_value(
    leg: &TradeLeg,
    spot: Price,
    volatility: Decimal,
    rate: Decimal,
    as_of: TradeDate,
) -> Amount {
    let unsigned = if leg.kind.is_option() {
        let years = years_between(as_of, leg.expiration);
        option_price(spot, leg.strike, years, rate, volatility, leg.kind.is_call()).as_decimal()
    } else {
        spot.as_decimal()
    };
    Amount::new(leg.kind.sign() * unsigned)
}

/// Signed per-unit value of a multi-leg position as of `as_of`.
///
/// Positive values mean closing the position pays the holder; negative
/// values mean closing costs money (typical for net-credit structures).
#[must_use]
pub fn position_value(
    legs: &[TradeLeg],
    spot: Price,
    volatility: Decimal,
    rate: Decimal,
    as_of: TradeDate,
) -> Amount {
    legs.iter()
        .map(|leg| leg_value(leg, spot, volatility, rate, as_of))
        .fold(Amount::ZERO, |acc, v| acc + v)
}

/// Signed per-unit settlement value of a position at expiration.
///
/// Each option leg pays its intrinsic value - `max(0, spot - strike)` for
/// calls, `max(0, strike - spot)` for puts - netted by leg direction.
/// Underlying legs settle linearly at the spot price.
#[must_use]
pub fn intrinsic_settlement(legs: &[TradeLeg], spot: Price) -> Amount {
    let total = legs
        .iter()
        .map(|leg| {
            let unsigned = if leg.kind.is_option() {
                let moneyness = if leg.kind.is_call() {
                    spot.as_decimal() - leg.strike.as_decimal()
                } else {
                    leg.strike.as_decimal() - spot.as_decimal()
                };
                moneyness.max(Decimal::ZERO)
            } else {
                spot.as_decimal()
            };
            leg.kind.sign() * unsigned
        })
        .sum::<Decimal>();
    Amount::new(total)
}
