//! Snapshot and position fixtures shared by strategy tests.

use std::collections::BTreeMap;

use chrono::Days;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sirocco_core::data::{
    DailyBar, Direction, EconomicEvent, EventKind, LegKind, Position, PositionEntry, PositionId,
    TradeLeg,
};
use sirocco_core::types::{Amount, Price, Symbol, TradeDate};
use sirocco_market::{EventCalendar, MarketData, MarketSnapshot, SnapshotBuilder, SnapshotConfig};

pub(crate) fn sym() -> Symbol {
    Symbol::new("SPY").unwrap()
}

fn series_start() -> TradeDate {
    TradeDate::from_ymd(2024, 1, 1).unwrap()
}

/// Snapshot date for a series of `n` daily closes.
pub(crate) fn snap_date(n: usize) -> TradeDate {
    series_start().add_days(n as u64 - 1)
}

fn sub_days(date: TradeDate, days: u64) -> TradeDate {
    TradeDate::new(
        date.as_naive()
            .checked_sub_days(Days::new(days))
            .unwrap_or(date.as_naive()),
    )
}

/// Flat close series.
pub(crate) fn flat_closes(n: usize, value: Decimal) -> Vec<Decimal> {
    vec![value; n]
}

/// Rising series with a mixed texture: +2 then -1, net up, oscillator in
/// the mid-60s rather than pinned at 100.
pub(crate) fn zigzag_rising(n: usize, start: Decimal) -> Vec<Decimal> {
    let mut closes = Vec::with_capacity(n);
    let mut value = start;
    for i in 0..n {
        closes.push(value);
        value += if i % 2 == 0 { dec!(2) } else { dec!(-1) };
    }
    closes
}

/// Falling series with a mixed texture: -2 then +1.
pub(crate) fn zigzag_falling(n: usize, start: Decimal) -> Vec<Decimal> {
    let mut closes = Vec::with_capacity(n);
    let mut value = start;
    for i in 0..n {
        closes.push(value);
        value += if i % 2 == 0 { dec!(-2) } else { dec!(1) };
    }
    closes
}

/// Volatility index series rising linearly from 15 to 35 (rank 100).
pub(crate) fn vix_rising(n: usize) -> Vec<Decimal> {
    linear_series(n, dec!(15), dec!(35))
}

/// Volatility index series falling linearly from 35 to 15 (rank 0).
pub(crate) fn vix_falling(n: usize) -> Vec<Decimal> {
    linear_series(n, dec!(35), dec!(15))
}

fn linear_series(n: usize, from: Decimal, to: Decimal) -> Vec<Decimal> {
    if n <= 1 {
        return vec![to; n];
    }
    let step = (to - from) / Decimal::from(n as u64 - 1);
    (0..n)
        .map(|i| from + step * Decimal::from(i as u64))
        .collect()
}

/// Builds a single-ticker snapshot for the last date of `closes`.
///
/// `range` is the half-range used for bar highs/lows (controls realized
/// volatility). `event_offsets` are calendar-day offsets of FOMC events
/// relative to the snapshot date.
pub(crate) fn snapshot(
    closes: &[Decimal],
    range: Decimal,
    vix: &[Decimal],
    event_offsets: &[i64],
) -> MarketSnapshot {
    let symbol = sym();
    let start = series_start();
    let date = snap_date(closes.len());

    let bars: Vec<DailyBar> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyBar {
            symbol: symbol.clone(),
            date: start.add_days(i as u64),
            open: Price::new_unchecked(close),
            high: Price::new_unchecked(close + range),
            low: Price::new_unchecked(close - range),
            close: Price::new_unchecked(close),
            volume: 1_000_000,
        })
        .collect();

    let mut bar_map = BTreeMap::new();
    bar_map.insert(symbol, bars);

    let mut vix_map = BTreeMap::new();
    for (i, &value) in vix.iter().enumerate() {
        let offset = vix.len() - 1 - i;
        vix_map.insert(sub_days(date, offset as u64), value);
    }

    let events: Vec<EconomicEvent> = event_offsets
        .iter()
        .map(|&offset| {
            let event_date = if offset >= 0 {
                date.add_days(offset as u64)
            } else {
                sub_days(date, offset.unsigned_abs())
            };
            EconomicEvent::new(EventKind::Fomc, event_date, "FOMC")
        })
        .collect();

    let data = MarketData::new(bar_map, vix_map).unwrap();
    let builder =
        SnapshotBuilder::new(data, EventCalendar::new(events), SnapshotConfig::default()).unwrap();
    builder.build(date)
}

/// Opens a two-leg put credit spread position for management tests.
pub(crate) fn credit_position(
    strategy: &str,
    entry_date: TradeDate,
    expiry: TradeDate,
    short_strike: Decimal,
    long_strike: Decimal,
    credit: Decimal,
    contracts: u32,
) -> Position {
    let width = (short_strike - long_strike).abs();
    Position::open(
        PositionId::new(1),
        PositionEntry {
            strategy: strategy.to_string(),
            symbol: sym(),
            direction: Direction::Long,
            legs: vec![
                TradeLeg::option(
                    LegKind::ShortPut,
                    Price::new_unchecked(short_strike),
                    expiry,
                    Price::new_unchecked(credit + dec!(1)),
                )
                .unwrap(),
                TradeLeg::option(
                    LegKind::LongPut,
                    Price::new_unchecked(long_strike),
                    expiry,
                    Price::new_unchecked(dec!(1)),
                )
                .unwrap(),
            ],
            entry_is_credit: true,
            entry_value: Price::new_unchecked(credit),
            max_loss_per_unit: Price::new_unchecked(width - credit),
            max_profit_per_unit: Price::new_unchecked(credit),
            profit_target: dec!(0.5),
            stop_loss_multiple: dec!(2.0),
            contracts,
            entry_date,
            entry_commission: Amount::ZERO,
        },
    )
    .unwrap()
}
