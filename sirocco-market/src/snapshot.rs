//! Daily market snapshot and its builder.
//!
//! The simulation loop is the sole owner of snapshot construction: it
//! builds exactly one [`MarketSnapshot`] per trading day and hands it to
//! strategies by shared reference. A ticker with no data up to the date is
//! silently omitted (strategies must tolerate partial coverage); a missing
//! volatility-index value falls back to a fixed default rather than
//! failing the day.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sirocco_core::data::{DailyBar, EconomicEvent};
use sirocco_core::types::{Price, Symbol, TradeDate};

use crate::events::EventCalendar;
use crate::indicators::{clip_volatility, oscillator, realized_volatility, trend_slope, volatility_rank};
use crate::regime::{classify, Regime};
use crate::MarketError;

/// Volatility index fallback when no reading is available for a date.
pub const DEFAULT_VIX: Decimal = dec!(20);

/// Per-ticker indicator values for one snapshot day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerStats {
    /// Volatility rank 0-100 within the trailing window
    pub iv_rank: Decimal,
    /// Annualized realized volatility (true-range proxy, clipped)
    pub realized_vol: Decimal,
    /// Oscillator value 0-100
    pub oscillator: Decimal,
    /// Annualized trend slope of the moving average
    pub trend: Decimal,
}

/// Immutable bundle of everything a strategy may read for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Snapshot date
    pub date: TradeDate,
    /// Annualized risk-free rate
    pub risk_free_rate: Decimal,
    /// Per-ticker price history up to and including the date
    histories: BTreeMap<Symbol, Vec<DailyBar>>,
    /// Per-ticker current close
    closes: BTreeMap<Symbol, Price>,
    /// Per-ticker indicator values
    stats: BTreeMap<Symbol, TickerStats>,
    /// Volatility index level for the date (or fallback)
    pub vix: Decimal,
    /// Regime tag for the date
    pub regime: Regime,
    /// Events within the lookahead window
    upcoming_events: Vec<EconomicEvent>,
}

impl MarketSnapshot {
    /// Tickers covered by this snapshot, in deterministic sorted order.
    pub fn tickers(&self) -> impl Iterator<Item = &Symbol> {
        self.closes.keys()
    }

    /// Returns true if no ticker has data for this date.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Current close for a ticker, if covered.
    #[must_use]
    pub fn close_for(&self, symbol: &Symbol) -> Option<Price> {
        self.closes.get(symbol).copied()
    }

    /// Indicator values for a ticker, if covered.
    #[must_use]
    pub fn stats_for(&self, symbol: &Symbol) -> Option<&TickerStats> {
        self.stats.get(symbol)
    }

    /// Price history up to and including the snapshot date.
    #[must_use]
    pub fn history_for(&self, symbol: &Symbol) -> Option<&[DailyBar]> {
        self.histories.get(symbol).map(Vec::as_slice)
    }

    /// Events within the configured lookahead window.
    #[must_use]
    pub fn upcoming_events(&self) -> &[EconomicEvent] {
        &self.upcoming_events
    }

    /// Returns true if any upcoming event falls within `days` calendar
    /// days of the snapshot date.
    #[must_use]
    pub fn has_event_within(&self, days: u32) -> bool {
        self.upcoming_events
            .iter()
            .any(|e| self.date.days_until(e.date) <= i64::from(days))
    }
}

/// Pre-fetched historical inputs for a backtest run.
///
/// Data acquisition happens upfront, before the day loop begins; the
/// simulation itself performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    /// Per-ticker daily bars, sorted by date
    pub bars: BTreeMap<Symbol, Vec<DailyBar>>,
    /// Volatility index close series
    pub vix: BTreeMap<TradeDate, Decimal>,
}

impl MarketData {
    /// Creates a validated data container.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NoData` if every ticker's series is empty,
    /// or `MarketError::UnsortedData` if any series is not sorted
    /// chronologically.
    pub fn new(
        bars: BTreeMap<Symbol, Vec<DailyBar>>,
        vix: BTreeMap<TradeDate, Decimal>,
    ) -> Result<Self, MarketError> {
        if bars.values().all(Vec::is_empty) {
            return Err(MarketError::NoData);
        }
        for (symbol, series) in &bars {
            for i in 1..series.len() {
                if series[i].date <= series[i - 1].date {
                    return Err(MarketError::UnsortedData {
                        symbol: symbol.clone(),
                        index: i,
                    });
                }
            }
        }
        Ok(Self { bars, vix })
    }
}

/// Snapshot builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Benchmark ticker used for regime classification
    #[serde(default)]
    pub benchmark: Option<Symbol>,
    /// Annualized risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Decimal,
    /// Trailing window (observations) for the volatility rank
    #[serde(default = "default_vol_rank_window")]
    pub vol_rank_window: usize,
    /// Calendar-day lookahead for upcoming events
    #[serde(default = "default_event_lookahead_days")]
    pub event_lookahead_days: u32,
    /// Annualized trend threshold for regime classification
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: Decimal,
    /// Oscillator period (sessions)
    #[serde(default = "default_indicator_period")]
    pub oscillator_period: usize,
    /// True-range volatility period (sessions)
    #[serde(default = "default_indicator_period")]
    pub volatility_period: usize,
    /// Moving-average period for the per-ticker trend (sessions)
    #[serde(default = "default_trend_sma_period")]
    pub trend_sma_period: usize,
    /// Lookback for the per-ticker trend slope (sessions)
    #[serde(default = "default_trend_lookback")]
    pub trend_lookback: usize,
}

fn default_risk_free_rate() -> Decimal {
    dec!(0.02)
}

fn default_vol_rank_window() -> usize {
    252
}

fn default_event_lookahead_days() -> u32 {
    7
}

fn default_trend_threshold() -> Decimal {
    dec!(0.05)
}

fn default_indicator_period() -> usize {
    14
}

fn default_trend_sma_period() -> usize {
    20
}

fn default_trend_lookback() -> usize {
    10
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            benchmark: None,
            risk_free_rate: default_risk_free_rate(),
            vol_rank_window: default_vol_rank_window(),
            event_lookahead_days: default_event_lookahead_days(),
            trend_threshold: default_trend_threshold(),
            oscillator_period: default_indicator_period(),
            volatility_period: default_indicator_period(),
            trend_sma_period: default_trend_sma_period(),
            trend_lookback: default_trend_lookback(),
        }
    }
}

/// Builds one immutable [`MarketSnapshot`] per simulated day.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    data: MarketData,
    calendar: EventCalendar,
    config: SnapshotConfig,
    benchmark: Symbol,
}

impl SnapshotBuilder {
    /// Creates a snapshot builder.
    ///
    /// The regime benchmark is taken from the config if set, otherwise the
    /// first ticker (in sorted order) with any data.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NoData` if the data container has no bars at
    /// all.
    pub fn new(
        data: MarketData,
        calendar: EventCalendar,
        config: SnapshotConfig,
    ) -> Result<Self, MarketError> {
        let benchmark = match &config.benchmark {
            Some(symbol) => symbol.clone(),
            None => data
                .bars
                .iter()
                .find(|(_, bars)| !bars.is_empty())
                .map(|(symbol, _)| symbol.clone())
                .ok_or(MarketError::NoData)?,
        };
        Ok(Self {
            data,
            calendar,
            config,
            benchmark,
        })
    }

    /// Last known close for a ticker at or before `date`.
    #[must_use]
    pub fn last_close(&self, symbol: &Symbol, date: TradeDate) -> Option<Price> {
        let bars = self.data.bars.get(symbol)?;
        let end = bars.partition_point(|b| b.date <= date);
        if end == 0 {
            None
        } else {
            Some(bars[end - 1].close)
        }
    }

    /// Builds the snapshot for `date`.
    ///
    /// Tickers with no data up to the date are omitted; a missing
    /// volatility-index reading falls back to [`DEFAULT_VIX`].
    #[must_use]
    pub fn build(&self, date: TradeDate) -> MarketSnapshot {
        let vix = self.vix_at(date);
        let vix_window = self.vix_window(date);
        let iv_rank = volatility_rank(&vix_window, vix);

        let mut histories = BTreeMap::new();
        let mut closes = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for (symbol, bars) in &self.data.bars {
            let end = bars.partition_point(|b| b.date <= date);
            if end == 0 {
                debug!(%symbol, %date, "ticker omitted from snapshot: no data yet");
                continue;
            }
            let history = bars[..end].to_vec();
            let close_series: Vec<Decimal> =
                history.iter().map(|b| b.close.as_decimal()).collect();

            let realized_vol = realized_volatility(&history, self.config.volatility_period)
                .unwrap_or_else(|| clip_volatility(vix / dec!(100)));
            let osc = oscillator(&close_series, self.config.oscillator_period).unwrap_or(dec!(50));
            let trend = trend_slope(
                &close_series,
                self.config.trend_sma_period,
                self.config.trend_lookback,
            )
            .unwrap_or(Decimal::ZERO);

            closes.insert(symbol.clone(), history[history.len() - 1].close);
            stats.insert(
                symbol.clone(),
                TickerStats {
                    iv_rank,
                    realized_vol,
                    oscillator: osc,
                    trend,
                },
            );
            histories.insert(symbol.clone(), history);
        }

        let benchmark_closes: Vec<Decimal> = histories
            .get(&self.benchmark)
            .or_else(|| histories.values().next())
            .map(|bars| bars.iter().map(|b| b.close.as_decimal()).collect())
            .unwrap_or_default();
        let regime = classify(vix, &benchmark_closes, self.config.trend_threshold);

        let upcoming_events = self
            .calendar
            .events_within(date, self.config.event_lookahead_days);

        MarketSnapshot {
            date,
            risk_free_rate: self.config.risk_free_rate,
            histories,
            closes,
            stats,
            vix,
            regime,
            upcoming_events,
        }
    }

    /// Volatility index reading at or before `date`, with fallback.
    fn vix_at(&self, date: TradeDate) -> Decimal {
        self.data
            .vix
            .range(..=date)
            .next_back()
            .map_or(DEFAULT_VIX, |(_, v)| *v)
    }

    /// Trailing volatility-index window ending at `date`.
    fn vix_window(&self, date: TradeDate) -> Vec<Decimal> {
        let values: Vec<Decimal> = self
            .data
            .vix
            .range(..=date)
            .map(|(_, v)| *v)
            .collect();
        let start = values.len().saturating_sub(self.config.vol_rank_window);
        values[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirocco_core::data::EventKind;

    fn create_bars(symbol: &Symbol, start: TradeDate, closes: &[Decimal]) -> Vec<DailyBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyBar {
                symbol: symbol.clone(),
                date: start.add_days(i as u64),
                open: Price::new_unchecked(close),
                high: Price::new_unchecked(close + dec!(2)),
                low: Price::new_unchecked(close - dec!(2)),
                close: Price::new_unchecked(close),
                volume: 1_000_000,
            })
            .collect()
    }

    fn create_builder() -> SnapshotBuilder {
        let spy = Symbol::new("SPY").unwrap();
        let qqq = Symbol::new("QQQ").unwrap();
        let start = TradeDate::from_ymd(2024, 1, 1).unwrap();

        let mut bars = BTreeMap::new();
        let spy_closes: Vec<Decimal> =
            (0..60).map(|i| dec!(450) + Decimal::from(i as u64)).collect();
        bars.insert(spy.clone(), create_bars(&spy, start, &spy_closes));
        // QQQ starts 40 days later.
        let qqq_closes: Vec<Decimal> = (0..20).map(|_| dec!(380)).collect();
        bars.insert(
            qqq.clone(),
            create_bars(&qqq, start.add_days(40), &qqq_closes),
        );

        let mut vix = BTreeMap::new();
        for i in 0..60u64 {
            vix.insert(start.add_days(i), dec!(15) + Decimal::from(i % 10));
        }

        let data = MarketData::new(bars, vix).unwrap();
        let calendar = EventCalendar::new(vec![sirocco_core::data::EconomicEvent::new(
            EventKind::Fomc,
            start.add_days(52),
            "FOMC",
        )]);
        SnapshotBuilder::new(data, calendar, SnapshotConfig::default()).unwrap()
    }

    #[test]
    fn test_snapshot_omits_uncovered_ticker() {
        let builder = create_builder();
        let early = builder.build(TradeDate::from_ymd(2024, 1, 20).unwrap());
        let tickers: Vec<_> = early.tickers().map(Symbol::as_str).collect();
        assert_eq!(tickers, vec!["SPY"]);

        let late = builder.build(TradeDate::from_ymd(2024, 2, 25).unwrap());
        let tickers: Vec<_> = late.tickers().map(Symbol::as_str).collect();
        assert_eq!(tickers, vec!["QQQ", "SPY"]);
    }

    #[test]
    fn test_snapshot_history_ends_at_date() {
        let builder = create_builder();
        let date = TradeDate::from_ymd(2024, 1, 20).unwrap();
        let snapshot = builder.build(date);
        let history = snapshot
            .history_for(&Symbol::new("SPY").unwrap())
            .unwrap();
        assert!(history.iter().all(|b| b.date <= date));
        assert_eq!(history.len(), 20);
    }

    #[test]
    fn test_snapshot_vix_fallback() {
        let builder = create_builder();
        // Before any vix reading exists.
        let snapshot = builder.build(TradeDate::from_ymd(2023, 12, 20).unwrap());
        assert_eq!(snapshot.vix, DEFAULT_VIX);
    }

    #[test]
    fn test_snapshot_stats_present_for_covered_tickers() {
        let builder = create_builder();
        let snapshot = builder.build(TradeDate::from_ymd(2024, 2, 25).unwrap());
        let spy = Symbol::new("SPY").unwrap();
        let stats = snapshot.stats_for(&spy).unwrap();
        assert!(stats.trend > Decimal::ZERO);
        assert!(stats.realized_vol >= dec!(0.10) && stats.realized_vol <= dec!(1.00));
        assert!(stats.oscillator >= Decimal::ZERO && stats.oscillator <= dec!(100));
    }

    #[test]
    fn test_snapshot_upcoming_events() {
        let builder = create_builder();
        // Event on day 52; lookahead is 7 days.
        let snapshot = builder.build(TradeDate::from_ymd(2024, 2, 19).unwrap());
        assert_eq!(snapshot.upcoming_events().len(), 1);
        assert!(snapshot.has_event_within(4));

        let far = builder.build(TradeDate::from_ymd(2024, 1, 10).unwrap());
        assert!(far.upcoming_events().is_empty());
    }

    #[test]
    fn test_last_close() {
        let builder = create_builder();
        let spy = Symbol::new("SPY").unwrap();
        let close = builder
            .last_close(&spy, TradeDate::from_ymd(2024, 3, 30).unwrap())
            .unwrap();
        assert_eq!(close.as_decimal(), dec!(509));
        assert!(builder
            .last_close(&spy, TradeDate::from_ymd(2023, 1, 1).unwrap())
            .is_none());
    }

    #[test]
    fn test_market_data_rejects_unsorted() {
        let spy = Symbol::new("SPY").unwrap();
        let start = TradeDate::from_ymd(2024, 1, 1).unwrap();
        let mut bars = create_bars(&spy, start, &[dec!(450), dec!(451), dec!(452)]);
        bars.swap(0, 2);
        let mut map = BTreeMap::new();
        map.insert(spy, bars);
        let result = MarketData::new(map, BTreeMap::new());
        assert!(matches!(result, Err(MarketError::UnsortedData { .. })));
    }

    #[test]
    fn test_market_data_rejects_empty() {
        let result = MarketData::new(BTreeMap::new(), BTreeMap::new());
        assert!(matches!(result, Err(MarketError::NoData)));
    }
}
