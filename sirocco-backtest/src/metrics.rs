//! Performance metrics calculation.
//!
//! Consumes the closed-position list and the equity curve. All metrics
//! report well-defined zero defaults on empty input - an empty backtest
//! is a valid (if disappointing) result, not an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::Position;
use sirocco_core::types::{Amount, TradeDate};
use sirocco_market::indicators::decimal_sqrt;

/// Sentinel cap reported when there are winners and no losers.
pub const PROFIT_FACTOR_CAP: Decimal = dec!(999);

/// Trade statistics computed from closed positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Total number of closed trades
    pub total_trades: u64,
    /// Trades with positive realized P&L
    pub winning_trades: u64,
    /// Trades with negative realized P&L
    pub losing_trades: u64,
    /// Win rate (0.0 to 1.0)
    pub win_rate: Decimal,
    /// Sum of realized P&L across all trades
    pub total_pnl: Amount,
    /// Sum of winning P&L
    pub gross_profit: Amount,
    /// Sum of losing P&L magnitudes (reported positive)
    pub gross_loss: Amount,
    /// Average winning trade
    pub avg_win: Amount,
    /// Average losing trade (reported positive)
    pub avg_loss: Amount,
    /// `gross_profit / gross_loss`; capped sentinel with no losers, zero
    /// with no winners either
    pub profit_factor: Decimal,
    /// Longest run of consecutive winners
    pub max_consecutive_wins: u32,
    /// Longest run of consecutive losers
    pub max_consecutive_losses: u32,
    /// P&L keyed by exit month (`YYYY-MM`)
    pub monthly_pnl: BTreeMap<String, Amount>,
    /// P&L keyed by exit year
    pub yearly_pnl: BTreeMap<i32, Amount>,
}

/// Equity-curve derived metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityMetrics {
    /// Annualized mean-over-stdev of daily percentage changes
    pub sharpe_ratio: Decimal,
    /// Most negative peak-to-trough fraction (<= 0)
    pub max_drawdown: Decimal,
}

/// Computes trade statistics from closed positions.
///
/// Positions still open are ignored. Streaks are evaluated in exit-date
/// order (ties broken by position id).
#[must_use]
pub fn compute_metrics(closed: &[Position]) -> PerformanceStats {
    let mut trades: Vec<(TradeDate, u64, Amount)> = closed
        .iter()
        .filter_map(|p| {
            p.closed()
                .map(|c| (c.exit_date, p.id.as_u64(), c.realized_pnl))
        })
        .collect();
    trades.sort_by_key(|&(date, id, _)| (date, id));

    if trades.is_empty() {
        return PerformanceStats::default();
    }

    let mut stats = PerformanceStats {
        total_trades: trades.len() as u64,
        ..PerformanceStats::default()
    };

    let mut win_streak = 0u32;
    let mut loss_streak = 0u32;

    for &(exit_date, _, pnl) in &trades {
        stats.total_pnl += pnl;

        let month_key = format!("{:04}-{:02}", exit_date.year(), exit_date.month());
        *stats.monthly_pnl.entry(month_key).or_default() += pnl;
        *stats.yearly_pnl.entry(exit_date.year()).or_default() += pnl;

        if pnl.is_positive() {
            stats.winning_trades += 1;
            stats.gross_profit += pnl;
            win_streak += 1;
            loss_streak = 0;
        } else if pnl.is_negative() {
            stats.losing_trades += 1;
            stats.gross_loss += pnl.abs();
            loss_streak += 1;
            win_streak = 0;
        } else {
            // Scratch trade: breaks both streaks.
            win_streak = 0;
            loss_streak = 0;
        }
        stats.max_consecutive_wins = stats.max_consecutive_wins.max(win_streak);
        stats.max_consecutive_losses = stats.max_consecutive_losses.max(loss_streak);
    }

    stats.win_rate = Decimal::from(stats.winning_trades) / Decimal::from(stats.total_trades);

    if stats.winning_trades > 0 {
        stats.avg_win = Amount::new(
            stats.gross_profit.as_decimal() / Decimal::from(stats.winning_trades),
        );
    }
    if stats.losing_trades > 0 {
        stats.avg_loss =
            Amount::new(stats.gross_loss.as_decimal() / Decimal::from(stats.losing_trades));
    }

    stats.profit_factor = if stats.gross_loss.is_zero() {
        if stats.gross_profit.is_zero() {
            Decimal::ZERO
        } else {
            PROFIT_FACTOR_CAP
        }
    } else {
        (stats.gross_profit.as_decimal() / stats.gross_loss.as_decimal())
            .min(PROFIT_FACTOR_CAP)
    };

    stats
}

/// Computes Sharpe-like ratio and maximum drawdown from an equity curve.
///
/// The Sharpe-like ratio is `mean(daily % change) / stdev(daily % change)
/// x sqrt(252)`; drawdown is the most negative `(equity - peak) / peak`.
#[must_use]
pub fn equity_metrics(curve: &[(TradeDate, Amount)]) -> EquityMetrics {
    if curve.len() < 2 {
        return EquityMetrics::default();
    }

    let mut returns = Vec::with_capacity(curve.len() - 1);
    for pair in curve.windows(2) {
        let prev = pair[0].1.as_decimal();
        if prev.is_zero() {
            continue;
        }
        returns.push((pair[1].1.as_decimal() - prev) / prev);
    }

    let sharpe_ratio = sharpe_from_returns(&returns).unwrap_or(Decimal::ZERO);

    let mut peak = curve[0].1.as_decimal();
    let mut max_drawdown = Decimal::ZERO;
    for &(_, equity) in curve {
        let equity = equity.as_decimal();
        if equity > peak {
            peak = equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = (equity - peak) / peak;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    EquityMetrics {
        sharpe_ratio,
        max_drawdown,
    }
}

fn sharpe_from_returns(returns: &[Decimal]) -> Option<Decimal> {
    if returns.len() < 2 {
        return None;
    }
    let n = Decimal::from(returns.len() as u64);
    let mean = returns.iter().copied().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = *r - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / n;
    let std_dev = decimal_sqrt(variance)?;
    if std_dev.is_zero() {
        return None;
    }
    Some(mean / std_dev * decimal_sqrt(dec!(252))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sirocco_core::data::{
        Direction, ExitReason, LegKind, PositionEntry, PositionId, TradeLeg,
    };
    use sirocco_core::types::{Price, Symbol};

    fn closed_trade(id: u64, pnl: Decimal, exit: TradeDate) -> Position {
        let expiry = TradeDate::from_ymd(2024, 6, 21).unwrap();
        let mut position = Position::open(
            PositionId::new(id),
            PositionEntry {
                strategy: "credit_spread".to_string(),
                symbol: Symbol::new("SPY").unwrap(),
                direction: Direction::Long,
                legs: vec![TradeLeg::option(
                    LegKind::ShortPut,
                    Price::new_unchecked(dec!(450)),
                    expiry,
                    Price::new_unchecked(dec!(3)),
                )
                .unwrap()],
                entry_is_credit: true,
                entry_value: Price::new_unchecked(dec!(1.75)),
                max_loss_per_unit: Price::new_unchecked(dec!(3.25)),
                max_profit_per_unit: Price::new_unchecked(dec!(1.75)),
                profit_target: dec!(0.5),
                stop_loss_multiple: dec!(2.0),
                contracts: 1,
                entry_date: TradeDate::from_ymd(2024, 1, 2).unwrap(),
                entry_commission: Amount::ZERO,
            },
        )
        .unwrap();
        position
            .close(exit, ExitReason::ProfitTarget, Amount::new(pnl), Amount::ZERO)
            .unwrap();
        position
    }

    fn date(month: u32, day: u32) -> TradeDate {
        TradeDate::from_ymd(2024, month, day).unwrap()
    }

    #[test]
    fn test_empty_trade_set_reports_zero_defaults() {
        let stats = compute_metrics(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, Decimal::ZERO);
        assert_eq!(stats.profit_factor, Decimal::ZERO);
        assert_eq!(stats.max_consecutive_wins, 0);
        assert!(stats.monthly_pnl.is_empty());
    }

    #[test]
    fn test_basic_stats() {
        let closed = vec![
            closed_trade(1, dec!(500), date(1, 10)),
            closed_trade(2, dec!(300), date(1, 20)),
            closed_trade(3, dec!(-200), date(2, 5)),
            closed_trade(4, dec!(-100), date(2, 15)),
        ];
        let stats = compute_metrics(&closed);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 2);
        assert_eq!(stats.win_rate, dec!(0.5));
        assert_eq!(stats.gross_profit.as_decimal(), dec!(800));
        assert_eq!(stats.gross_loss.as_decimal(), dec!(300));
        assert_eq!(stats.total_pnl.as_decimal(), dec!(500));
        assert_eq!(stats.avg_win.as_decimal(), dec!(400));
        assert_eq!(stats.avg_loss.as_decimal(), dec!(150));
        assert_eq!(stats.profit_factor, dec!(800) / dec!(300));
    }

    #[test]
    fn test_streaks_in_exit_date_order() {
        // Supplied out of order; streaks must follow exit dates.
        let closed = vec![
            closed_trade(4, dec!(-100), date(3, 1)),
            closed_trade(1, dec!(100), date(1, 5)),
            closed_trade(3, dec!(100), date(2, 10)),
            closed_trade(2, dec!(100), date(1, 20)),
            closed_trade(5, dec!(-100), date(3, 10)),
        ];
        let stats = compute_metrics(&closed);
        assert_eq!(stats.max_consecutive_wins, 3);
        assert_eq!(stats.max_consecutive_losses, 2);
    }

    #[test]
    fn test_profit_factor_sentinels() {
        let winners_only = vec![closed_trade(1, dec!(100), date(1, 5))];
        assert_eq!(compute_metrics(&winners_only).profit_factor, PROFIT_FACTOR_CAP);

        let losers_only = vec![closed_trade(1, dec!(-100), date(1, 5))];
        assert_eq!(compute_metrics(&losers_only).profit_factor, Decimal::ZERO);

        let scratch_only = vec![closed_trade(1, dec!(0), date(1, 5))];
        let stats = compute_metrics(&scratch_only);
        assert_eq!(stats.profit_factor, Decimal::ZERO);
        assert_eq!(stats.winning_trades, 0);
        assert_eq!(stats.losing_trades, 0);
    }

    #[test]
    fn test_monthly_and_yearly_breakdown() {
        let closed = vec![
            closed_trade(1, dec!(100), date(1, 10)),
            closed_trade(2, dec!(200), date(1, 25)),
            closed_trade(3, dec!(-50), date(2, 5)),
        ];
        let stats = compute_metrics(&closed);
        assert_eq!(stats.monthly_pnl["2024-01"].as_decimal(), dec!(300));
        assert_eq!(stats.monthly_pnl["2024-02"].as_decimal(), dec!(-50));
        assert_eq!(stats.yearly_pnl[&2024].as_decimal(), dec!(250));
    }

    #[test]
    fn test_equity_metrics_empty_and_flat() {
        assert_eq!(equity_metrics(&[]), EquityMetrics::default());

        let flat: Vec<(TradeDate, Amount)> = (1..=5)
            .map(|d| (date(1, d), Amount::new(dec!(100000))))
            .collect();
        let metrics = equity_metrics(&flat);
        assert_eq!(metrics.sharpe_ratio, Decimal::ZERO);
        assert_eq!(metrics.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_max_drawdown() {
        let curve = vec![
            (date(1, 1), Amount::new(dec!(100000))),
            (date(1, 2), Amount::new(dec!(110000))),
            (date(1, 3), Amount::new(dec!(99000))),
            (date(1, 4), Amount::new(dec!(104500))),
        ];
        let metrics = equity_metrics(&curve);
        // (99000 - 110000) / 110000 = -0.1
        assert_eq!(metrics.max_drawdown, dec!(-0.1));
    }

    #[test]
    fn test_sharpe_positive_for_steady_gains() {
        let curve: Vec<(TradeDate, Amount)> = (1..=20)
            .map(|d| {
                (
                    date(1, d),
                    Amount::new(dec!(100000) + Decimal::from(d as u64 * 100)),
                )
            })
            .collect();
        let metrics = equity_metrics(&curve);
        assert!(metrics.sharpe_ratio > Decimal::ZERO);
    }
}
