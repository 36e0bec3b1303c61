//! Structured backtest results.
//!
//! The [`BacktestReport`] is the sole interface handed to the external
//! optimizer/validation collaborator and to any reporting layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sirocco_core::data::{Direction, ExitReason, PositionId, TradeLeg};
use sirocco_core::types::{Amount, Price, Symbol, TradeDate};

use crate::metrics::{EquityMetrics, PerformanceStats};

/// One point of the daily equity curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Trading date
    pub date: TradeDate,
    /// End-of-day equity (cash balance)
    pub equity: Amount,
}

/// One closed trade in the per-trade log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    /// Position identifier
    pub id: PositionId,
    /// Originating strategy
    pub strategy: String,
    /// Underlying ticker
    pub symbol: Symbol,
    /// Directional bias
    pub direction: Direction,
    /// Entry date
    pub entry_date: TradeDate,
    /// Exit date
    pub exit_date: TradeDate,
    /// Why the trade was closed
    pub exit_reason: ExitReason,
    /// True if entered for a net credit
    pub entry_is_credit: bool,
    /// Net credit or debit per unit at entry
    pub entry_value: Price,
    /// Contract count
    pub contracts: u32,
    /// Realized P&L, net of commissions
    pub pnl: Amount,
    /// P&L as a percentage of the dollar risk committed
    pub return_pct: Decimal,
    /// Total commission charged
    pub commission: Amount,
    /// Position legs
    pub legs: Vec<TradeLeg>,
}

/// Structured results of one backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Capital at the start of the run
    pub starting_capital: Amount,
    /// Cash at the end of the run (all positions force-closed)
    pub ending_cash: Amount,
    /// Total commission paid across all trades
    pub total_commission: Amount,
    /// Combined trade statistics
    pub combined: PerformanceStats,
    /// Equity-curve metrics
    pub equity: EquityMetrics,
    /// Trade statistics per strategy
    pub per_strategy: BTreeMap<String, PerformanceStats>,
    /// Chronological per-trade log
    pub trades: Vec<TradeLogEntry>,
    /// P&L keyed by exit year
    pub yearly_pnl: BTreeMap<i32, Amount>,
    /// Daily equity curve
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    /// Net P&L of the whole run.
    #[must_use]
    pub fn net_pnl(&self) -> Amount {
        self.ending_cash - self.starting_capital
    }

    /// Total return as a fraction of starting capital.
    #[must_use]
    pub fn total_return(&self) -> Decimal {
        if self.starting_capital.is_zero() {
            return Decimal::ZERO;
        }
        self.net_pnl().as_decimal() / self.starting_capital.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_totals() {
        let report = BacktestReport {
            starting_capital: Amount::new(dec!(100000)),
            ending_cash: Amount::new(dec!(105000)),
            total_commission: Amount::new(dec!(120)),
            combined: PerformanceStats::default(),
            equity: EquityMetrics::default(),
            per_strategy: BTreeMap::new(),
            trades: Vec::new(),
            yearly_pnl: BTreeMap::new(),
            equity_curve: Vec::new(),
        };
        assert_eq!(report.net_pnl().as_decimal(), dec!(5000));
        assert_eq!(report.total_return(), dec!(0.05));
    }
}
