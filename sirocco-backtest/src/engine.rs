//! Portfolio simulation loop.
//!
//! The engine replays trading days in strict chronological order. Each
//! day: build the market snapshot, evaluate exits for every open
//! position, close flagged positions, collect and rank fresh signals,
//! admit them under capital/slot/heat constraints, and record end-of-day
//! equity. After the final date every surviving position is force-closed
//! at intrinsic settlement.
//!
//! The engine is the sole owner of all mutable run state (open and
//! closed position arenas, cash, equity curve); strategies only ever see
//! read-only views and cannot retain them across days.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use sirocco_core::config::{ConfigError, SimulationConfig};
use sirocco_core::data::{
    ExitReason, Position, PositionEntry, PositionId, CONTRACT_MULTIPLIER,
};
use sirocco_core::types::{Amount, Price, Symbol, TradeDate};
use sirocco_market::indicators::clip_volatility;
use sirocco_market::snapshot::DEFAULT_VIX;
use sirocco_market::{EventCalendar, MarketData, MarketSnapshot, SnapshotBuilder, SnapshotConfig};
use sirocco_pricing::{intrinsic_settlement, position_value};
use sirocco_strategy::{PortfolioView, Strategy, TradeSignal};

use crate::error::BacktestError;
use crate::metrics::{compute_metrics, equity_metrics};
use crate::report::{BacktestReport, EquityPoint, TradeLogEntry};

/// Gross per-unit P&L given the entry economics and the per-unit value
/// realized at close.
///
/// Credit entries: profit is the credit received plus the (typically
/// negative) value of buying the structure back. Debit entries: profit
/// is the value realized minus the debit paid.
pub(crate) fn gross_pnl_per_unit(
    entry_is_credit: bool,
    entry_value: Decimal,
    close_value: Decimal,
) -> Decimal {
    if entry_is_credit {
        entry_value + close_value
    } else {
        close_value - entry_value
    }
}

/// Multi-strategy portfolio simulation engine.
pub struct SimulationEngine {
    config: SimulationConfig,
    builder: SnapshotBuilder,
    strategies: Vec<Box<dyn Strategy>>,
    cash: Amount,
    open_positions: Vec<Position>,
    closed_positions: Vec<Position>,
    equity_curve: Vec<(TradeDate, Amount)>,
    last_closes: BTreeMap<Symbol, Price>,
    next_position_id: u64,
}

impl SimulationEngine {
    /// Creates a new engine.
    ///
    /// Market data is restricted to the configured tickers; strategy
    /// names must be unique because positions are keyed back to their
    /// strategy by name.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, duplicate strategy
    /// names, or unusable market data.
    pub fn new(
        config: SimulationConfig,
        mut data: MarketData,
        calendar: EventCalendar,
        strategies: Vec<Box<dyn Strategy>>,
    ) -> Result<Self, BacktestError> {
        config.validate()?;

        if strategies.is_empty() {
            return Err(
                ConfigError::Validation("at least one strategy is required".to_string()).into(),
            );
        }
        for (i, strategy) in strategies.iter().enumerate() {
            if strategies[..i].iter().any(|s| s.name() == strategy.name()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate strategy name: {}",
                    strategy.name()
                ))
                .into());
            }
        }

        data.bars.retain(|symbol, _| config.tickers.contains(symbol));
        if data.bars.values().all(Vec::is_empty) {
            // Every requested ticker is absent: nothing to simulate.
            return Err(sirocco_market::MarketError::NoData.into());
        }

        let snapshot_config = SnapshotConfig {
            benchmark: config.tickers.first().cloned(),
            risk_free_rate: config.risk_free_rate,
            ..SnapshotConfig::default()
        };
        let builder = SnapshotBuilder::new(data, calendar, snapshot_config)?;

        Ok(Self {
            cash: config.starting_capital,
            config,
            builder,
            strategies,
            open_positions: Vec::new(),
            closed_positions: Vec::new(),
            equity_curve: Vec::new(),
            last_closes: BTreeMap::new(),
            next_position_id: 1,
        })
    }

    /// Runs the full simulation and returns the structured report.
    ///
    /// # Errors
    ///
    /// Only structural invariant violations and missing settlement
    /// prices abort a run; per-day data gaps and per-strategy failures
    /// are absorbed by the loop.
    pub fn run(&mut self) -> Result<BacktestReport, BacktestError> {
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            strategies = self.strategies.len(),
            "starting backtest"
        );

        let mut date = self.config.start_date;
        while date <= self.config.end_date {
            if date.is_weekday() {
                self.step(date)?;
            }
            date = date.succ();
        }

        self.force_close_remaining(self.config.end_date)?;

        let report = self.build_report();
        info!(
            trades = report.combined.total_trades,
            net_pnl = %report.net_pnl(),
            "backtest complete"
        );
        Ok(report)
    }

    /// Processes one trading day.
    fn step(&mut self, date: TradeDate) -> Result<(), BacktestError> {
        let snapshot = self.builder.build(date);
        if snapshot.is_empty() {
            debug!(%date, "no ticker data yet; day skipped");
            return Ok(());
        }

        for symbol in snapshot.tickers() {
            if let Some(close) = snapshot.close_for(symbol) {
                self.last_closes.insert(symbol.clone(), close);
            }
        }

        // Exit phase: every strategy sees every one of its open positions
        // before any new entry is considered.
        let mut flagged = Vec::new();
        for strategy in &self.strategies {
            for position in self
                .open_positions
                .iter()
                .filter(|p| p.strategy == strategy.name())
            {
                let action = strategy.manage_position(position, &snapshot);
                if let Some(reason) = action.to_exit_reason() {
                    flagged.push((position.id, reason));
                }
            }
        }
        for (id, reason) in flagged {
            self.close_position(id, reason, date, Some(&snapshot))?;
        }

        // Entry phase: pool signals from all strategies, rank by score.
        let mut pooled: Vec<TradeSignal> = Vec::new();
        for strategy in &self.strategies {
            match strategy.generate_signals(&snapshot) {
                Ok(signals) => {
                    for mut signal in signals {
                        signal.signal_date = Some(date);
                        pooled.push(signal);
                    }
                }
                Err(error) => {
                    // One broken strategy must not halt the backtest.
                    warn!(strategy = strategy.name(), %error, %date,
                        "signal generation failed; treated as no signals");
                }
            }
        }
        // Stable sort: ties keep strategy-registration encounter order.
        pooled.sort_by(|a, b| b.score.cmp(&a.score));

        for signal in pooled {
            self.try_admit(signal, date)?;
        }

        // End-of-day equity is the cash balance; open positions are not
        // marked to market for the curve.
        self.equity_curve.push((date, self.cash));
        Ok(())
    }

    /// Admission control for one pooled signal.
    ///
    /// Checks run in order: global slot cap, per-strategy slot cap, heat
    /// cap, duplicate ticker+strategy. A failing check skips the signal
    /// without blocking the rest of the queue.
    fn try_admit(&mut self, signal: TradeSignal, date: TradeDate) -> Result<(), BacktestError> {
        if signal.validate().is_err() {
            warn!(%signal, "economically invalid signal dropped");
            return Ok(());
        }

        if self.open_positions.len() >= self.config.max_positions as usize {
            debug!(%signal, "skipped: global position cap reached");
            return Ok(());
        }

        let strategy_open = self
            .open_positions
            .iter()
            .filter(|p| p.strategy == signal.strategy)
            .count();
        if strategy_open >= self.config.max_positions_per_strategy as usize {
            debug!(%signal, "skipped: per-strategy position cap reached");
            return Ok(());
        }

        let committed: Decimal = self
            .open_positions
            .iter()
            .map(|p| p.committed_risk().as_decimal())
            .sum();
        let heat_cap = self.cash.as_decimal() * self.config.max_portfolio_risk_pct;
        if committed + signal.unit_risk() > heat_cap {
            debug!(%signal, "skipped: portfolio heat cap reached");
            return Ok(());
        }

        if self
            .open_positions
            .iter()
            .any(|p| p.symbol == signal.symbol && p.strategy == signal.strategy)
        {
            debug!(%signal, "skipped: duplicate ticker for strategy");
            return Ok(());
        }

        let contracts = {
            let Some(strategy) = self
                .strategies
                .iter()
                .find(|s| s.name() == signal.strategy)
            else {
                warn!(%signal, "signal from unregistered strategy dropped");
                return Ok(());
            };
            let view = PortfolioView::new(
                self.cash,
                self.config.starting_capital,
                self.cash,
                &self.open_positions,
                self.config.max_portfolio_risk_pct,
            );
            strategy.size_position(&signal, &view)
        };
        if contracts == 0 {
            debug!(%signal, "skipped: sized to zero contracts");
            return Ok(());
        }

        let entry_commission = self.leg_commission(signal.legs.len(), contracts);
        let position = Position::open(
            PositionId::new(self.next_position_id),
            PositionEntry {
                strategy: signal.strategy,
                symbol: signal.symbol,
                direction: signal.direction,
                legs: signal.legs,
                entry_is_credit: signal.entry_is_credit,
                entry_value: signal.entry_value,
                max_loss_per_unit: signal.max_loss_per_unit,
                max_profit_per_unit: signal.max_profit_per_unit,
                profit_target: signal.profit_target,
                stop_loss_multiple: signal.stop_loss_multiple,
                contracts,
                entry_date: date,
                entry_commission,
            },
        )?;
        self.next_position_id += 1;

        // Entry charges commission only; P&L settles entirely at close.
        self.cash -= entry_commission;
        info!(
            id = %position.id,
            strategy = %position.strategy,
            symbol = %position.symbol,
            contracts,
            entry = %position.entry_value,
            "position opened"
        );
        self.open_positions.push(position);
        Ok(())
    }

    /// Closes one open position and realizes its P&L.
    ///
    /// Expiration and end-of-backtest closes settle at piecewise
    /// intrinsic value; every other exit marks to market (with slippage)
    /// through the valuation engine.
    fn close_position(
        &mut self,
        id: PositionId,
        reason: ExitReason,
        date: TradeDate,
        snapshot: Option<&MarketSnapshot>,
    ) -> Result<(), BacktestError> {
        let index = self
            .open_positions
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| {
                BacktestError::StateCorruption(format!("position {id} not in the open set"))
            })?;
        let mut position = self.open_positions.remove(index);

        let spot = snapshot
            .and_then(|s| s.close_for(&position.symbol))
            .or_else(|| self.last_closes.get(&position.symbol).copied())
            .ok_or(BacktestError::NoSettlementPrice(id))?;

        let settles_intrinsic = matches!(reason, ExitReason::Expiration | ExitReason::EndOfBacktest);
        let close_value = if settles_intrinsic {
            intrinsic_settlement(&position.legs, spot).as_decimal()
        } else {
            let vol = snapshot
                .and_then(|s| s.stats_for(&position.symbol))
                .map_or_else(
                    || clip_volatility(snapshot.map_or(DEFAULT_VIX, |s| s.vix) / dec!(100)),
                    |stats| stats.realized_vol,
                );
            let marked =
                position_value(&position.legs, spot, vol, self.config.risk_free_rate, date)
                    .as_decimal();
            // Slippage always worsens the closing transaction.
            marked - marked.abs() * self.config.slippage
        };

        let per_unit = gross_pnl_per_unit(
            position.entry_is_credit,
            position.entry_value.as_decimal(),
            close_value,
        );
        let gross = Amount::new(per_unit * Decimal::from(position.contracts) * CONTRACT_MULTIPLIER);

        let exit_commission = self.leg_commission(position.leg_count(), position.contracts);
        let realized = gross - exit_commission - position.commission_paid;

        position.close(date, reason, realized, exit_commission)?;
        self.cash += gross - exit_commission;

        info!(
            id = %position.id,
            strategy = %position.strategy,
            symbol = %position.symbol,
            %reason,
            pnl = %realized,
            "position closed"
        );
        self.closed_positions.push(position);
        Ok(())
    }

    /// Force-closes every still-open position at intrinsic settlement as
    /// if it had expired on the final date.
    fn force_close_remaining(&mut self, date: TradeDate) -> Result<(), BacktestError> {
        let remaining: Vec<PositionId> = self.open_positions.iter().map(|p| p.id).collect();
        for id in remaining {
            self.close_position(id, ExitReason::EndOfBacktest, date, None)?;
        }
        Ok(())
    }

    fn leg_commission(&self, legs: usize, contracts: u32) -> Amount {
        Amount::new(
            self.config.commission_per_leg.as_decimal()
                * Decimal::from(legs as u64)
                * Decimal::from(contracts),
        )
    }

    fn build_report(&self) -> BacktestReport {
        let combined = compute_metrics(&self.closed_positions);
        let equity = equity_metrics(&self.equity_curve);

        let mut per_strategy = BTreeMap::new();
        for strategy in &self.strategies {
            let closed: Vec<Position> = self
                .closed_positions
                .iter()
                .filter(|p| p.strategy == strategy.name())
                .cloned()
                .collect();
            per_strategy.insert(strategy.name().to_string(), compute_metrics(&closed));
        }

        let trades = self
            .closed_positions
            .iter()
            .filter_map(|position| {
                let closed = position.closed()?;
                let risk = position.committed_risk().as_decimal();
                let return_pct = if risk.is_zero() {
                    Decimal::ZERO
                } else {
                    closed.realized_pnl.as_decimal() / risk * dec!(100)
                };
                Some(TradeLogEntry {
                    id: position.id,
                    strategy: position.strategy.clone(),
                    symbol: position.symbol.clone(),
                    direction: position.direction,
                    entry_date: position.entry_date,
                    exit_date: closed.exit_date,
                    exit_reason: closed.exit_reason,
                    entry_is_credit: position.entry_is_credit,
                    entry_value: position.entry_value,
                    contracts: position.contracts,
                    pnl: closed.realized_pnl,
                    return_pct,
                    commission: position.commission_paid,
                    legs: position.legs.clone(),
                })
            })
            .collect();

        let total_commission = self
            .closed_positions
            .iter()
            .map(|p| p.commission_paid)
            .fold(Amount::ZERO, |acc, c| acc + c);

        BacktestReport {
            starting_capital: self.config.starting_capital,
            ending_cash: self.cash,
            total_commission,
            yearly_pnl: combined.yearly_pnl.clone(),
            combined,
            equity,
            per_strategy,
            trades,
            equity_curve: self
                .equity_curve
                .iter()
                .map(|&(date, equity)| EquityPoint { date, equity })
                .collect(),
        }
    }

    /// Current cash balance.
    #[must_use]
    pub fn cash(&self) -> Amount {
        self.cash
    }

    /// Currently open positions.
    #[must_use]
    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    /// Closed positions, in close order.
    #[must_use]
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed_positions
    }
}
