//! Read-only portfolio view for sizing decisions.

use rust_decimal::Decimal;

use sirocco_core::data::Position;
use sirocco_core::types::{Amount, Symbol};

/// Read-only view of the portfolio handed to a strategy's sizing call.
///
/// Rebuilt fresh before each call; strategies must never retain it. The
/// borrow of the open-position slice enforces that at compile time.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioView<'a> {
    /// Current equity
    pub equity: Amount,
    /// Starting capital of the run
    pub starting_capital: Amount,
    /// Current cash balance
    pub cash: Amount,
    /// Currently open positions
    pub open_positions: &'a [Position],
    /// Aggregate dollar risk already committed
    pub committed_risk: Amount,
    /// Portfolio-wide risk ceiling as a fraction of equity
    pub max_portfolio_risk_pct: Decimal,
}

impl<'a> PortfolioView<'a> {
    /// Creates a view over the given open positions.
    #[must_use]
    pub fn new(
        equity: Amount,
        starting_capital: Amount,
        cash: Amount,
        open_positions: &'a [Position],
        max_portfolio_risk_pct: Decimal,
    ) -> Self {
        let committed_risk = open_positions
            .iter()
            .map(Position::committed_risk)
            .fold(Amount::ZERO, |acc, r| acc + r);
        Self {
            equity,
            starting_capital,
            cash,
            open_positions,
            committed_risk,
            max_portfolio_risk_pct,
        }
    }

    /// Number of open positions belonging to `strategy`.
    #[must_use]
    pub fn open_for_strategy(&self, strategy: &str) -> usize {
        self.open_positions
            .iter()
            .filter(|p| p.strategy == strategy)
            .count()
    }

    /// Returns true if an open position already exists for the
    /// ticker-strategy pair.
    #[must_use]
    pub fn has_open(&self, symbol: &Symbol, strategy: &str) -> bool {
        self.open_positions
            .iter()
            .any(|p| p.symbol == *symbol && p.strategy == strategy)
    }

    /// Maximum aggregate dollar risk the heat cap allows.
    #[must_use]
    pub fn max_total_risk(&self) -> Amount {
        Amount::new(self.equity.as_decimal() * self.max_portfolio_risk_pct)
    }

    /// Remaining dollar risk available under the heat cap (never
    /// negative).
    #[must_use]
    pub fn risk_headroom(&self) -> Amount {
        let headroom = self.max_total_risk() - self.committed_risk;
        if headroom.is_negative() {
            Amount::ZERO
        } else {
            headroom
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sirocco_core::data::{Direction, LegKind, PositionEntry, PositionId, TradeLeg};
    use sirocco_core::types::{Price, TradeDate};

    fn create_position(id: u64, strategy: &str, symbol: &str) -> Position {
        let expiry = TradeDate::from_ymd(2024, 2, 16).unwrap();
        Position::open(
            PositionId::new(id),
            PositionEntry {
                strategy: strategy.to_string(),
                symbol: Symbol::new(symbol).unwrap(),
                direction: Direction::Long,
                legs: vec![TradeLeg::option(
                    LegKind::ShortPut,
                    Price::new_unchecked(dec!(450)),
                    expiry,
                    Price::new_unchecked(dec!(3.20)),
                )
                .unwrap()],
                entry_is_credit: true,
                entry_value: Price::new_unchecked(dec!(1.75)),
                max_loss_per_unit: Price::new_unchecked(dec!(3.25)),
                max_profit_per_unit: Price::new_unchecked(dec!(1.75)),
                profit_target: dec!(0.5),
                stop_loss_multiple: dec!(2.0),
                contracts: 2,
                entry_date: TradeDate::from_ymd(2024, 1, 15).unwrap(),
                entry_commission: Amount::ZERO,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_view_committed_risk() {
        let positions = vec![
            create_position(1, "credit_spread", "SPY"),
            create_position(2, "iron_condor", "QQQ"),
        ];
        let view = PortfolioView::new(
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            &positions,
            dec!(0.5),
        );
        // Two positions, each 3.25 x 2 x 100 = 650.
        assert_eq!(view.committed_risk.as_decimal(), dec!(1300));
        assert_eq!(view.max_total_risk().as_decimal(), dec!(50000));
        assert_eq!(view.risk_headroom().as_decimal(), dec!(48700));
    }

    #[test]
    fn test_view_strategy_filters() {
        let positions = vec![
            create_position(1, "credit_spread", "SPY"),
            create_position(2, "credit_spread", "QQQ"),
            create_position(3, "momentum", "SPY"),
        ];
        let view = PortfolioView::new(
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            Amount::new(dec!(100000)),
            &positions,
            dec!(0.5),
        );
        assert_eq!(view.open_for_strategy("credit_spread"), 2);
        assert_eq!(view.open_for_strategy("momentum"), 1);
        assert_eq!(view.open_for_strategy("straddle"), 0);
        assert!(view.has_open(&Symbol::new("SPY").unwrap(), "momentum"));
        assert!(!view.has_open(&Symbol::new("QQQ").unwrap(), "momentum"));
    }

    #[test]
    fn test_view_headroom_floor() {
        let positions = vec![create_position(1, "credit_spread", "SPY")];
        let view = PortfolioView::new(
            Amount::new(dec!(1000)),
            Amount::new(dec!(1000)),
            Amount::new(dec!(1000)),
            &positions,
            dec!(0.5),
        );
        // Cap is 500, committed 650: headroom floors at zero.
        assert_eq!(view.risk_headroom(), Amount::ZERO);
    }
}
