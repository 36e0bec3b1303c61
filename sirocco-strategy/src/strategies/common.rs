//! Shared building blocks for concrete strategies.

use anyhow::{anyhow, Result};
use chrono::Weekday;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use sirocco_core::data::Position;
use sirocco_core::types::{Amount, TradeDate};
use sirocco_market::MarketSnapshot;
use sirocco_pricing::position_value;

use crate::action::PositionAction;
use crate::context::PortfolioView;
use crate::signal::TradeSignal;

/// Parses lowercase weekday names ("mon".."fri") into `Weekday` values.
pub(crate) fn parse_weekdays(names: &[String]) -> Result<Vec<Weekday>> {
    names
        .iter()
        .map(|name| match name.to_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Mon),
            "tue" | "tuesday" => Ok(Weekday::Tue),
            "wed" | "wednesday" => Ok(Weekday::Wed),
            "thu" | "thursday" => Ok(Weekday::Thu),
            "fri" | "friday" => Ok(Weekday::Fri),
            other => Err(anyhow!("unrecognized weekday: {other}")),
        })
        .collect()
}

/// Returns true if `date` falls on an allowed weekday.
///
/// An empty allow-list permits every day.
pub(crate) fn weekday_allowed(allowed: &[Weekday], date: TradeDate) -> bool {
    allowed.is_empty() || allowed.contains(&date.weekday())
}

/// Marks a position to market using the snapshot's spot and volatility.
///
/// Returns `None` when the snapshot does not cover the position's ticker
/// that day; callers treat this as "hold".
pub(crate) fn mark_value(position: &Position, snapshot: &MarketSnapshot) -> Option<Amount> {
    let spot = snapshot.close_for(&position.symbol)?;
    let vol = snapshot
        .stats_for(&position.symbol)
        .map(|s| s.realized_vol)?;
    Some(position_value(
        &position.legs,
        spot,
        vol,
        snapshot.risk_free_rate,
        snapshot.date,
    ))
}

/// Standard exit evaluation for net-credit structures.
///
/// Order: expiration, profit target, stop loss, terminal time decay,
/// event proximity. A day without data for the ticker holds.
pub(crate) fn manage_credit(
    position: &Position,
    snapshot: &MarketSnapshot,
    time_decay_close_dte: i64,
    close_before_event_within: Option<u32>,
) -> PositionAction {
    let dte = position.days_to_expiration(snapshot.date);
    if let Some(dte) = dte {
        if dte <= 0 {
            return PositionAction::CloseExpiration;
        }
    }

    let Some(value) = mark_value(position, snapshot) else {
        return PositionAction::Hold;
    };

    let credit = position.entry_value.as_decimal();
    // Closing a credit structure costs money: the mark is negative.
    let cost_to_close = (-value.as_decimal()).max(Decimal::ZERO);
    let profit = credit - cost_to_close;

    if profit >= position.profit_target * credit {
        return PositionAction::CloseProfitTarget;
    }
    if cost_to_close >= position.stop_loss_multiple * credit {
        return PositionAction::CloseStopLoss;
    }
    if let Some(dte) = dte {
        if dte <= time_decay_close_dte && profit > Decimal::ZERO {
            return PositionAction::CloseTimeDecay;
        }
    }
    if let Some(days) = close_before_event_within {
        if snapshot.has_event_within(days) {
            return PositionAction::CloseEvent;
        }
    }
    PositionAction::Hold
}

/// Standard exit evaluation for net-debit structures.
///
/// The stop multiple is interpreted as the tolerated loss fraction of the
/// debit paid (e.g. `0.5` stops out after losing half the debit).
pub(crate) fn manage_debit(
    position: &Position,
    snapshot: &MarketSnapshot,
    time_decay_close_dte: i64,
) -> PositionAction {
    let dte = position.days_to_expiration(snapshot.date);
    if let Some(dte) = dte {
        if dte <= 0 {
            return PositionAction::CloseExpiration;
        }
    }

    let Some(value) = mark_value(position, snapshot) else {
        return PositionAction::Hold;
    };

    let debit = position.entry_value.as_decimal();
    let marked = value.as_decimal().max(Decimal::ZERO);
    let profit = marked - debit;

    if profit >= position.profit_target * position.max_profit_per_unit.as_decimal() {
        return PositionAction::CloseProfitTarget;
    }
    if debit - marked >= position.stop_loss_multiple * debit {
        return PositionAction::CloseStopLoss;
    }
    if let Some(dte) = dte {
        if dte <= time_decay_close_dte {
            return PositionAction::CloseTimeDecay;
        }
    }
    PositionAction::Hold
}

/// Sizes a signal from a per-strategy risk budget, shrunk to fit the
/// portfolio-wide heat cap.
///
/// Returns 0 when even a single contract does not fit.
pub(crate) fn size_by_risk_budget(
    signal: &TradeSignal,
    portfolio: &PortfolioView<'_>,
    risk_budget: Decimal,
) -> u32 {
    let risk_per_contract = signal.unit_risk();
    if risk_per_contract <= Decimal::ZERO {
        return 0;
    }

    let budget = portfolio.equity.as_decimal() * risk_budget;
    let by_budget = (budget / risk_per_contract).floor();
    let by_headroom = (portfolio.risk_headroom().as_decimal() / risk_per_contract).floor();

    by_budget.min(by_headroom).to_u32().unwrap_or(0)
}
