//! Position legs: option and underlying components of a trade.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Price, TradeDate};

use super::DataValidationError;

/// Directional bias of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Profits when the underlying rises
    Long,
    /// Profits when the underlying falls
    Short,
    /// Profits when the underlying stays in a range
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Kind of a single position leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    /// Bought call option
    LongCall,
    /// Sold call option
    ShortCall,
    /// Bought put option
    LongPut,
    /// Sold put option
    ShortPut,
    /// Bought shares of the underlying
    LongUnderlying,
    /// Sold-short shares of the underlying
    ShortUnderlying,
}

impl LegKind {
    /// Returns true for option legs (call or put).
    #[must_use]
    pub const fn is_option(&self) -> bool {
        !matches!(self, Self::LongUnderlying | Self::ShortUnderlying)
    }

    /// Returns true for call legs.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::LongCall | Self::ShortCall)
    }

    /// Returns true for put legs.
    #[must_use]
    pub const fn is_put(&self) -> bool {
        matches!(self, Self::LongPut | Self::ShortPut)
    }

    /// Returns true for legs held long (bought).
    #[must_use]
    pub const fn is_long(&self) -> bool {
        matches!(self, Self::LongCall | Self::LongPut | Self::LongUnderlying)
    }

    /// Returns +1 for long legs and -1 for short legs.
    #[must_use]
    pub fn sign(&self) -> Decimal {
        if self.is_long() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        }
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongCall => write!(f, "long_call"),
            Self::ShortCall => write!(f, "short_call"),
            Self::LongPut => write!(f, "long_put"),
            Self::ShortPut => write!(f, "short_put"),
            Self::LongUnderlying => write!(f, "long_underlying"),
            Self::ShortUnderlying => write!(f, "short_underlying"),
        }
    }
}

/// One leg of a (possibly multi-leg) position.
///
/// Immutable once created. The strike is meaningless for underlying legs
/// and is stored as zero there; the expiration of an underlying leg is a
/// far-dated placeholder that never triggers expiration handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLeg {
    /// Leg kind
    pub kind: LegKind,
    /// Strike price (zero for underlying legs)
    pub strike: Price,
    /// Expiration date
    pub expiration: TradeDate,
    /// Per-unit entry price
    pub entry_price: Price,
}

impl TradeLeg {
    /// Creates an option leg.
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is an underlying kind or the strike is zero.
    pub fn option(
        kind: LegKind,
        strike: Price,
        expiration: TradeDate,
        entry_price: Price,
    ) -> Result<Self, DataValidationError> {
        if !kind.is_option() {
            return Err(DataValidationError::InvalidLeg(format!(
                "{kind} is not an option leg"
            )));
        }
        if strike.is_zero() {
            return Err(DataValidationError::InvalidLeg(
                "option leg requires a non-zero strike".to_string(),
            ));
        }
        Ok(Self {
            kind,
            strike,
            expiration,
            entry_price,
        })
    }

    /// Creates an underlying (share) leg.
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is an option kind.
    pub fn underlying(
        kind: LegKind,
        expiration: TradeDate,
        entry_price: Price,
    ) -> Result<Self, DataValidationError> {
        if kind.is_option() {
            return Err(DataValidationError::InvalidLeg(format!(
                "{kind} is not an underlying leg"
            )));
        }
        Ok(Self {
            kind,
            strike: Price::ZERO,
            expiration,
            entry_price,
        })
    }

    /// Returns true if the leg has expired as of `date`.
    ///
    /// Underlying legs never expire.
    #[must_use]
    pub fn is_expired(&self, date: TradeDate) -> bool {
        self.kind.is_option() && date >= self.expiration
    }
}
