//! Scheduled macro economic events.
//!
//! Event calendars are immutable configuration data injected at
//! construction time, never module-level globals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TradeDate;

/// Kind of a scheduled macro event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Federal Open Market Committee rate decision
    Fomc,
    /// Consumer Price Index release
    Cpi,
    /// Earnings announcement
    Earnings,
    /// Monthly options expiration Friday
    OpexFriday,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fomc => write!(f, "fomc"),
            Self::Cpi => write!(f, "cpi"),
            Self::Earnings => write!(f, "earnings"),
            Self::OpexFriday => write!(f, "opex_friday"),
        }
    }
}

/// One scheduled macro event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicEvent {
    /// Event kind
    pub kind: EventKind,
    /// Scheduled date
    pub date: TradeDate,
    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl EconomicEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(kind: EventKind, date: TradeDate, description: impl Into<String>) -> Self {
        Self {
            kind,
            date,
            description: description.into(),
        }
    }
}

impl fmt::Display for EconomicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.kind, self.date)
    }
}
