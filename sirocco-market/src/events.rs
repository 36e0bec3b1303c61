//! Immutable economic event calendar.
//!
//! The calendar is injected at construction time and never mutated; it is
//! configuration data, not global state.

use serde::{Deserialize, Serialize};

use sirocco_core::data::{EconomicEvent, EventKind};
use sirocco_core::types::TradeDate;

/// Queryable calendar of scheduled macro events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCalendar {
    events: Vec<EconomicEvent>,
}

impl EventCalendar {
    /// Creates a calendar from a list of events.
    ///
    /// Events are sorted by date (ties by kind order of insertion).
    #[must_use]
    pub fn new(mut events: Vec<EconomicEvent>) -> Self {
        events.sort_by_key(|e| e.date);
        Self { events }
    }

    /// Creates an empty calendar.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns all events, sorted by date.
    #[must_use]
    pub fn events(&self) -> &[EconomicEvent] {
        &self.events
    }

    /// Returns the events scheduled within `days` calendar days at or
    /// after `date` (inclusive on both ends).
    #[must_use]
    pub fn events_within(&self, date: TradeDate, days: u32) -> Vec<EconomicEvent> {
        self.events
            .iter()
            .filter(|e| {
                let distance = date.days_until(e.date);
                distance >= 0 && distance <= i64::from(days)
            })
            .cloned()
            .collect()
    }

    /// Returns true if any event of `kind` falls within `days` calendar
    /// days at or after `date`.
    #[must_use]
    pub fn has_event_of_kind_within(&self, kind: EventKind, date: TradeDate, days: u32) -> bool {
        self.events_within(date, days)
            .iter()
            .any(|e| e.kind == kind)
    }
}
