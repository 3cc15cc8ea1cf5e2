//! Per-card and per-session timing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Start timestamps for the session and the card currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClock {
    session_started_at: Option<DateTime<Utc>>,
    card_started_at: Option<DateTime<Utc>>,
}

impl SessionClock {
    /// Stamp both the session and the first card.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.session_started_at = Some(now);
        self.card_started_at = Some(now);
    }

    /// Stamp the start of the next card.
    pub fn next_card(&mut self, now: DateTime<Utc>) {
        self.card_started_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.session_started_at = None;
        self.card_started_at = None;
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    pub fn card_started_at(&self) -> Option<DateTime<Utc>> {
        self.card_started_at
    }

    /// Whole seconds spent on the current card, never negative.
    pub fn card_elapsed_secs(&self, now: DateTime<Utc>) -> u32 {
        whole_seconds_since(self.card_started_at, now)
    }

    /// Whole seconds since the session started, never negative.
    pub fn session_elapsed_secs(&self, now: DateTime<Utc>) -> u32 {
        whole_seconds_since(self.session_started_at, now)
    }
}

fn whole_seconds_since(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    match start {
        Some(start) => (now - start).num_seconds().clamp(0, u32::MAX as i64) as u32,
        None => 0,
    }
}
