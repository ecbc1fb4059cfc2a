//! Countdown to the server-declared expiry of an access code.
//!
//! All arithmetic is done on absolute epoch milliseconds, so the result never
//! depends on the local timezone. The remaining time is always recomputed
//! from the expiry instant; ticks are only a prompt to look at the clock.

use chrono::{DateTime, Utc};

/// Whole seconds left until `expires_at`, floored and clamped at zero
pub fn remaining_secs(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = expires_at.timestamp_millis() - now.timestamp_millis();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}

/// `m:ss` rendering of a second count
pub fn format_mm_ss(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Remaining(u64),
    /// Reported once per code, on the first tick that reaches zero
    Expired,
    /// Paused, cleared, or already expired
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct Countdown {
    expires_at: Option<DateTime<Utc>>,
    remaining: u64,
    paused: bool,
    expiry_reported: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting towards a new expiry
    pub fn reset(&mut self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        self.expires_at = Some(expires_at);
        self.expiry_reported = false;
        self.paused = false;
        self.remaining = remaining_secs(expires_at, now);
        self.remaining
    }

    /// Forgets the current code
    pub fn clear(&mut self) {
        self.expires_at = None;
        self.remaining = 0;
        self.expiry_reported = false;
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        let Some(expires_at) = self.expires_at else {
            return Tick::Idle;
        };
        if self.paused || self.expiry_reported {
            return Tick::Idle;
        }

        self.remaining = remaining_secs(expires_at, now);
        if self.remaining == 0 {
            self.expiry_reported = true;
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining)
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Leaves the paused state and recomputes from the wall clock
    pub fn resume(&mut self, now: DateTime<Utc>) -> Tick {
        self.paused = false;
        self.tick(now)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}
