use chrono::{DateTime, TimeDelta, Utc};
use duel_types::{Room, RoomStatus};
use std::time::Duration;

pub const DEFAULT_TURN_SECONDS: u64 = 30;

/// Bounds of the active player's decision window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnWindow {
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Deadline arithmetic for turns. Evaluated on demand; it owns no timers.
#[derive(Debug, Clone, Copy)]
pub struct TurnClock {
    window: TimeDelta,
}

impl Default for TurnClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TURN_SECONDS))
    }
}

impl TurnClock {
    pub fn new(window: Duration) -> Self {
        let window = TimeDelta::from_std(window)
            .unwrap_or_else(|_| TimeDelta::seconds(DEFAULT_TURN_SECONDS as i64));
        Self { window }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn open(&self, now: DateTime<Utc>) -> TurnWindow {
        TurnWindow {
            started_at: now,
            deadline: now + self.window,
        }
    }

    pub fn is_expired(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= deadline
    }

    pub fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
        (deadline - now).max(TimeDelta::zero())
    }

    /// Time left for the player on turn, or `None` when no turn is running.
    pub fn remaining_for(room: &Room, now: DateTime<Utc>) -> Option<TimeDelta> {
        if room.status != RoomStatus::Playing {
            return None;
        }
        room.turn_deadline
            .map(|deadline| Self::remaining(deadline, now))
    }
}
