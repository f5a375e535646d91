use chrono::{DateTime, TimeDelta, Utc};
use duel_types::{Room, RoomId, RoomStatus};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepReason {
    IdleWaiting,
    IdlePlaying,
    Finished,
}

impl fmt::Display for SweepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepReason::IdleWaiting => write!(f, "waiting room inactive"),
            SweepReason::IdlePlaying => write!(f, "playing room inactive"),
            SweepReason::Finished => write!(f, "finished match expired"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cleaned_room_ids: Vec<RoomId>,
}

impl SweepReport {
    pub fn cleaned_count(&self) -> usize {
        self.cleaned_room_ids.len()
    }
}

/// Inactivity thresholds per room status.
#[derive(Debug, Clone, Copy)]
pub struct RoomSweeper {
    pub waiting_ttl: TimeDelta,  // 5 minutes since last activity
    pub playing_ttl: TimeDelta,  // 10 minutes since last activity
    pub finished_ttl: TimeDelta, // 30 seconds after the winning guess
}

impl Default for RoomSweeper {
    fn default() -> Self {
        Self {
            waiting_ttl: TimeDelta::minutes(5),
            playing_ttl: TimeDelta::minutes(10),
            finished_ttl: TimeDelta::seconds(30),
        }
    }
}

impl RoomSweeper {
    pub fn new(waiting_ttl: Duration, playing_ttl: Duration, finished_ttl: Duration) -> Self {
        let defaults = Self::default();
        Self {
            waiting_ttl: TimeDelta::from_std(waiting_ttl).unwrap_or(defaults.waiting_ttl),
            playing_ttl: TimeDelta::from_std(playing_ttl).unwrap_or(defaults.playing_ttl),
            finished_ttl: TimeDelta::from_std(finished_ttl).unwrap_or(defaults.finished_ttl),
        }
    }

    /// Why `room` should be deleted at `now`, if it should.
    pub fn verdict(&self, room: &Room, now: DateTime<Utc>) -> Option<SweepReason> {
        let idle = now - room.last_activity;

        match room.status {
            RoomStatus::Waiting if idle > self.waiting_ttl => Some(SweepReason::IdleWaiting),
            RoomStatus::Playing if idle > self.playing_ttl => Some(SweepReason::IdlePlaying),
            RoomStatus::Finished => room
                .finished_at
                .filter(|finished_at| now - *finished_at > self.finished_ttl)
                .map(|_| SweepReason::Finished),
            _ => None,
        }
    }

    /// Select the rooms to delete out of `rooms`, preserving input order.
    pub fn plan<'a>(
        &self,
        rooms: impl IntoIterator<Item = &'a Room>,
        now: DateTime<Utc>,
    ) -> Vec<(RoomId, SweepReason)> {
        rooms
            .into_iter()
            .filter_map(|room| self.verdict(room, now).map(|reason| (room.id.clone(), reason)))
            .collect()
    }
}
