use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{RoomId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub profile_picture: Option<String>,
    pub level: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_games: u32,
    pub accuracy: f64, // percentage, 0-100
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        id: UserId,
        email: String,
        full_name: String,
        profile_picture: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            full_name,
            profile_picture,
            level: 1,
            wins: 0,
            losses: 0,
            total_games: 0,
            accuracy: 0.0,
            created_at,
        }
    }

    pub fn stats(&self) -> UserStats {
        UserStats {
            wins: self.wins,
            losses: self.losses,
            total_games: self.total_games,
            accuracy: self.accuracy,
            level: self.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStats {
    pub wins: u32,
    pub losses: u32,
    pub total_games: u32,
    pub accuracy: f64,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MatchOutcome {
    Win,
    Loss,
}

/// One entry of a user's match log. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameHistoryRecord {
    pub id: Uuid,
    pub room_id: RoomId,
    pub opponent_id: UserId,
    pub opponent_name: String,
    pub result: MatchOutcome,
    pub rounds: u32,
    pub timestamp: DateTime<Utc>,
}
