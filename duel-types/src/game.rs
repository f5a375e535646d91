use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{RoomId, UserId};

pub const MIN_DIGIT_COUNT: usize = 3;
pub const MAX_DIGIT_COUNT: usize = 8;
pub const DEFAULT_DIGIT_COUNT: usize = 4;
pub const MAX_PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoomStatus {
    Waiting,  // Players joining, readying up and choosing secrets
    Playing,  // Both secrets set, turns alternating
    Finished, // Someone cracked the opponent's secret
}

/// Score of one guess against a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Feedback {
    pub correct_position: u32,
    pub correct_digit: u32,
}

impl Feedback {
    pub fn is_solved(&self, digit_count: usize) -> bool {
        self.correct_position as usize == digit_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuessResult {
    pub guess: String,
    pub correct_position: u32,
    pub correct_digit: u32,
    pub timestamp: DateTime<Utc>,
}

impl GuessResult {
    pub fn new(guess: String, feedback: Feedback, timestamp: DateTime<Utc>) -> Self {
        Self {
            guess,
            correct_position: feedback.correct_position,
            correct_digit: feedback.correct_digit,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Player {
    pub id: UserId,
    pub full_name: String,
    pub profile_picture: Option<String>,
    pub ready: bool,
    pub secret_number: Option<String>,
    pub guesses: Vec<GuessResult>,
}

impl Player {
    pub fn new(id: UserId, full_name: String, profile_picture: Option<String>) -> Self {
        Self {
            id,
            full_name,
            profile_picture,
            ready: false,
            secret_number: None,
            guesses: Vec::new(),
        }
    }
}

/// Authoritative record of one match session.
///
/// `players` is ordered by join order and the index doubles as the turn slot.
/// `password` holds a digest, never the plain text the owner typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub password: Option<String>,
    pub is_public: bool,
    pub created_by: UserId,
    pub digit_count: usize,
    pub players: Vec<Player>,
    pub status: RoomStatus,
    pub current_turn: usize,
    pub round: u32,
    pub turn_start_time: Option<DateTime<Utc>>,
    pub turn_deadline: Option<DateTime<Utc>>,
    pub winner: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn player_index(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.id == user_id)
    }

    pub fn has_player(&self, user_id: UserId) -> bool {
        self.player_index(user_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Project this room into its public-listing entry.
    pub fn summary(&self, owner_name: &str) -> PublicRoomSummary {
        PublicRoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            player_count: self.players.len(),
            created_by: owner_name.to_string(),
            digit_count: self.digit_count,
        }
    }
}

/// Denormalized listing entry. The room record stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublicRoomSummary {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub created_by: String,
    pub digit_count: usize,
}

/// Player as seen by a particular viewer: the secret only shows up for its
/// owner, or for everyone once the match is over.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerView {
    pub id: UserId,
    pub full_name: String,
    pub profile_picture: Option<String>,
    pub ready: bool,
    pub has_secret: bool,
    pub secret_number: Option<String>,
    pub guesses: Vec<GuessResult>,
}

/// Room state safe to hand to clients: no password digest, no opponent secret.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomView {
    pub id: RoomId,
    pub name: String,
    pub has_password: bool,
    pub is_public: bool,
    pub created_by: UserId,
    pub digit_count: usize,
    pub players: Vec<PlayerView>,
    pub status: RoomStatus,
    pub current_turn: usize,
    pub round: u32,
    pub turn_start_time: Option<DateTime<Utc>>,
    pub turn_deadline: Option<DateTime<Utc>>,
    pub turn_remaining_ms: Option<i64>,
    pub winner: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl RoomView {
    pub fn for_viewer(room: &Room, viewer: Option<UserId>, turn_remaining_ms: Option<i64>) -> Self {
        let reveal_all = room.status == RoomStatus::Finished;

        let players = room
            .players
            .iter()
            .map(|player| {
                let reveal = reveal_all || viewer == Some(player.id);
                PlayerView {
                    id: player.id,
                    full_name: player.full_name.clone(),
                    profile_picture: player.profile_picture.clone(),
                    ready: player.ready,
                    has_secret: player.secret_number.is_some(),
                    secret_number: if reveal {
                        player.secret_number.clone()
                    } else {
                        None
                    },
                    guesses: player.guesses.clone(),
                }
            })
            .collect();

        RoomView {
            id: room.id.clone(),
            name: room.name.clone(),
            has_password: room.has_password(),
            is_public: room.is_public,
            created_by: room.created_by,
            digit_count: room.digit_count,
            players,
            status: room.status,
            current_turn: room.current_turn,
            round: room.round,
            turn_start_time: room.turn_start_time,
            turn_deadline: room.turn_deadline,
            turn_remaining_ms,
            winner: room.winner,
            created_at: room.created_at,
            started_at: room.started_at,
            finished_at: room.finished_at,
            last_activity: room.last_activity,
        }
    }
}
