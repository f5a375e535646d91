use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Failure kinds a room or profile action can report back to the caller.
///
/// None of these leave partially written state behind: every action validates
/// completely before it mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum GameError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },
    #[error("Room is full")]
    RoomFull,
    #[error("Already in room")]
    AlreadyJoined,
    #[error("Game not in progress")]
    GameNotInProgress,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Must be exactly {expected} digits, got {actual}")]
    InvalidGuessLength { expected: usize, actual: usize },
    #[error("Only the digits 0-9 are allowed")]
    InvalidDigits,
    #[error("Secret number already set")]
    SecretAlreadySet,
    #[error("Turn has not expired yet")]
    TurnNotExpired,
    #[error("Profile already exists")]
    ProfileExists,
}

impl GameError {
    pub fn room_not_found(room_id: &str) -> Self {
        GameError::NotFound {
            resource: format!("Room {room_id}"),
        }
    }

    pub fn profile_not_found() -> Self {
        GameError::NotFound {
            resource: "Profile".to_string(),
        }
    }

    pub fn not_in_room() -> Self {
        GameError::Forbidden {
            reason: "Not in this room".to_string(),
        }
    }

    pub fn wrong_password() -> Self {
        GameError::Forbidden {
            reason: "Incorrect password".to_string(),
        }
    }
}
