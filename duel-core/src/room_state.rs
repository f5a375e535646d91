use chrono::{DateTime, Utc};
use duel_types::{
    DEFAULT_DIGIT_COUNT, GameError, GuessResult, MAX_DIGIT_COUNT, MIN_DIGIT_COUNT, Player, Room,
    RoomId, RoomStatus, UserId,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{ScoringEngine, TurnClock};

/// Owner-supplied settings for a new room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub password: Option<String>,
    pub is_public: bool,
    pub digit_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    Miss(GuessResult),
    Win(GuessResult),
}

impl GuessOutcome {
    pub fn result(&self) -> &GuessResult {
        match self {
            GuessOutcome::Miss(result) | GuessOutcome::Win(result) => result,
        }
    }

    pub fn is_winner(&self) -> bool {
        matches!(self, GuessOutcome::Win(_))
    }
}

/// Drives a [`Room`] through `waiting -> playing -> finished`.
///
/// Every transition validates completely before it touches the room, so an
/// `Err` always leaves the room exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct RoomEngine {
    clock: TurnClock,
}

impl RoomEngine {
    pub fn new(clock: TurnClock) -> Self {
        Self { clock }
    }

    /// Eight uppercase hex characters.
    pub fn generate_room_id() -> RoomId {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        id.to_uppercase()
    }

    pub fn clamp_digit_count(requested: Option<i64>) -> usize {
        match requested {
            Some(n) if (MIN_DIGIT_COUNT as i64..=MAX_DIGIT_COUNT as i64).contains(&n) => n as usize,
            _ => DEFAULT_DIGIT_COUNT,
        }
    }

    pub fn password_digest(room_id: &str, password: &str) -> String {
        let digest = Sha256::digest(format!("{room_id}:{password}").as_bytes());
        format!("{digest:x}")
    }

    fn opponent_slot(slot: usize) -> usize {
        if slot == 0 { 1 } else { 0 }
    }

    pub fn create(&self, id: RoomId, owner: Player, request: NewRoom, now: DateTime<Utc>) -> Room {
        let digit_count = Self::clamp_digit_count(request.digit_count);
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .map(|p| Self::password_digest(&id, &p));

        let room = Room {
            id,
            name: request.name,
            password,
            is_public: request.is_public,
            created_by: owner.id,
            digit_count,
            players: vec![Player::new(owner.id, owner.full_name, owner.profile_picture)],
            status: RoomStatus::Waiting,
            current_turn: 0,
            round: 1,
            turn_start_time: None,
            turn_deadline: None,
            winner: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            last_activity: now,
        };

        info!(
            room_id = %room.id,
            owner = %room.created_by,
            digit_count,
            is_public = room.is_public,
            "room created"
        );
        room
    }

    pub fn join(
        &self,
        room: &mut Room,
        player: Player,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        if room.is_full() {
            return Err(GameError::RoomFull);
        }

        if let Some(expected) = &room.password {
            let supplied = password.map(|p| Self::password_digest(&room.id, p));
            if supplied.as_deref() != Some(expected.as_str()) {
                return Err(GameError::wrong_password());
            }
        }

        if room.has_player(player.id) {
            return Err(GameError::AlreadyJoined);
        }

        room.players
            .push(Player::new(player.id, player.full_name, player.profile_picture));
        room.touch(now);

        info!(room_id = %room.id, player_id = %player.id, "player joined");
        Ok(())
    }

    pub fn set_ready(
        &self,
        room: &mut Room,
        user_id: UserId,
        ready: bool,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        let index = room.player_index(user_id).ok_or_else(GameError::not_in_room)?;

        room.players[index].ready = ready;
        room.touch(now);

        debug!(room_id = %room.id, player_id = %user_id, ready, "ready toggled");
        Ok(())
    }

    /// Record a player's secret. Returns `true` when this call started the game.
    pub fn set_secret_number(
        &self,
        room: &mut Room,
        user_id: UserId,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        let index = room.player_index(user_id).ok_or_else(GameError::not_in_room)?;

        let actual = secret.chars().count();
        if actual != room.digit_count {
            return Err(GameError::InvalidGuessLength {
                expected: room.digit_count,
                actual,
            });
        }
        ScoringEngine::validate_digits(secret)?;

        if room.players[index].secret_number.is_some() {
            return Err(GameError::SecretAlreadySet);
        }

        room.players[index].secret_number = Some(secret.to_string());
        room.touch(now);

        let both_set = room.is_full() && room.players.iter().all(|p| p.secret_number.is_some());
        if room.status == RoomStatus::Waiting && both_set {
            self.start(room, now);
            return Ok(true);
        }

        Ok(false)
    }

    fn start(&self, room: &mut Room, now: DateTime<Utc>) {
        let window = self.clock.open(now);

        room.status = RoomStatus::Playing;
        room.started_at = Some(now);
        room.current_turn = 0;
        room.round = 1;
        room.turn_start_time = Some(window.started_at);
        room.turn_deadline = Some(window.deadline);

        info!(room_id = %room.id, deadline = %window.deadline, "game started");
    }

    pub fn guess(
        &self,
        room: &mut Room,
        user_id: UserId,
        guess: &str,
        now: DateTime<Utc>,
    ) -> Result<GuessOutcome, GameError> {
        if room.status != RoomStatus::Playing {
            return Err(GameError::GameNotInProgress);
        }

        let index = room.player_index(user_id).ok_or_else(GameError::not_in_room)?;
        if room.current_turn != index {
            return Err(GameError::NotYourTurn);
        }

        let actual = guess.chars().count();
        if actual != room.digit_count {
            return Err(GameError::InvalidGuessLength {
                expected: room.digit_count,
                actual,
            });
        }
        ScoringEngine::validate_digits(guess)?;

        let secret = room
            .players
            .get(Self::opponent_slot(index))
            .and_then(|p| p.secret_number.as_deref())
            .ok_or(GameError::GameNotInProgress)?;
        let feedback = ScoringEngine::score(guess, secret)?;

        let result = GuessResult::new(guess.to_string(), feedback, now);
        room.players[index].guesses.push(result.clone());
        room.touch(now);

        if ScoringEngine::is_win(&feedback, room.digit_count) {
            room.status = RoomStatus::Finished;
            room.winner = Some(user_id);
            room.finished_at = Some(now);
            room.turn_start_time = None;
            room.turn_deadline = None;

            info!(
                room_id = %room.id,
                winner = %user_id,
                round = room.round,
                "match finished"
            );
            return Ok(GuessOutcome::Win(result));
        }

        self.advance_turn(room, now);
        debug!(
            room_id = %room.id,
            player_id = %user_id,
            correct_position = feedback.correct_position,
            correct_digit = feedback.correct_digit,
            "guess scored"
        );
        Ok(GuessOutcome::Miss(result))
    }

    /// Force the turn over once its deadline has passed. No guess is recorded
    /// for the player who ran out of time.
    pub fn skip_turn(&self, room: &mut Room, now: DateTime<Utc>) -> Result<(), GameError> {
        if room.status != RoomStatus::Playing {
            return Err(GameError::GameNotInProgress);
        }

        let deadline = room.turn_deadline.ok_or(GameError::GameNotInProgress)?;
        if !TurnClock::is_expired(deadline, now) {
            return Err(GameError::TurnNotExpired);
        }

        let skipped = room.current_turn;
        self.advance_turn(room, now);
        room.touch(now);

        info!(
            room_id = %room.id,
            skipped_slot = skipped,
            round = room.round,
            "turn skipped"
        );
        Ok(())
    }

    // The round counter moves when the turn comes back to slot 0.
    fn advance_turn(&self, room: &mut Room, now: DateTime<Utc>) {
        room.current_turn = Self::opponent_slot(room.current_turn);
        if room.current_turn == 0 {
            room.round += 1;
        }

        let window = self.clock.open(now);
        room.turn_start_time = Some(window.started_at);
        room.turn_deadline = Some(window.deadline);
    }
}
