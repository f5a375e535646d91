use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::error::ServiceError;
use crate::locks::KeyLocks;
use duel_core::{NewRoom, RoomEngine, RoomSweeper, StatsRecorder, SweepReport, TurnClock};
use duel_persistence::Storage;
use duel_persistence::keys::{PUBLIC_ROOMS_KEY, ROOM_INDEX_KEY, history_key, room_key, user_key};
use duel_types::{
    CreateRoomRequest, GameError, GameHistoryRecord, GuessResponse, Player, PublicRoomSummary,
    Room, RoomId, RoomView, SignupRequest, SkipTurnResponse, UpdateProfileRequest, UserId,
    UserProfile, UserStats,
};

const DEFAULT_PLAYER_NAME: &str = "Player";

/// Runs room and profile actions against the store.
///
/// Every read-modify-write holds the lock of each key it writes, taken in
/// [`KeyLocks`] order, so two requests for the same room never interleave.
pub struct RoomService {
    storage: Storage,
    engine: RoomEngine,
    sweeper: RoomSweeper,
    locks: KeyLocks,
}

impl RoomService {
    pub fn new(storage: Storage, engine: RoomEngine, sweeper: RoomSweeper) -> Self {
        Self {
            storage,
            engine,
            sweeper,
            locks: KeyLocks::new(),
        }
    }

    pub fn with_defaults(storage: Storage) -> Self {
        Self::new(storage, RoomEngine::default(), RoomSweeper::default())
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    fn view(&self, room: &Room, viewer: Option<UserId>, now: DateTime<Utc>) -> RoomView {
        let remaining = TurnClock::remaining_for(room, now).map(|left| left.num_milliseconds());
        RoomView::for_viewer(room, viewer, remaining)
    }

    async fn load_room(&self, room_id: &str) -> Result<Room, ServiceError> {
        self.storage
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| GameError::room_not_found(room_id).into())
    }

    /// Seat for `user_id`, seeded from their profile when one exists.
    async fn seat_for(&self, user_id: UserId) -> Result<Player, ServiceError> {
        let profile = self.storage.profiles.find_by_id(&user_id).await?;

        let (name, picture) = match profile {
            Some(profile) => (profile.full_name, profile.profile_picture),
            None => (String::new(), None),
        };
        let name = if name.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            name
        };

        Ok(Player::new(user_id, name, picture))
    }

    // Profiles

    pub async fn signup(
        &self,
        user_id: UserId,
        request: SignupRequest,
    ) -> Result<UserProfile, ServiceError> {
        let _guard = self.locks.lock(&user_key(&user_id)).await;

        if self.storage.profiles.find_by_id(&user_id).await?.is_some() {
            return Err(GameError::ProfileExists.into());
        }

        let profile = UserProfile::new(
            user_id,
            request.email,
            request.full_name,
            request.profile_picture.filter(|p| !p.is_empty()),
            Utc::now(),
        );
        self.storage.profiles.save(&profile).await?;

        info!(user_id = %user_id, "profile created");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, ServiceError> {
        self.storage
            .profiles
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| GameError::profile_not_found().into())
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        let _guard = self.locks.lock(&user_key(&user_id)).await;
        let mut profile = self.get_profile(user_id).await?;

        if let Some(full_name) = request.full_name.filter(|n| !n.trim().is_empty()) {
            profile.full_name = full_name;
        }
        if let Some(picture) = request.profile_picture {
            profile.profile_picture = Some(picture).filter(|p| !p.is_empty());
        }

        self.storage.profiles.save(&profile).await?;
        debug!(user_id = %user_id, "profile updated");
        Ok(profile)
    }

    pub async fn history(&self, user_id: UserId) -> Result<Vec<GameHistoryRecord>, ServiceError> {
        Ok(self.storage.history.find_for_user(&user_id).await?)
    }

    pub async fn stats(&self, user_id: UserId) -> Result<UserStats, ServiceError> {
        Ok(self.get_profile(user_id).await?.stats())
    }

    // Rooms

    pub async fn create_room(
        &self,
        user_id: UserId,
        request: CreateRoomRequest,
    ) -> Result<RoomView, ServiceError> {
        let now = Utc::now();
        let owner = self.seat_for(user_id).await?;
        let owner_name = owner.full_name.clone();

        let (room_id, _room_guard) = loop {
            let candidate = RoomEngine::generate_room_id();
            let guard = self.locks.lock(&room_key(&candidate)).await;
            if self.storage.rooms.find_by_id(&candidate).await?.is_none() {
                break (candidate, guard);
            }
        };

        let room = self.engine.create(
            room_id,
            owner,
            NewRoom {
                name: request.room_name,
                password: request.password,
                is_public: request.is_public.unwrap_or(true),
                digit_count: request.digit_count,
            },
            now,
        );
        self.storage.rooms.save(&room).await?;

        if let Err(e) = self.register_room(&room, &owner_name).await {
            error!(
                room_id = %room.id,
                error = %e,
                "room saved but not registered in the listing or index"
            );
            return Err(e);
        }

        Ok(self.view(&room, Some(user_id), now))
    }

    async fn register_room(&self, room: &Room, owner_name: &str) -> Result<(), ServiceError> {
        if room.is_public {
            let _guard = self.locks.lock(PUBLIC_ROOMS_KEY).await;
            let mut listing = self.storage.rooms.public_listing().await?;
            listing.push(room.summary(owner_name));
            self.storage.rooms.save_public_listing(&listing).await?;
        }

        let _guard = self.locks.lock(ROOM_INDEX_KEY).await;
        let mut index = self.storage.rooms.room_index().await?;
        index.push(room.id.clone());
        self.storage.rooms.save_room_index(&index).await?;
        Ok(())
    }

    pub async fn list_public_rooms(&self) -> Result<Vec<PublicRoomSummary>, ServiceError> {
        Ok(self.storage.rooms.public_listing().await?)
    }

    pub async fn get_room(
        &self,
        room_id: &str,
        viewer: Option<UserId>,
    ) -> Result<RoomView, ServiceError> {
        let room = self.load_room(room_id).await?;
        Ok(self.view(&room, viewer, Utc::now()))
    }

    pub async fn join_room(
        &self,
        user_id: UserId,
        room_id: &str,
        password: Option<String>,
    ) -> Result<RoomView, ServiceError> {
        let now = Utc::now();
        let _guard = self.locks.lock(&room_key(room_id)).await;
        let mut room = self.load_room(room_id).await?;

        let player = self.seat_for(user_id).await?;
        self.engine
            .join(&mut room, player, password.as_deref(), now)?;
        self.storage.rooms.save(&room).await?;

        if room.is_public {
            self.update_listing_entry(&room).await?;
        }

        Ok(self.view(&room, Some(user_id), now))
    }

    pub async fn set_ready(
        &self,
        user_id: UserId,
        room_id: &str,
        ready: bool,
    ) -> Result<RoomView, ServiceError> {
        let now = Utc::now();
        let _guard = self.locks.lock(&room_key(room_id)).await;
        let mut room = self.load_room(room_id).await?;

        self.engine.set_ready(&mut room, user_id, ready, now)?;
        self.storage.rooms.save(&room).await?;

        Ok(self.view(&room, Some(user_id), now))
    }

    pub async fn set_secret_number(
        &self,
        user_id: UserId,
        room_id: &str,
        secret: &str,
    ) -> Result<RoomView, ServiceError> {
        let now = Utc::now();
        let _guard = self.locks.lock(&room_key(room_id)).await;
        let mut room = self.load_room(room_id).await?;

        self.engine
            .set_secret_number(&mut room, user_id, secret, now)?;
        self.storage.rooms.save(&room).await?;

        Ok(self.view(&room, Some(user_id), now))
    }

    pub async fn guess(
        &self,
        user_id: UserId,
        room_id: &str,
        guess: &str,
    ) -> Result<GuessResponse, ServiceError> {
        let now = Utc::now();
        let _guard = self.locks.lock(&room_key(room_id)).await;
        let mut room = self.load_room(room_id).await?;

        let outcome = self.engine.guess(&mut room, user_id, guess, now)?;
        // Room first: a retried winning guess then fails instead of counting twice
        self.storage.rooms.save(&room).await?;

        if outcome.is_winner() {
            if let Err(e) = self.settle_match(&room, now).await {
                error!(
                    room_id = %room.id,
                    error = %e,
                    "room saved as finished but stats, history or listing were not updated"
                );
                return Err(e);
            }
        }

        Ok(GuessResponse {
            room: self.view(&room, Some(user_id), now),
            is_winner: outcome.is_winner(),
            feedback: outcome.result().clone(),
        })
    }

    pub async fn skip_turn(&self, room_id: &str) -> Result<SkipTurnResponse, ServiceError> {
        self.skip_turn_at(room_id, Utc::now()).await
    }

    pub async fn skip_turn_at(
        &self,
        room_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SkipTurnResponse, ServiceError> {
        let _guard = self.locks.lock(&room_key(room_id)).await;
        let mut room = self.load_room(room_id).await?;

        self.engine.skip_turn(&mut room, now)?;
        self.storage.rooms.save(&room).await?;

        Ok(SkipTurnResponse {
            room: self.view(&room, None, now),
            skipped: true,
        })
    }

    pub async fn cleanup_rooms(&self) -> Result<SweepReport, ServiceError> {
        self.cleanup_rooms_at(Utc::now()).await
    }

    /// Delete every known room past its inactivity threshold, then drop
    /// listing and index entries whose room is gone.
    pub async fn cleanup_rooms_at(&self, now: DateTime<Utc>) -> Result<SweepReport, ServiceError> {
        let listing = self.storage.rooms.public_listing().await?;
        let index = self.storage.rooms.room_index().await?;

        let mut seen = HashSet::new();
        let candidates: Vec<RoomId> = listing
            .into_iter()
            .map(|summary| summary.id)
            .chain(index)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut rooms = Vec::with_capacity(candidates.len());
        let mut gone: HashSet<RoomId> = HashSet::new();
        for id in candidates {
            match self.storage.rooms.find_by_id(&id).await? {
                Some(room) => rooms.push(room),
                None => {
                    gone.insert(id);
                }
            }
        }

        let mut report = SweepReport::default();
        for (room_id, _) in self.sweeper.plan(&rooms, now) {
            let _guard = self.locks.lock(&room_key(&room_id)).await;

            // Re-check under the lock; the room may have moved since the scan
            let Some(room) = self.storage.rooms.find_by_id(&room_id).await? else {
                gone.insert(room_id);
                continue;
            };
            let Some(reason) = self.sweeper.verdict(&room, now) else {
                continue;
            };

            self.storage.rooms.delete(&room_id).await?;
            info!(room_id = %room_id, status = ?room.status, %reason, "room swept");

            gone.insert(room_id.clone());
            report.cleaned_room_ids.push(room_id);
        }

        if !gone.is_empty() {
            self.remove_from_listing(&gone).await?;

            let _guard = self.locks.lock(ROOM_INDEX_KEY).await;
            let mut index = self.storage.rooms.room_index().await?;
            index.retain(|id| !gone.contains(id));
            self.storage.rooms.save_room_index(&index).await?;
        }

        if report.cleaned_count() > 0 {
            info!(cleaned = report.cleaned_count(), "cleanup pass finished");
        }
        Ok(report)
    }

    async fn settle_match(&self, room: &Room, now: DateTime<Utc>) -> Result<(), ServiceError> {
        self.record_match(room, now).await?;
        if room.is_public {
            self.remove_from_listing(&HashSet::from([room.id.clone()]))
                .await?;
        }
        Ok(())
    }

    async fn update_listing_entry(&self, room: &Room) -> Result<(), ServiceError> {
        let _guard = self.locks.lock(PUBLIC_ROOMS_KEY).await;
        let mut listing = self.storage.rooms.public_listing().await?;

        for entry in listing.iter_mut().filter(|entry| entry.id == room.id) {
            entry.player_count = room.players.len();
        }
        self.storage.rooms.save_public_listing(&listing).await?;
        Ok(())
    }

    async fn remove_from_listing(&self, room_ids: &HashSet<RoomId>) -> Result<(), ServiceError> {
        let _guard = self.locks.lock(PUBLIC_ROOMS_KEY).await;
        let mut listing = self.storage.rooms.public_listing().await?;

        let before = listing.len();
        listing.retain(|entry| !room_ids.contains(&entry.id));
        if listing.len() != before {
            self.storage.rooms.save_public_listing(&listing).await?;
        }
        Ok(())
    }

    /// Profiles are updated only when they exist; history is always written.
    async fn record_match(&self, room: &Room, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let Some(records) = StatsRecorder::match_records(room, now) else {
            return Ok(());
        };

        let mut keys = vec![
            user_key(&records.winner_id),
            user_key(&records.loser_id),
            history_key(&records.winner_id),
            history_key(&records.loser_id),
        ];
        keys.sort();
        let _guards = self.locks.lock_all(&keys).await;

        if let Some(mut winner) = self.storage.profiles.find_by_id(&records.winner_id).await? {
            StatsRecorder::record_win(&mut winner);
            self.storage.profiles.save(&winner).await?;
        }
        if let Some(mut loser) = self.storage.profiles.find_by_id(&records.loser_id).await? {
            StatsRecorder::record_loss(&mut loser);
            self.storage.profiles.save(&loser).await?;
        }

        for (user_id, record) in [
            (records.winner_id, records.winner_record),
            (records.loser_id, records.loser_record),
        ] {
            let mut history = self.storage.history.find_for_user(&user_id).await?;
            StatsRecorder::prepend(&mut history, record);
            self.storage.history.save_for_user(&user_id, &history).await?;
        }

        info!(
            room_id = %room.id,
            winner = %records.winner_id,
            loser = %records.loser_id,
            "match recorded"
        );
        Ok(())
    }
}
