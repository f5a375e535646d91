use chrono::{DateTime, Utc};
use duel_types::{GameHistoryRecord, MatchOutcome, Player, Room, RoomStatus, UserId, UserProfile};
use uuid::Uuid;

/// History entries produced by one finished match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecords {
    pub winner_id: UserId,
    pub winner_record: GameHistoryRecord,
    pub loser_id: UserId,
    pub loser_record: GameHistoryRecord,
}

pub struct StatsRecorder;

impl StatsRecorder {
    pub fn record_win(profile: &mut UserProfile) {
        profile.wins += 1;
        profile.total_games += 1;
        profile.accuracy = Self::accuracy(profile);
    }

    pub fn record_loss(profile: &mut UserProfile) {
        profile.losses += 1;
        profile.total_games += 1;
        profile.accuracy = Self::accuracy(profile);
    }

    /// Win rate as a percentage of games played.
    pub fn accuracy(profile: &UserProfile) -> f64 {
        if profile.total_games == 0 {
            return 0.0;
        }
        f64::from(profile.wins) / f64::from(profile.total_games) * 100.0
    }

    /// Build both players' history entries. `None` unless the room is
    /// finished with a winner and a second player.
    pub fn match_records(room: &Room, now: DateTime<Utc>) -> Option<MatchRecords> {
        if room.status != RoomStatus::Finished || room.players.len() < 2 {
            return None;
        }

        let winner_id = room.winner?;
        let winner = room.players.iter().find(|p| p.id == winner_id)?;
        let loser = room.players.iter().find(|p| p.id != winner_id)?;

        let record = |me: &Player, them: &Player, result: MatchOutcome| GameHistoryRecord {
            id: Uuid::new_v4(),
            room_id: room.id.clone(),
            opponent_id: them.id,
            opponent_name: them.full_name.clone(),
            result,
            rounds: me.guesses.len() as u32,
            timestamp: now,
        };

        Some(MatchRecords {
            winner_id,
            winner_record: record(winner, loser, MatchOutcome::Win),
            loser_id: loser.id,
            loser_record: record(loser, winner, MatchOutcome::Loss),
        })
    }

    /// Newest first.
    pub fn prepend(history: &mut Vec<GameHistoryRecord>, record: GameHistoryRecord) {
        history.insert(0, record);
    }
}
