#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use duel_core::{NewRoom, RoomEngine};
use duel_types::{Player, Room, RoomStatus, UserId, UserProfile};
use uuid::Uuid;

/// Creates a test player with a fresh id
pub fn create_test_player(name: &str) -> Player {
    Player::new(Uuid::new_v4(), name.to_string(), None)
}

pub fn create_test_profile(player: &Player) -> UserProfile {
    UserProfile::new(
        player.id,
        format!("{}@example.com", player.full_name.to_lowercase()),
        player.full_name.clone(),
        None,
        Utc::now(),
    )
}

/// Creates a public, password-less room owned by `owner`
pub fn create_open_room(
    engine: &RoomEngine,
    owner: Player,
    digit_count: usize,
    now: DateTime<Utc>,
) -> Room {
    engine.create(
        RoomEngine::generate_room_id(),
        owner,
        NewRoom {
            name: "Test Room".to_string(),
            password: None,
            is_public: true,
            digit_count: Some(digit_count as i64),
        },
        now,
    )
}

/// Two players joined, ready, and secrets locked in
pub struct StartedMatch {
    pub room: Room,
    pub alice: UserId,
    pub bob: UserId,
    pub started_at: DateTime<Utc>,
}

pub fn start_match(
    engine: &RoomEngine,
    alice_secret: &str,
    bob_secret: &str,
) -> StartedMatch {
    let now = Utc::now();
    let alice = create_test_player("Alice");
    let bob = create_test_player("Bob");
    let (alice_id, bob_id) = (alice.id, bob.id);

    let mut room = create_open_room(engine, alice, alice_secret.len(), now);
    engine.join(&mut room, bob, None, now).unwrap();
    engine.set_ready(&mut room, alice_id, true, now).unwrap();
    engine.set_ready(&mut room, bob_id, true, now).unwrap();
    engine
        .set_secret_number(&mut room, alice_id, alice_secret, now)
        .unwrap();
    let started = engine
        .set_secret_number(&mut room, bob_id, bob_secret, now)
        .unwrap();
    assert!(started, "second secret should start the match");

    StartedMatch {
        room,
        alice: alice_id,
        bob: bob_id,
        started_at: now,
    }
}

pub fn assert_turn(room: &Room, expected_turn: usize, expected_round: u32) {
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(
        room.current_turn, expected_turn,
        "Expected turn {}, got {}",
        expected_turn, room.current_turn
    );
    assert_eq!(
        room.round, expected_round,
        "Expected round {}, got {}",
        expected_round, room.round
    );
}

pub fn seconds(n: i64) -> TimeDelta {
    TimeDelta::seconds(n)
}
