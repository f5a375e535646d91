
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use test_helpers::*;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::test::request;

use duel_persistence::Storage;
use duel_server::auth::AuthService;
use duel_server::room_service::RoomService;

const SECRET: &str = "integration-test-secret";

fn jwt_setup(audience: Option<&str>) -> TestServerSetup {
    TestServerSetup {
        room_service: Arc::new(RoomService::with_defaults(Storage::in_memory())),
        auth_service: Arc::new(AuthService::new_jwt(SECRET, audience)),
    }
}

fn sign(claims: Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn claims_for(user_id: Uuid, expires_in: TimeDelta) -> Value {
    json!({
        "sub": user_id.to_string(),
        "email": "alice@example.com",
        "aud": "authenticated",
        "exp": (Utc::now() + expires_in).timestamp(),
        "user_metadata": { "full_name": "Alice" },
    })
}

async fn create_room_with(setup: &TestServerSetup, authorization: &str) -> StatusCode {
    setup
        .send(
            request()
                .method("POST")
                .path("/rooms")
                .header("authorization", authorization)
                .json(&json!({ "roomName": "Signed" })),
        )
        .await
        .status()
}

#[tokio::test]
async fn test_signed_token_is_accepted() {
    let setup = jwt_setup(Some("authenticated"));
    let user_id = Uuid::new_v4();
    let token = sign(claims_for(user_id, TimeDelta::hours(1)), SECRET);

    let status = create_room_with(&setup, &format!("Bearer {token}")).await;
    assert_eq!(status, StatusCode::OK);

    let index = setup.room_service.storage().rooms.room_index().await.unwrap();
    let room = setup.room_service.get_room(&index[0], None).await.unwrap();
    assert_eq!(room.created_by, user_id);
}

#[tokio::test]
async fn test_bare_token_without_bearer_prefix() {
    let setup = jwt_setup(None);
    let token = sign(claims_for(Uuid::new_v4(), TimeDelta::hours(1)), SECRET);

    assert_eq!(create_room_with(&setup, &token).await, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let setup = jwt_setup(None);
    let token = sign(claims_for(Uuid::new_v4(), TimeDelta::hours(-2)), SECRET);

    let status = create_room_with(&setup, &format!("Bearer {token}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_signature_is_rejected() {
    let setup = jwt_setup(None);
    let token = sign(claims_for(Uuid::new_v4(), TimeDelta::hours(1)), "someone-elses-secret");

    let status = create_room_with(&setup, &format!("Bearer {token}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let setup = jwt_setup(Some("digit-duel"));
    let token = sign(claims_for(Uuid::new_v4(), TimeDelta::hours(1)), SECRET);

    let status = create_room_with(&setup, &format!("Bearer {token}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_tokens_are_refused_in_jwt_mode() {
    let setup = jwt_setup(None);
    let alice = TestUser::new("Alice");

    assert_eq!(
        create_room_with(&setup, &alice.bearer()).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_bad_credential_blocks_anonymous_room_view() {
    let setup = jwt_setup(None);
    let owner = Uuid::new_v4();
    let room_id = setup
        .room_service
        .create_room(
            owner,
            duel_types::CreateRoomRequest {
                room_name: "Open".to_string(),
                password: None,
                is_public: Some(true),
                digit_count: None,
            },
        )
        .await
        .unwrap()
        .id;

    let anonymous = setup
        .send(request().method("GET").path(&format!("/rooms/{room_id}")))
        .await;
    assert_eq!(anonymous.status(), StatusCode::OK);

    let forged = setup
        .send(
            request()
                .method("GET")
                .path(&format!("/rooms/{room_id}"))
                .header("authorization", "Bearer not.a.token"),
        )
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unreachable_provider_is_unauthorized() {
    let setup = TestServerSetup {
        room_service: Arc::new(RoomService::with_defaults(Storage::in_memory())),
        auth_service: Arc::new(AuthService::new_remote(
            "http://127.0.0.1:9/auth/v1/user".to_string(),
            None,
        )),
    };

    let status = create_room_with(&setup, "Bearer opaque-session-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_mode_accepts_unsigned_jwt_payload() {
    let setup = TestServerSetup::new().await;
    let user_id = Uuid::new_v4();
    let token = sign(claims_for(user_id, TimeDelta::hours(1)), "anything");

    let status = create_room_with(&setup, &format!("Bearer {token}")).await;
    assert_eq!(status, StatusCode::OK);
}
