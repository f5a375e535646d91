use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection};

use crate::auth::{AuthService, AuthenticatedUser};
use crate::error::ServiceError;
use crate::room_service::RoomService;
use duel_types::{
    CleanupResponse, CreateRoomRequest, ErrorResponse, GuessRequest, HistoryResponse,
    JoinRoomRequest, ProfileResponse, ReadyRequest, RoomListResponse, RoomResponse,
    SecretNumberRequest, SignupRequest, StatsResponse, UpdateProfileRequest,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod locks;
pub mod room_service;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn create_routes(
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let service_filter = warp::any().map({
        let room_service = room_service.clone();
        move || room_service.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let auth_header = warp::header::optional::<String>("authorization");

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // Profiles
    let signup = warp::path!("signup")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<SignupRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_signup);

    let get_profile = warp::path!("profile" / String)
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_get_profile);

    let update_profile = warp::path!("profile")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<UpdateProfileRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_update_profile);

    // Rooms
    let create_room = warp::path!("rooms")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<CreateRoomRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_create_room);

    let list_rooms = warp::path!("rooms")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_list_rooms);

    let get_room = warp::path!("rooms" / String)
        .and(warp::get())
        .and(auth_header.clone())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_get_room);

    let join_room = warp::path!("rooms" / String / "join")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<JoinRoomRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_join_room);

    let set_ready = warp::path!("rooms" / String / "ready")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<ReadyRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_set_ready);

    let set_number = warp::path!("rooms" / String / "set-number")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<SecretNumberRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_set_number);

    let guess = warp::path!("rooms" / String / "guess")
        .and(warp::post())
        .and(auth_header.clone())
        .and(json_body::<GuessRequest>())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_guess);

    // Called by pollers once the deadline has passed, no identity needed
    let skip_turn = warp::path!("rooms" / String / "skip-turn")
        .and(warp::post())
        .and(service_filter.clone())
        .and_then(handle_skip_turn);

    let cleanup = warp::path!("cleanup-rooms")
        .and(warp::post())
        .and(service_filter.clone())
        .and_then(handle_cleanup);

    // Caller's own records
    let history = warp::path!("history")
        .and(warp::get())
        .and(auth_header.clone())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_history);

    let stats = warp::path!("stats")
        .and(warp::get())
        .and(auth_header.clone())
        .and(service_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_stats);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    health
        .or(signup)
        .or(get_profile)
        .or(update_profile)
        .or(create_room)
        .or(list_rooms)
        .or(get_room)
        .or(join_room)
        .or(set_ready)
        .or(set_number)
        .or(guess)
        .or(skip_turn)
        .or(cleanup)
        .or(history)
        .or(stats)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("digit_duel"))
}

fn json_body<T: serde::de::DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn error_reply(error: &ServiceError) -> WithStatus<Json> {
    match error {
        ServiceError::Storage(e) => tracing::error!("Storage failure: {:?}", e),
        ServiceError::Auth(e) => tracing::warn!("Authentication failed: {}", e),
        ServiceError::Game(e) => tracing::warn!("Rejected action: {}", e),
    }
    json_reply(&error.to_response(), error.status())
}

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> WithStatus<Json> {
    match result {
        Ok(body) => json_reply(&body, StatusCode::OK),
        Err(error) => error_reply(&error),
    }
}

async fn authenticate(
    auth_service: &AuthService,
    auth_header: Option<String>,
) -> Result<AuthenticatedUser, WithStatus<Json>> {
    auth_service
        .authenticate_header(auth_header)
        .await
        .map_err(|e| error_reply(&ServiceError::from(e)))
}

async fn handle_signup(
    auth_header: Option<String>,
    request: SignupRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .signup(user.id, request)
            .await
            .map(|profile| ProfileResponse { profile }),
    ))
}

async fn handle_get_profile(
    user_id: String,
    room_service: Arc<RoomService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = match Uuid::parse_str(&user_id) {
        Ok(uuid) => uuid,
        Err(_) => {
            return Ok(json_reply(
                &ErrorResponse {
                    error: "Invalid user ID format".to_string(),
                    kind: None,
                },
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    Ok(respond(
        room_service
            .get_profile(user_id)
            .await
            .map(|profile| ProfileResponse { profile }),
    ))
}

async fn handle_update_profile(
    auth_header: Option<String>,
    request: UpdateProfileRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .update_profile(user.id, request)
            .await
            .map(|profile| ProfileResponse { profile }),
    ))
}

async fn handle_create_room(
    auth_header: Option<String>,
    request: CreateRoomRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .create_room(user.id, request)
            .await
            .map(|room| RoomResponse { room }),
    ))
}

async fn handle_list_rooms(
    room_service: Arc<RoomService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(
        room_service
            .list_public_rooms()
            .await
            .map(|rooms| RoomListResponse { rooms }),
    ))
}

async fn handle_get_room(
    room_id: String,
    auth_header: Option<String>,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // Anonymous reads are allowed; a bad credential is not
    let viewer = match auth_header {
        Some(header) => match authenticate(&auth_service, Some(header)).await {
            Ok(user) => Some(user.id),
            Err(reply) => return Ok(reply),
        },
        None => None,
    };

    Ok(respond(
        room_service
            .get_room(&room_id, viewer)
            .await
            .map(|room| RoomResponse { room }),
    ))
}

async fn handle_join_room(
    room_id: String,
    auth_header: Option<String>,
    request: JoinRoomRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .join_room(user.id, &room_id, request.password)
            .await
            .map(|room| RoomResponse { room }),
    ))
}

async fn handle_set_ready(
    room_id: String,
    auth_header: Option<String>,
    request: ReadyRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .set_ready(user.id, &room_id, request.ready)
            .await
            .map(|room| RoomResponse { room }),
    ))
}

async fn handle_set_number(
    room_id: String,
    auth_header: Option<String>,
    request: SecretNumberRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .set_secret_number(user.id, &room_id, &request.secret_number)
            .await
            .map(|room| RoomResponse { room }),
    ))
}

async fn handle_guess(
    room_id: String,
    auth_header: Option<String>,
    request: GuessRequest,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service.guess(user.id, &room_id, &request.guess).await,
    ))
}

async fn handle_skip_turn(
    room_id: String,
    room_service: Arc<RoomService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(room_service.skip_turn(&room_id).await))
}

async fn handle_cleanup(
    room_service: Arc<RoomService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(room_service.cleanup_rooms().await.map(|report| {
        CleanupResponse {
            cleaned_count: report.cleaned_count(),
            cleaned_rooms: report.cleaned_room_ids,
        }
    })))
}

async fn handle_history(
    auth_header: Option<String>,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .history(user.id)
            .await
            .map(|history| HistoryResponse { history }),
    ))
}

async fn handle_stats(
    auth_header: Option<String>,
    room_service: Arc<RoomService>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match authenticate(&auth_service, auth_header).await {
        Ok(user) => user,
        Err(reply) => return Ok(reply),
    };

    Ok(respond(
        room_service
            .stats(user.id)
            .await
            .map(|stats| StatsResponse { stats }),
    ))
}

async fn handle_rejection(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(json_reply(&ErrorResponse { error: message, kind: None }, status))
}
