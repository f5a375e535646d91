use warp::http::StatusCode;

use crate::auth::AuthError;
use duel_types::{ErrorResponse, GameError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Game(error) => match error {
                GameError::Unauthorized => StatusCode::UNAUTHORIZED,
                GameError::Forbidden { .. } => StatusCode::FORBIDDEN,
                GameError::NotFound { .. } => StatusCode::NOT_FOUND,
                GameError::ProfileExists => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    pub fn kind(&self) -> Option<GameError> {
        match self {
            ServiceError::Game(error) => Some(error.clone()),
            ServiceError::Auth(_) => Some(GameError::Unauthorized),
            ServiceError::Storage(_) => None,
        }
    }

    /// Client-facing body. Storage details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ServiceError::Storage(_) => "Internal server error".to_string(),
            ServiceError::Auth(_) => GameError::Unauthorized.to_string(),
            ServiceError::Game(error) => error.to_string(),
        };

        ErrorResponse {
            error,
            kind: self.kind(),
        }
    }
}
