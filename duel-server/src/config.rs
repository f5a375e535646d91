use std::env;
use std::str::FromStr;
use std::time::Duration;

use duel_core::{RoomSweeper, TurnClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// HS256 tokens verified locally against `AUTH_JWT_SECRET`
    Jwt,
    /// Tokens forwarded to the identity provider's user endpoint
    Remote,
    /// No verification; for local development and tests
    Dev,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "jwt" => Ok(AuthMode::Jwt),
            "remote" => Ok(AuthMode::Remote),
            "dev" => Ok(AuthMode::Dev),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub turn_seconds: u64,
    pub waiting_room_ttl_seconds: u64,
    pub playing_room_ttl_seconds: u64,
    pub finished_room_ttl_seconds: u64,
    pub cleanup_interval_seconds: u64,
    pub auth_mode: AuthMode,
    pub auth_jwt_secret: Option<String>,
    pub auth_jwt_audience: Option<String>,
    pub auth_userinfo_url: Option<String>,
    pub auth_api_key: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Panics on malformed values, naming the variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let optional = |name: &str| lookup(name).filter(|value| !value.is_empty());

        Self {
            host: var("HOST", "127.0.0.1"),
            port: var("PORT", "8080").parse().expect("Invalid PORT"),
            database_url: var("DATABASE_URL", "sqlite://digit_duel.db?mode=rwc"),
            turn_seconds: var("TURN_SECONDS", "30")
                .parse()
                .expect("Invalid TURN_SECONDS"),
            waiting_room_ttl_seconds: var("WAITING_ROOM_TTL_SECONDS", "300")
                .parse()
                .expect("Invalid WAITING_ROOM_TTL_SECONDS"),
            playing_room_ttl_seconds: var("PLAYING_ROOM_TTL_SECONDS", "600")
                .parse()
                .expect("Invalid PLAYING_ROOM_TTL_SECONDS"),
            finished_room_ttl_seconds: var("FINISHED_ROOM_TTL_SECONDS", "30")
                .parse()
                .expect("Invalid FINISHED_ROOM_TTL_SECONDS"),
            cleanup_interval_seconds: var("CLEANUP_INTERVAL_SECONDS", "30")
                .parse()
                .expect("Invalid CLEANUP_INTERVAL_SECONDS"),
            auth_mode: var("AUTH_MODE", "jwt").parse().expect("Invalid AUTH_MODE"),
            auth_jwt_secret: optional("AUTH_JWT_SECRET"),
            auth_jwt_audience: optional("AUTH_JWT_AUDIENCE"),
            auth_userinfo_url: optional("AUTH_USERINFO_URL"),
            auth_api_key: optional("AUTH_API_KEY"),
        }
    }

    pub fn turn_clock(&self) -> TurnClock {
        TurnClock::new(Duration::from_secs(self.turn_seconds))
    }

    pub fn sweeper(&self) -> RoomSweeper {
        RoomSweeper::new(
            Duration::from_secs(self.waiting_room_ttl_seconds),
            Duration::from_secs(self.playing_room_ttl_seconds),
            Duration::from_secs(self.finished_room_ttl_seconds),
        )
    }

    /// `None` when the built-in sweep is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_seconds > 0).then(|| Duration::from_secs(self.cleanup_interval_seconds))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
