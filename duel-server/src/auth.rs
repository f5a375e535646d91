use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::{AuthMode, Config};
use duel_types::UserId;

/// Identity resolved from a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

/// Body of the identity provider's user endpoint.
#[derive(Debug, Clone, Deserialize)]
struct RemoteUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

enum Verifier {
    Jwt {
        key: DecodingKey,
        validation: Validation,
    },
    Remote {
        client: Client,
        userinfo_url: String,
        api_key: Option<String>,
    },
    Dev,
}

pub struct AuthService {
    verifier: Verifier,
}

impl AuthService {
    pub fn new_jwt(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            verifier: Verifier::Jwt {
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation,
            },
        }
    }

    pub fn new_remote(userinfo_url: String, api_key: Option<String>) -> Self {
        Self {
            verifier: Verifier::Remote {
                client: Client::new(),
                userinfo_url,
                api_key,
            },
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            verifier: Verifier::Dev,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        match config.auth_mode {
            AuthMode::Jwt => {
                let secret = config
                    .auth_jwt_secret
                    .as_deref()
                    .ok_or(AuthError::Misconfigured("AUTH_JWT_SECRET"))?;
                Ok(Self::new_jwt(secret, config.auth_jwt_audience.as_deref()))
            }
            AuthMode::Remote => {
                let url = config
                    .auth_userinfo_url
                    .clone()
                    .ok_or(AuthError::Misconfigured("AUTH_USERINFO_URL"))?;
                Ok(Self::new_remote(url, config.auth_api_key.clone()))
            }
            AuthMode::Dev => Ok(Self::new_dev_mode()),
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        matches!(self.verifier, Verifier::Dev)
    }

    /// Resolve an `Authorization` header value, with or without the `Bearer ` prefix.
    pub async fn authenticate_header(
        &self,
        header: Option<String>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(&header).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.validate_token(token).await
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        match &self.verifier {
            Verifier::Jwt { key, validation } => Self::validate_jwt(token, key, validation),
            Verifier::Remote {
                client,
                userinfo_url,
                api_key,
            } => Self::validate_remote(token, client, userinfo_url, api_key.as_deref()).await,
            Verifier::Dev => Self::validate_dev_token(token),
        }
    }

    fn validate_jwt(
        token: &str,
        key: &DecodingKey,
        validation: &Validation,
    ) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<TokenClaims>(token, key, validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Self::user_from_claims(data.claims)
    }

    async fn validate_remote(
        token: &str,
        client: &Client,
        userinfo_url: &str,
        api_key: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let mut request = client.get(userinfo_url).bearer_auth(token);
        if let Some(api_key) = api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Identity provider request failed: {:?}", e);
            AuthError::ProviderUnavailable
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidToken);
            }
            status => {
                tracing::warn!("Identity provider returned status: {}", status);
                return Err(AuthError::ProviderUnavailable);
            }
        }

        let user: RemoteUser = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse identity provider response: {:?}", e);
            AuthError::ProviderUnavailable
        })?;

        Ok(AuthenticatedUser {
            id: parse_user_id(&user.id)?,
            email: user.email,
            name: user.user_metadata.and_then(|m| m.full_name),
        })
    }

    /// Accepts `"<uuid>:<email>:<name>"`, or any JWT whose payload carries a
    /// `sub`, without checking the signature.
    fn validate_dev_token(token: &str) -> Result<AuthenticatedUser, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            let payload = URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;
            let claims: TokenClaims = serde_json::from_slice(&payload).map_err(|e| {
                tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;
            return Self::user_from_claims(claims);
        }

        let mut fields = token.splitn(3, ':');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(email), Some(name)) => Ok(AuthenticatedUser {
                id: parse_user_id(id)?,
                email: Some(email.to_string()).filter(|e| !e.is_empty()),
                name: Some(name.to_string()).filter(|n| !n.is_empty()),
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }

    fn user_from_claims(claims: TokenClaims) -> Result<AuthenticatedUser, AuthError> {
        Ok(AuthenticatedUser {
            id: parse_user_id(&claims.sub)?,
            email: claims.email,
            name: claims.user_metadata.and_then(|m| m.full_name),
        })
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, AuthError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!("Token subject is not a user id: {}", raw);
        AuthError::InvalidToken
    })
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Identity provider unavailable")]
    ProviderUnavailable,
    #[error("Authentication is not configured: {0} is required")]
    Misconfigured(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn test_jwt_round_trip() {
        let auth = AuthService::new_jwt(SECRET, None);
        let id = Uuid::new_v4();
        let token = sign(json!({
            "sub": id.to_string(),
            "email": "alice@example.com",
            "exp": far_future(),
            "user_metadata": { "full_name": "Alice" }
        }));

        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_jwt_wrong_secret_rejected() {
        let auth = AuthService::new_jwt("another-secret", None);
        let token = sign(json!({ "sub": Uuid::new_v4().to_string(), "exp": far_future() }));

        assert_eq!(auth.validate_token(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_jwt_expired() {
        let auth = AuthService::new_jwt(SECRET, None);
        let token = sign(json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": chrono::Utc::now().timestamp() - 3600
        }));

        assert_eq!(auth.validate_token(&token).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_jwt_audience_enforced() {
        let auth = AuthService::new_jwt(SECRET, Some("authenticated"));
        let id = Uuid::new_v4();

        let good = sign(json!({ "sub": id.to_string(), "aud": "authenticated", "exp": far_future() }));
        assert_eq!(auth.validate_token(&good).await.unwrap().id, id);

        let bad = sign(json!({ "sub": id.to_string(), "aud": "anon", "exp": far_future() }));
        assert_eq!(auth.validate_token(&bad).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_dev_colon_token() {
        let auth = AuthService::new_dev_mode();
        let id = Uuid::new_v4();

        let user = auth
            .validate_token(&format!("{id}:bob@example.com:Bob: The Builder"))
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
        assert_eq!(user.name.as_deref(), Some("Bob: The Builder"));
    }

    #[tokio::test]
    async fn test_dev_mode_reads_unsigned_jwt_payload() {
        let auth = AuthService::new_dev_mode();
        let id = Uuid::new_v4();
        let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": id.to_string() }).to_string());
        let token = format!("header.{payload}.signature");

        assert_eq!(auth.validate_token(&token).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_dev_mode_rejects_garbage() {
        let auth = AuthService::new_dev_mode();
        assert_eq!(auth.validate_token("garbage").await, Err(AuthError::InvalidToken));
        assert_eq!(
            auth.validate_token("not-a-uuid:a@b.c:Name").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_authenticate_header() {
        let auth = AuthService::new_dev_mode();
        let id = Uuid::new_v4();

        let user = auth
            .authenticate_header(Some(format!("Bearer {id}:a@example.com:A")))
            .await
            .unwrap();
        assert_eq!(user.id, id);

        assert_eq!(auth.authenticate_header(None).await, Err(AuthError::MissingToken));
        assert_eq!(
            auth.authenticate_header(Some("Bearer ".to_string())).await,
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn test_from_config_requires_secret() {
        let config = Config::from_lookup(|name| match name {
            "AUTH_MODE" => Some("jwt".to_string()),
            _ => None,
        });
        assert_eq!(
            AuthService::from_config(&config).err(),
            Some(AuthError::Misconfigured("AUTH_JWT_SECRET"))
        );

        let config = Config::from_lookup(|name| match name {
            "AUTH_MODE" => Some("dev".to_string()),
            _ => None,
        });
        assert!(AuthService::from_config(&config).unwrap().is_dev_mode());
    }
}
