//! Bearer token authentication
//!
//! Tokens are HS256 JWTs whose `sub` claim is the numeric user id.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a Bearer token")]
    InvalidScheme,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token subject is not a user id: {0}")]
    InvalidSubject(String),

    #[error("no signing secret configured")]
    NoSecret,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Verifies bearer tokens against the configured secret
///
/// An empty secret disables verification: every token is rejected.
#[derive(Clone)]
pub struct Authenticator {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        let key = if secret.trim().is_empty() {
            tracing::warn!("No JWT secret configured, all API requests will be rejected");
            None
        } else {
            Some(DecodingKey::from_secret(secret.as_bytes()))
        };

        Self {
            key,
            validation: Validation::default(),
        }
    }

    /// Verify a token and return the user id it was issued for
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NoSecret)?;
        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        data.claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidSubject(data.claims.sub.clone()))
    }
}

/// The authenticated caller of an `/api/v1` route
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidScheme)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidScheme)?
            .trim();

        let user_id = state.auth().verify(token)?;
        Ok(AuthUser { user_id })
    }
}

/// Sign a token for `user_id`, valid for an hour
#[cfg(test)]
pub(crate) fn issue_token(secret: &str, user_id: i64) -> String {
    issue_token_with_subject(secret, &user_id.to_string(), chrono::Utc::now().timestamp() + 3600)
}

#[cfg(test)]
pub(crate) fn issue_token_with_subject(secret: &str, sub: &str, exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: sub.to_string(),
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}
