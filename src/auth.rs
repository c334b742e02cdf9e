use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    error::ApiError,
    models::{Session, SessionUser},
};

/// Cookie holding the session token on plain-HTTP (local) deployments.
pub const SESSION_COOKIE: &str = "next-auth.session-token";
/// Cookie holding the session token behind HTTPS; browsers only accept it with `Secure`.
pub const SECURE_SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

/// SessionClaims
///
/// Payload of the signed session token. Field names follow the token's camelCase wire
/// format so tokens minted by the sign-in flow decode unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// The user id. Tokens with an empty id are rejected.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Issued At, seconds since the epoch.
    pub iat: usize,
    /// Expiration Time, seconds since the epoch.
    pub exp: usize,
}

impl SessionClaims {
    /// Signs the claims as an HS256 token with `secret`.
    pub fn sign(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::default(), self, &key)
    }

    /// Projects the claims onto the session object exposed to handlers. An `exp` past
    /// the representable range clamps to `DateTime::<Utc>::MAX_UTC`.
    pub fn into_session(self) -> Session {
        let expires = i64::try_from(self.exp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Session {
            expires,
            user: SessionUser {
                id: self.id,
                profile_complete: self.profile_complete,
                name: self.name,
                email: self.email,
                image: self.picture,
            },
        }
    }
}

/// Why a request did not yield a session.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Neither a session cookie nor a bearer token was sent.
    #[error("no session token present")]
    MissingToken,
    /// The token failed signature, expiry or format checks.
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    /// The token verified but names no user.
    #[error("session token carries no user id")]
    MissingIdentity,
}

/// SessionVerifier
///
/// Resolves the session for a request from its headers. Implementations must be
/// shareable across tasks, the application holds one behind an `Arc`.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Result<Session, VerifyError>;
}

/// VerifierState
///
/// The concrete type used to share the session verifier across the application state.
pub type VerifierState = Arc<dyn SessionVerifier>;

/// resolve_session
///
/// Collapses every verification failure into "no session". A missing token is the
/// normal anonymous case; any other failure is logged at `warn` and then treated the
/// same way.
pub async fn resolve_session(
    verifier: &dyn SessionVerifier,
    headers: &HeaderMap,
) -> Option<Session> {
    match verifier.verify(headers).await {
        Ok(session) => Some(session),
        Err(VerifyError::MissingToken) => None,
        Err(e) => {
            tracing::warn!("Session verification failed: {}", e);
            None
        }
    }
}

/// JwtSessionVerifier
///
/// Verifies HS256 session tokens signed with the configured secret. The token is taken
/// from the `Authorization: Bearer` header first, then from the secure session cookie,
/// then from the plain one.
pub struct JwtSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl SessionVerifier for JwtSessionVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Result<Session, VerifyError> {
        let token = extract_token(headers).ok_or(VerifyError::MissingToken)?;
        let token_data = decode::<SessionClaims>(&token, &self.decoding_key, &self.validation)?;

        if token_data.claims.id.is_empty() {
            return Err(VerifyError::MissingIdentity);
        }

        Ok(token_data.claims.into_session())
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    session_cookie(headers, SECURE_SESSION_COOKIE)
        .or_else(|| session_cookie(headers, SESSION_COOKIE))
}

/// Reads the session token stored under `name`. Tokens too large for one cookie arrive
/// split as `name.0`, `name.1`, ...; the chunks are joined in index order.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = request_cookies(headers);

    if let Some((_, value)) = cookies.iter().find(|(key, _)| *key == name) {
        return Some(value.to_string());
    }

    let mut chunks: Vec<(usize, &str)> = cookies
        .iter()
        .filter_map(|(key, value)| {
            let index = key.strip_prefix(name)?.strip_prefix('.')?.parse::<usize>().ok()?;
            Some((index, *value))
        })
        .collect();

    if chunks.is_empty() {
        return None;
    }
    chunks.sort_by_key(|(index, _)| *index);

    // A gap means a chunk was dropped; the partial token is useless.
    if chunks.iter().enumerate().any(|(position, (index, _))| position != *index) {
        return None;
    }

    Some(chunks.into_iter().map(|(_, value)| value).collect())
}

/// Every non-empty `name=value` pair across all `Cookie` headers.
fn request_cookies(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

/// AuthSession Extractor
///
/// Resolves the caller's session for API handlers. Rejects with
/// `ApiError::Unauthorized` (401) when there is no session or it has no user id.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = VerifierState::from_ref(state);

        resolve_session(verifier.as_ref(), &parts.headers)
            .await
            .filter(|session| !session.user.id.is_empty())
            .map(AuthSession)
            .ok_or(ApiError::Unauthorized)
    }
}
