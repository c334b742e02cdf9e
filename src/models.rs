use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Session Schemas (exported to the front end) ---

/// SessionUser
///
/// The identity carried by a verified session. `id` is always present; the remaining
/// fields come from the identity provider's default profile and may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    // Set once the user has finished the onboarding profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub profile_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub image: Option<String>,
}

/// Session
///
/// The per-request session object handed to downstream code. Derived from a signed
/// token on every request and never persisted by this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Session {
    pub user: SessionUser,
    #[ts(type = "string")]
    pub expires: DateTime<Utc>,
}

// --- API Payloads ---

/// DeleteAccountResponse
///
/// Success body of `DELETE /api/account`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// ErrorResponse
///
/// Body of every error response: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Account Records (owned by the repository) ---

/// User
///
/// Root of the account graph. Every other record below references it, directly or
/// through a trip or chat, and is removed when the user is deleted.
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub user_id: String,
    pub home_country: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct ItineraryStop {
    pub id: String,
    pub trip_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Chat {
    pub id: String,
    pub trip_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub body: String,
}

/// Identity-provider account linked to a user (e.g. an OAuth login).
#[derive(Debug, Clone, Default)]
pub struct LinkedAccount {
    pub id: String,
    pub user_id: String,
    pub provider: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoredSession {
    pub id: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

/// DependentCounts
///
/// Number of records still reachable from a user id, per table. All zero once the
/// account has been deleted.
#[derive(Debug, Clone, Copy, FromRow, Default, PartialEq, Eq)]
pub struct DependentCounts {
    pub profiles: i64,
    pub trips: i64,
    pub itinerary_stops: i64,
    pub chats: i64,
    pub messages: i64,
    pub accounts: i64,
    pub sessions: i64,
}

impl DependentCounts {
    pub fn total(&self) -> i64 {
        self.profiles
            + self.trips
            + self.itinerary_stops
            + self.chats
            + self.messages
            + self.accounts
            + self.sessions
    }
}
