use crate::models::{
    Chat, DependentCounts, ItineraryStop, LinkedAccount, Message, Profile, StoredSession, Trip,
    User,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence failures surfaced to handlers.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No user (or parent record) with this id exists.
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Abstract contract for account persistence, so handlers never depend on a concrete
/// store.
///
/// **Cascade invariant**: `delete_user` removes the user and every dependent record
/// (profile, trips with their itinerary stops and chats, chat messages, linked accounts,
/// stored sessions) as one atomic operation. Either all of it is gone or none of it is.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Deletes the account. `NotFound` if the user does not exist.
    async fn delete_user(&self, id: &str) -> Result<(), RepositoryError>;

    /// Counts records still reachable from the user id.
    async fn dependent_counts(&self, id: &str) -> Result<DependentCounts, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Postgres-backed implementation. The cascade is declared in the schema
/// (`ON DELETE CASCADE` on every foreign key, see `migrations/`), so deleting the
/// `users` row is a single atomic statement.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn delete_user(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn dependent_counts(&self, id: &str) -> Result<DependentCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, DependentCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM profiles WHERE user_id = $1) AS profiles,
                (SELECT COUNT(*) FROM trips WHERE user_id = $1) AS trips,
                (SELECT COUNT(*) FROM itinerary_stops s
                    JOIN trips t ON s.trip_id = t.id WHERE t.user_id = $1) AS itinerary_stops,
                (SELECT COUNT(*) FROM chats c
                    JOIN trips t ON c.trip_id = t.id WHERE t.user_id = $1) AS chats,
                (SELECT COUNT(*) FROM messages m
                    JOIN chats c ON m.chat_id = c.id
                    JOIN trips t ON c.trip_id = t.id WHERE t.user_id = $1) AS messages,
                (SELECT COUNT(*) FROM accounts WHERE user_id = $1) AS accounts,
                (SELECT COUNT(*) FROM sessions WHERE user_id = $1) AS sessions
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}

#[derive(Default)]
struct MemoryStore {
    users: HashMap<String, User>,
    profiles: HashMap<String, Profile>,
    trips: HashMap<String, Trip>,
    itinerary_stops: HashMap<String, ItineraryStop>,
    chats: HashMap<String, Chat>,
    messages: HashMap<String, Message>,
    accounts: HashMap<String, LinkedAccount>,
    sessions: HashMap<String, StoredSession>,
}

impl MemoryStore {
    fn record_count(&self) -> usize {
        self.users.len()
            + self.profiles.len()
            + self.trips.len()
            + self.itinerary_stops.len()
            + self.chats.len()
            + self.messages.len()
            + self.accounts.len()
            + self.sessions.len()
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in memory. Used by the test suite and by local runs
/// without `DATABASE_URL`. Inserts check their parent exists, mirroring the foreign
/// keys of the Postgres schema, and `delete_user` cascades under a single write lock.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, email: &str, name: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: Utc::now(),
        };
        self.store
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        user
    }

    pub async fn insert_profile(
        &self,
        user_id: &str,
        home_country: Option<&str>,
    ) -> Result<Profile, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.users.contains_key(user_id), user_id)?;

        let profile = Profile {
            user_id: user_id.to_string(),
            home_country: home_country.map(str::to_string),
        };
        store.profiles.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    pub async fn insert_trip(&self, user_id: &str, title: &str) -> Result<Trip, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.users.contains_key(user_id), user_id)?;

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
        };
        store.trips.insert(trip.id.clone(), trip.clone());
        Ok(trip)
    }

    pub async fn insert_itinerary_stop(
        &self,
        trip_id: &str,
        name: &str,
    ) -> Result<ItineraryStop, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.trips.contains_key(trip_id), trip_id)?;

        let stop = ItineraryStop {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            name: name.to_string(),
        };
        store.itinerary_stops.insert(stop.id.clone(), stop.clone());
        Ok(stop)
    }

    pub async fn insert_chat(&self, trip_id: &str, title: &str) -> Result<Chat, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.trips.contains_key(trip_id), trip_id)?;

        let chat = Chat {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            title: title.to_string(),
        };
        store.chats.insert(chat.id.clone(), chat.clone());
        Ok(chat)
    }

    pub async fn insert_message(
        &self,
        chat_id: &str,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.chats.contains_key(chat_id), chat_id)?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            body: body.to_string(),
        };
        store.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    pub async fn insert_account(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<LinkedAccount, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.users.contains_key(user_id), user_id)?;

        let account = LinkedAccount {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider: provider.to_string(),
        };
        store.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    pub async fn insert_session(&self, user_id: &str) -> Result<StoredSession, RepositoryError> {
        let mut store = self.store.write().await;
        require(store.users.contains_key(user_id), user_id)?;

        let session = StoredSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expires: Utc::now() + chrono::Duration::days(30),
        };
        store.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub async fn user_exists(&self, id: &str) -> bool {
        self.store.read().await.users.contains_key(id)
    }

    /// Total number of records across all tables, orphans included.
    pub async fn record_count(&self) -> usize {
        self.store.read().await.record_count()
    }
}

fn require(present: bool, id: &str) -> Result<(), RepositoryError> {
    if present {
        Ok(())
    } else {
        Err(RepositoryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn delete_user(&self, id: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;

        if store.users.remove(id).is_none() {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        store.profiles.remove(id);
        store.accounts.retain(|_, account| account.user_id != id);
        store.sessions.retain(|_, session| session.user_id != id);

        let trip_ids: Vec<String> = store
            .trips
            .values()
            .filter(|trip| trip.user_id == id)
            .map(|trip| trip.id.clone())
            .collect();
        store.trips.retain(|_, trip| trip.user_id != id);
        store
            .itinerary_stops
            .retain(|_, stop| !trip_ids.contains(&stop.trip_id));

        let chat_ids: Vec<String> = store
            .chats
            .values()
            .filter(|chat| trip_ids.contains(&chat.trip_id))
            .map(|chat| chat.id.clone())
            .collect();
        store.chats.retain(|_, chat| !trip_ids.contains(&chat.trip_id));
        store
            .messages
            .retain(|_, message| !chat_ids.contains(&message.chat_id));

        Ok(())
    }

    async fn dependent_counts(&self, id: &str) -> Result<DependentCounts, RepositoryError> {
        let store = self.store.read().await;

        let trip_ids: Vec<&str> = store
            .trips
            .values()
            .filter(|trip| trip.user_id == id)
            .map(|trip| trip.id.as_str())
            .collect();
        let chat_ids: Vec<&str> = store
            .chats
            .values()
            .filter(|chat| trip_ids.contains(&chat.trip_id.as_str()))
            .map(|chat| chat.id.as_str())
            .collect();

        let count = |n: usize| n as i64;

        Ok(DependentCounts {
            profiles: count(store.profiles.values().filter(|p| p.user_id == id).count()),
            trips: count(trip_ids.len()),
            itinerary_stops: count(
                store
                    .itinerary_stops
                    .values()
                    .filter(|s| trip_ids.contains(&s.trip_id.as_str()))
                    .count(),
            ),
            chats: count(chat_ids.len()),
            messages: count(
                store
                    .messages
                    .values()
                    .filter(|m| chat_ids.contains(&m.chat_id.as_str()))
                    .count(),
            ),
            accounts: count(store.accounts.values().filter(|a| a.user_id == id).count()),
            sessions: count(store.sessions.values().filter(|s| s.user_id == id).count()),
        })
    }
}
