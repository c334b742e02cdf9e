use sqlx::PgPool;
use superglobal_web::{
    models::DependentCounts,
    repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryError},
};
use uuid::Uuid;

// --- In-Memory Repository ---

#[tokio::test]
async fn test_in_memory_cascade_round_trip() {
    let repo = InMemoryRepository::new();
    let user = repo.insert_user("cascade@example.com", None).await;

    repo.insert_profile(&user.id, Some("JP")).await.unwrap();
    for title in ["Tokyo", "Kyoto"] {
        let trip = repo.insert_trip(&user.id, title).await.unwrap();
        repo.insert_itinerary_stop(&trip.id, "Station").await.unwrap();
        repo.insert_itinerary_stop(&trip.id, "Temple").await.unwrap();
        let chat = repo.insert_chat(&trip.id, "Ideas").await.unwrap();
        repo.insert_message(&chat.id, "Ramen?").await.unwrap();
        repo.insert_message(&chat.id, "Ramen.").await.unwrap();
    }
    repo.insert_account(&user.id, "credentials").await.unwrap();
    repo.insert_session(&user.id).await.unwrap();

    assert_eq!(
        repo.dependent_counts(&user.id).await.unwrap(),
        DependentCounts {
            profiles: 1,
            trips: 2,
            itinerary_stops: 4,
            chats: 2,
            messages: 4,
            accounts: 1,
            sessions: 1,
        }
    );

    repo.delete_user(&user.id).await.unwrap();

    assert_eq!(repo.dependent_counts(&user.id).await.unwrap().total(), 0);
    // No orphans anywhere, not just none reachable from the user.
    assert_eq!(repo.record_count().await, 0);
}

#[tokio::test]
async fn test_in_memory_delete_missing_user() {
    let repo = InMemoryRepository::new();

    let result = repo.delete_user("nobody").await;

    assert!(matches!(result, Err(RepositoryError::NotFound(id)) if id == "nobody"));
}

#[tokio::test]
async fn test_in_memory_inserts_require_parent() {
    let repo = InMemoryRepository::new();

    assert!(matches!(
        repo.insert_trip("ghost", "Nowhere").await,
        Err(RepositoryError::NotFound(_))
    ));
    assert!(matches!(
        repo.insert_message("ghost-chat", "hello").await,
        Err(RepositoryError::NotFound(_))
    ));
    assert_eq!(repo.record_count().await, 0);
}

// --- Postgres Repository (requires DATABASE_URL) ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        let context = DbTestContext { pool };
        context
            .repository()
            .migrate()
            .await
            .expect("Failed to run database migrations.");
        context
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

/// Inserts a user with one of every dependent record; returns (user_id, trip_id, chat_id).
async fn create_test_account(pool: &PgPool) -> (String, String, String) {
    let user_id = Uuid::new_v4().to_string();
    let trip_id = Uuid::new_v4().to_string();
    let chat_id = Uuid::new_v4().to_string();

    let statements = [
        (
            "INSERT INTO users (id, email) VALUES ($1, $2)",
            vec![user_id.clone(), format!("{}@test.com", user_id)],
        ),
        (
            "INSERT INTO profiles (user_id) VALUES ($1)",
            vec![user_id.clone()],
        ),
        (
            "INSERT INTO trips (id, user_id, title) VALUES ($1, $2, 'Test trip')",
            vec![trip_id.clone(), user_id.clone()],
        ),
        (
            "INSERT INTO itinerary_stops (id, trip_id, name) VALUES ($1, $2, 'Stop')",
            vec![Uuid::new_v4().to_string(), trip_id.clone()],
        ),
        (
            "INSERT INTO chats (id, trip_id, title) VALUES ($1, $2, 'Chat')",
            vec![chat_id.clone(), trip_id.clone()],
        ),
        (
            "INSERT INTO messages (id, chat_id, body) VALUES ($1, $2, 'Hi')",
            vec![Uuid::new_v4().to_string(), chat_id.clone()],
        ),
        (
            "INSERT INTO accounts (id, user_id, provider) VALUES ($1, $2, 'google')",
            vec![Uuid::new_v4().to_string(), user_id.clone()],
        ),
        (
            "INSERT INTO sessions (id, user_id, expires) \
             VALUES ($1, $2, now() + interval '1 day')",
            vec![Uuid::new_v4().to_string(), user_id.clone()],
        ),
    ];

    for (sql, binds) in statements {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(value);
        }
        query.execute(pool).await.expect("Failed to seed test account");
    }

    (user_id, trip_id, chat_id)
}

async fn count(pool: &PgPool, sql: &str, id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_delete_cascades() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let (user_id, trip_id, chat_id) = create_test_account(&ctx.pool).await;

    assert_eq!(repo.dependent_counts(&user_id).await.unwrap().total(), 7);

    repo.delete_user(&user_id).await.unwrap();

    assert_eq!(repo.dependent_counts(&user_id).await.unwrap().total(), 0);
    // Grandchildren are checked by parent id so orphans would show up.
    let orphans = [
        ("SELECT COUNT(*) FROM itinerary_stops WHERE trip_id = $1", &trip_id),
        ("SELECT COUNT(*) FROM chats WHERE trip_id = $1", &trip_id),
        ("SELECT COUNT(*) FROM messages WHERE chat_id = $1", &chat_id),
    ];
    for (sql, parent_id) in orphans {
        assert_eq!(count(&ctx.pool, sql, parent_id).await, 0, "{}", sql);
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_delete_missing_user() {
    let ctx = DbTestContext::setup().await;

    let result = ctx.repository().delete_user(&Uuid::new_v4().to_string()).await;

    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
}
