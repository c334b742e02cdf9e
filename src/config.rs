use std::env;

/// Secret used to sign session tokens when running locally without `SESSION_SECRET`.
pub const LOCAL_SESSION_SECRET: &str = "super-secure-test-secret-value-local";

/// Origin allowed to call the `/api` routes when `APP_URL` is not set.
pub const DEFAULT_APP_URL: &str = "https://superglobal.travel";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only with every request through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` in local mode selects the in-memory repository.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls HSTS and the log format.
    pub env: Env,
    // Secret used to verify incoming session tokens (HS256).
    pub session_secret: String,
    // The single origin allowed by the CORS policy on `/api` routes.
    pub app_url: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Directory holding client bundles, images and the favicon.
    pub static_dir: String,
}

/// Env
///
/// Defines the runtime context: local development or a production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    pub fn is_production(&self) -> bool {
        *self == Env::Production
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            app_url: "http://localhost:3000".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            static_dir: "public".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables and fails fast on an
    /// incomplete production configuration.
    ///
    /// # Panics
    /// Panics in production if `SESSION_SECRET` or `DATABASE_URL` is missing.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (session_secret, db_url) = match env {
            Env::Production => (
                env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
            ),
            Env::Local => (
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                env::var("DATABASE_URL").ok(),
            ),
        };

        Self {
            env,
            db_url,
            session_secret,
            app_url: env::var("APP_URL").unwrap_or_else(|_| DEFAULT_APP_URL.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
        }
    }
}
