use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod repository;

pub mod routes;
use routes::{api, pages as page_router};

// --- Public Re-exports ---

pub use auth::{JwtSessionVerifier, SessionVerifier, VerifierState};
pub use config::AppConfig;
pub use gate::{GateState, RequestGate, RouteRules};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the `/api` handlers, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::delete_account, handlers::get_session),
    components(
        schemas(
            models::DeleteAccountResponse, models::ErrorResponse,
            models::Session, models::SessionUser,
        )
    ),
    tags(
        (name = "superglobal", description = "Superglobal web API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for everything handlers and middleware need.
#[derive(Clone)]
pub struct AppState {
    /// Account persistence.
    pub repo: RepositoryState,
    /// Session token verification, shared by the gate and the API extractors.
    pub verifier: VerifierState,
    /// The page gate, built from the same verifier.
    pub gate: GateState,
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Builds the gate with the default route tables. HSTS is enabled exactly when
    /// the configuration says production.
    pub fn new(config: AppConfig, repo: RepositoryState, verifier: VerifierState) -> Self {
        let gate = Arc::new(RequestGate::new(
            RouteRules::default(),
            verifier.clone(),
            config.env.is_production(),
        ));

        Self {
            repo,
            verifier,
            gate,
            config,
        }
    }

    /// Production wiring: verifier keyed by the configured session secret.
    pub fn with_jwt(config: AppConfig, repo: RepositoryState) -> Self {
        let verifier = Arc::new(JwtSessionVerifier::new(&config.session_secret)) as VerifierState;
        Self::new(config, repo, verifier)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, wraps it in the request gate, and applies the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(page_router::page_routes())
        // CORS only applies to the API tree.
        .merge(api::api_routes().layer(api_cors(&state.config)))
        // Bundles, images and the favicon. Excluded from the gate by its matcher.
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .with_state(state.clone());

    base_router
        // The gate wraps every route including the static fallback, so its matcher
        // exclusion decides what it skips.
        .layer(middleware::from_fn_with_state(state.gate.clone(), gate::request_gate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis)
                        )
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
        )
}

/// api_cors
///
/// Same-origin policy for `/api`: only the configured app URL, with credentials so
/// the session cookie travels.
fn api_cors(config: &AppConfig) -> CorsLayer {
    let origin = HeaderValue::from_str(&config.app_url).unwrap_or_else(|_| {
        tracing::warn!("APP_URL {:?} is not a valid origin, using default", config.app_url);
        HeaderValue::from_static(config::DEFAULT_APP_URL)
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the request id, so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
