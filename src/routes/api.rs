use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// API Router Module
///
/// Everything under `/api/`. The request gate lets these through without a session
/// check, so each handler that needs an identity takes the `AuthSession` extractor
/// (401 on failure) or resolves the session itself.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // DELETE /api/account
        // Irreversibly deletes the signed-in user's account and all dependent records.
        .route("/api/account", delete(handlers::delete_account))
        // GET /api/auth/session
        // The session object the front end polls; `{}` when signed out.
        .route("/api/auth/session", get(handlers::get_session))
}
