use crate::{AppState, handlers, pages::SHELLS};
use axum::{Router, routing::get};

/// Page Router Module
///
/// Routes that render HTML. All of them sit behind the request gate, which decides
/// whether a visitor reaches the page or is redirected.
pub fn page_routes() -> Router<AppState> {
    let router = Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health));

    // One route per client-only shell (/app, /map, /auth/login, /auth/signup).
    SHELLS.into_iter().fold(router, |router, shell| {
        router.route(shell.route, get(move || handlers::page_shell(shell)))
    })
}
