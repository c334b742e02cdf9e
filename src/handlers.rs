use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::{AuthSession, VerifierState, resolve_session},
    error::ApiError,
    models::{DeleteAccountResponse, ErrorResponse, Session},
    pages::PageShell,
    repository::RepositoryState,
};

/// delete_account
///
/// [Authenticated Route] Deletes the caller's account and everything that hangs off
/// it. The identity comes from the session only; the request carries no body.
///
/// *Failure*: any repository error (including an account that is already gone) is
/// logged and answered with a generic 500.
#[utoipa::path(
    delete,
    path = "/api/account",
    responses(
        (status = 200, description = "Account deleted", body = DeleteAccountResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 500, description = "Deletion failed", body = ErrorResponse)
    )
)]
pub async fn delete_account(
    AuthSession(session): AuthSession,
    State(repo): State<RepositoryState>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let user_id = session.user.id;

    repo.delete_user(&user_id)
        .await
        .map_err(ApiError::DeletionFailed)?;

    tracing::info!(user_id = %user_id, "account deleted");

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account deleted successfully".to_string(),
    }))
}

/// get_session
///
/// [Public Route] Returns the caller's session, or `{}` when there is none.
/// `/api` routes bypass the gate, so the session is resolved here.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current session, or an empty object", body = Session))
)]
pub async fn get_session(State(verifier): State<VerifierState>, headers: HeaderMap) -> Response {
    match resolve_session(verifier.as_ref(), &headers).await {
        Some(session) => Json(session).into_response(),
        None => Json(json!({})).into_response(),
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn page_shell(shell: PageShell) -> Html<String> {
    Html(shell.render())
}
