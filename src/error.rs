use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorResponse, repository::RepositoryError};

/// ApiError
///
/// Every failure an API handler can report. The `Display` text of each variant is the
/// message sent to the caller, so it must never carry internal detail.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No session, or a session without a user id.
    #[error("Unauthorized")]
    Unauthorized,

    /// The repository could not delete the account. The source is logged, not returned.
    #[error("Failed to delete account")]
    DeletionFailed(#[source] RepositoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::DeletionFailed(e) => {
                tracing::error!("Error deleting account: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
