//! Service-level error taxonomy shared by all request handlers.
//!
//! Every handler returns `Result<Json<T>, ServiceError>`; the variants map to
//! distinct HTTP statuses so the client can tell "someone else claimed it
//! first" (409) apart from "no such ticket" (404).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("cannot send message to a closed ticket")]
    ClosedTicket,
    #[error("storage failure: {0}")]
    Storage(#[from] diesel::result::Error),
    #[error("storage failure: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ClosedTicket => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details are logged, never surfaced to the caller.
        let message = match &self {
            Self::Storage(e) => {
                error!("storage error: {e}");
                "internal storage error".to_string()
            }
            Self::Pool(e) => {
                error!("database pool error: {e}");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
