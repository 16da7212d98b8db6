//! HTTP-facing error type.
//!
//! Every variant renders as `{"error": "<code>"}` with a fixed status, so clients
//! can branch on the machine code without parsing messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::confirm::ConfirmError;
use crate::core::session::RegistryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("answer is required")]
    AnswerRequired,

    #[error("no pending confirmation")]
    NoPendingConfirmation,

    #[error("confirmation failed: {0}")]
    ConfirmFailed(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AnswerRequired | AppError::UnknownEvent(_) => StatusCode::BAD_REQUEST,
            AppError::NoPendingConfirmation => StatusCode::CONFLICT,
            AppError::ConfirmFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AnswerRequired => "answer_required",
            AppError::NoPendingConfirmation => "no_pending_confirmation",
            AppError::ConfirmFailed(_) => "confirm_failed",
            AppError::UnknownEvent(_) => "unknown_event",
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NoPendingConfirmation => AppError::NoPendingConfirmation,
        }
    }
}

impl From<ConfirmError> for AppError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::NoPendingConfirmation => AppError::NoPendingConfirmation,
            ConfirmError::Payment(e) => AppError::ConfirmFailed(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        }
        (status, Json(json!({ "error": self.code() }))).into_response()
    }
}
