// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    db::session_store::StoreError,
    services::{chat_flow::ChatError, notifier::NotifyError},
};

// Every failure a handler can surface. The response body is always
// `{ "ok": false, "error": <code> }`, plus `details` for validation errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("request body is not valid JSON")]
    InvalidJson,

    #[error("request body is not a valid form")]
    InvalidForm,

    #[error("contact is required")]
    ContactRequired,

    #[error("contact is neither a phone number nor an e-mail")]
    InvalidContact,

    #[error("consent to personal data processing is required")]
    ConsentRequired,

    #[error("rate limit exceeded")]
    TooManyRequests,

    #[error("admin token missing or invalid")]
    Unauthorized,

    #[error("chat session id is malformed")]
    InvalidSessionId,

    #[error("chat session not found")]
    SessionNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("lead not found")]
    LeadNotFound,

    #[error("database is not configured")]
    DatabaseNotConfigured,

    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("session store error: {0}")]
    SessionStore(#[from] StoreError),

    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidJson
            | AppError::InvalidForm
            | AppError::ContactRequired
            | AppError::InvalidContact
            | AppError::ConsentRequired
            | AppError::InvalidSessionId
            | AppError::Chat(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::SessionNotFound | AppError::ProductNotFound | AppError::LeadNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::DatabaseNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Notify(_)
            | AppError::DatabaseError(_)
            | AppError::SessionStore(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidJson => "invalid_json",
            AppError::InvalidForm => "invalid_form",
            AppError::ContactRequired => "contact_required",
            AppError::InvalidContact => "invalid_contact",
            AppError::ConsentRequired => "consent_required",
            AppError::TooManyRequests => "too_many_requests",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidSessionId => "invalid_session_id",
            AppError::SessionNotFound => "session_not_found",
            AppError::ProductNotFound => "product_not_found",
            AppError::LeadNotFound => "lead_not_found",
            AppError::DatabaseNotConfigured => "database_not_configured",
            AppError::Chat(ChatError::EmptyMessage) => "empty_message",
            AppError::Chat(ChatError::InvalidTransition { .. }) => "invalid_transition",
            AppError::Notify(NotifyError::NotConfigured) => "telegram_not_configured",
            AppError::Notify(_) => "telegram_error",
            AppError::DatabaseError(_) | AppError::SessionStore(_) | AppError::InternalServerError(_) => {
                "internal_error"
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::ValidationError(errors) = &self {
            let mut details = HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "ok": false,
                "error": self.code(),
                "details": details,
            }));
            return (status, body).into_response();
        }

        // The underlying message stays in the server log only.
        if status.is_server_error() {
            tracing::error!("Internal server error: {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected");
        }

        let body = Json(json!({ "ok": false, "error": self.code() }));
        (status, body).into_response()
    }
}
