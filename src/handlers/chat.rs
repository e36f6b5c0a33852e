// src/handlers/chat.rs

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::client_ip::ClientIp,
    models::chat::ChatSessionView,
    services::chat_service::LeadContext,
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionPayload {
    /// Session id remembered by the widget, if any.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[validate(length(min = 1, max = 2000, message = "Сообщение должно содержать от 1 до 2000 символов."))]
    #[schema(example = "На улице")]
    pub text: String,

    #[serde(default)]
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,

    #[serde(default)]
    #[validate(length(max = 512))]
    pub page_title: Option<String>,
}

fn session_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id).map_err(|e| {
        tracing::debug!("chat session id rejected: {}", e);
        AppError::InvalidSessionId
    })
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    tracing::debug!("chat body rejected: {}", rejection);
    AppError::InvalidJson
}

// =============================================================================
//  SESSIONS
// =============================================================================

// POST /api/chat/sessions
#[utoipa::path(
    post,
    path = "/api/chat/sessions",
    tag = "Chat",
    request_body = OpenSessionPayload,
    responses(
        (status = 200, description = "Restored or newly created session", body = ChatSessionView),
        (status = 400, description = "invalid_json"),
        (status = 429, description = "Too many new sessions from this client")
    )
)]
pub async fn open_session(
    State(app_state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Option<Json<OpenSessionPayload>>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = payload.map_err(invalid_body)?.and_then(|Json(p)| p.session_id);
    let view = app_state.chat_service.open(session_id, &client_ip).await?;
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/chat/sessions/{id}
#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}",
    tag = "Chat",
    params(
        ("id" = Uuid, Path, description = "Chat session id")
    ),
    responses(
        (status = 200, description = "Current session state", body = ChatSessionView),
        (status = 404, description = "Unknown or expired session")
    )
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.chat_service.get(session_id(id)?).await?;
    Ok(Json(view))
}

// POST /api/chat/sessions/{id}/messages
#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/messages",
    tag = "Chat",
    request_body = SendMessagePayload,
    params(
        ("id" = Uuid, Path, description = "Chat session id")
    ),
    responses(
        (status = 200, description = "Session after the bot's reply", body = ChatSessionView),
        (status = 400, description = "invalid_session_id | invalid_json | validation_error | empty_message"),
        (status = 404, description = "Unknown or expired session")
    )
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SendMessagePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = session_id(id)?;
    let Json(payload) = payload.map_err(invalid_body)?;
    payload.validate().map_err(AppError::ValidationError)?;

    let context = LeadContext {
        client_ip,
        page_url: payload.page_url,
        page_title: payload.page_title,
    };

    let view = app_state
        .chat_service
        .send_message(id, &payload.text, context)
        .await?;

    Ok(Json(view))
}

// POST /api/chat/sessions/{id}/restart
#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/restart",
    tag = "Chat",
    params(
        ("id" = Uuid, Path, description = "Chat session id")
    ),
    responses(
        (status = 200, description = "Questionnaire restarted", body = ChatSessionView),
        (status = 404, description = "Unknown or expired session")
    )
)]
pub async fn restart_session(
    State(app_state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.chat_service.restart(session_id(id)?).await?;
    Ok(Json(view))
}

// POST /api/chat/sessions/{id}/edit-contact
#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/edit-contact",
    tag = "Chat",
    params(
        ("id" = Uuid, Path, description = "Chat session id")
    ),
    responses(
        (status = 200, description = "Contact step reopened", body = ChatSessionView),
        (status = 400, description = "Session is not submitted yet"),
        (status = 404, description = "Unknown or expired session")
    )
)]
pub async fn edit_contact(
    State(app_state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.chat_service.edit_contact(session_id(id)?).await?;
    Ok(Json(view))
}
