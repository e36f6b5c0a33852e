// src/handlers/lead.rs

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    response::IntoResponse,
    Form, Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::client_ip::ClientIp,
    models::lead::{LeadPayload, LeadResponse, RequestFormPayload, RequestResponse},
    services::lead_service::LeadSubmitter,
};

// POST /api/lead
#[utoipa::path(
    post,
    path = "/api/lead",
    tag = "Leads",
    request_body = LeadPayload,
    responses(
        (status = 200, description = "Lead delivered", body = LeadResponse),
        (status = 400, description = "invalid_json | contact_required | invalid_contact"),
        (status = 429, description = "too_many_requests"),
        (status = 500, description = "telegram_not_configured | telegram_error | internal_error")
    )
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<LeadPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!("lead body rejected: {}", e);
        AppError::InvalidJson
    })?;

    app_state
        .lead_service
        .submit_chat_lead(&client_ip, payload)
        .await?;

    Ok(Json(LeadResponse { ok: true }))
}

// POST /api/request
#[utoipa::path(
    post,
    path = "/api/request",
    tag = "Leads",
    request_body(content = RequestFormPayload, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Request accepted", body = RequestResponse),
        (status = 400, description = "consent_required | validation_error"),
        (status = 429, description = "too_many_requests")
    )
)]
pub async fn create_request(
    State(app_state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    form: Result<Form<RequestFormPayload>, FormRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Form(form) = form.map_err(|e| {
        tracing::debug!("request form rejected: {}", e);
        AppError::InvalidForm
    })?;

    let integrations = app_state
        .lead_service
        .submit_request_form(&client_ip, form)
        .await?;

    Ok(Json(RequestResponse {
        ok: true,
        integrations,
    }))
}
