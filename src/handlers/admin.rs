// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::lead::{Lead, LeadStatus, UpdateLeadStatusPayload},
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLeadsQuery {
    /// Only leads with this status.
    pub status: Option<LeadStatus>,
    /// Page size, 1..=500 (default 100).
    pub limit: Option<i64>,
}

// GET /api/admin/leads
#[utoipa::path(
    get,
    path = "/api/admin/leads",
    tag = "Admin",
    params(ListLeadsQuery),
    responses(
        (status = 200, description = "Newest leads first", body = Vec<Lead>),
        (status = 401, description = "Missing or wrong admin token"),
        (status = 503, description = "No database configured")
    ),
    security(("admin_token" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = app_state
        .lead_repo
        .as_ref()
        .ok_or(AppError::DatabaseNotConfigured)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let leads = repo.list(query.status, limit).await?;

    Ok(Json(leads))
}

// PATCH /api/admin/leads/{id}/status
#[utoipa::path(
    patch,
    path = "/api/admin/leads/{id}/status",
    tag = "Admin",
    request_body = UpdateLeadStatusPayload,
    params(
        ("id" = Uuid, Path, description = "Lead id")
    ),
    responses(
        (status = 200, description = "Updated lead", body = Lead),
        (status = 401, description = "Missing or wrong admin token"),
        (status = 404, description = "Unknown lead"),
        (status = 503, description = "No database configured")
    ),
    security(("admin_token" = []))
)]
pub async fn update_lead_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLeadStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let repo = app_state
        .lead_repo
        .as_ref()
        .ok_or(AppError::DatabaseNotConfigured)?;

    let lead = repo.update_status(id, payload.status).await?;
    tracing::info!(lead_id = %lead.id, status = ?lead.status, "lead status updated");

    Ok(Json(lead))
}
