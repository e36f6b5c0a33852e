// src/handlers/catalog.rs

use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::{CatalogItemView, CatalogView},
    services::{catalog_service::item_view, query_state::CatalogQuery},
};

// GET /api/catalog
#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "Catalog",
    params(
        ("type" = Option<String>, Query, description = "Partition: modules | displays"),
        ("sort" = Option<String>, Query, description = "name_asc | price_asc | price_desc | pitch_asc"),
        ("env" = Option<String>, Query, description = "Comma-separated values, e.g. indoor,outdoor"),
        ("pitch" = Option<String>, Query, description = "Comma-separated pitches in mm, e.g. 1.5,4")
    ),
    responses(
        (status = 200, description = "Filtered and sorted catalog with facets and canonical links", body = CatalogView)
    )
)]
pub async fn get_catalog(
    State(app_state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = CatalogQuery::parse(query.as_deref().unwrap_or_default());
    let view = app_state.catalog_service.view(query);
    Ok(Json(view))
}

// GET /api/catalog/{id}
#[utoipa::path(
    get,
    path = "/api/catalog/{id}",
    tag = "Catalog",
    params(
        ("id" = String, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product card", body = CatalogItemView),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .catalog_service
        .find(&id)
        .ok_or(AppError::ProductNotFound)?;

    Ok(Json(item_view(product)))
}
