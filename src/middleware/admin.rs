// src/middleware/admin.rs

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState};

/// Lets a request through only with `Authorization: Bearer <ADMIN_TOKEN>`.
/// Without a configured token the admin API is closed.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = app_state.settings.admin_token.as_deref() else {
        tracing::warn!("admin request rejected: ADMIN_TOKEN is not set");
        return Err(AppError::Unauthorized);
    };

    match bearer {
        Some(TypedHeader(Authorization(token))) if constant_time_eq(token.token(), expected) => {
            Ok(next.run(request).await)
        }
        _ => Err(AppError::Unauthorized),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
