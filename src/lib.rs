//src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::admin::admin_guard;

/// The full HTTP surface: public catalog, chat and lead intake, plus the
/// token-protected admin API and Swagger UI.
pub fn app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let chat_routes = Router::new()
        .route("/sessions", post(handlers::chat::open_session))
        .route("/sessions/{id}", get(handlers::chat::get_session))
        .route("/sessions/{id}/messages", post(handlers::chat::send_message))
        .route("/sessions/{id}/restart", post(handlers::chat::restart_session))
        .route("/sessions/{id}/edit-contact", post(handlers::chat::edit_contact));

    let admin_routes = Router::new()
        .route("/leads", get(handlers::admin::list_leads))
        .route("/leads/{id}/status", patch(handlers::admin::update_lead_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::health::health))
        .route("/api/catalog", get(handlers::catalog::get_catalog))
        .route("/api/catalog/{id}", get(handlers::catalog::get_product))
        .nest("/api/chat", chat_routes)
        .route("/api/lead", post(handlers::lead::create_lead))
        .route("/api/request", post(handlers::lead::create_request))
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
