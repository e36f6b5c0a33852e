// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Catalog ---
        handlers::catalog::get_catalog,
        handlers::catalog::get_product,

        // --- Chat ---
        handlers::chat::open_session,
        handlers::chat::get_session,
        handlers::chat::send_message,
        handlers::chat::restart_session,
        handlers::chat::edit_contact,

        // --- Leads ---
        handlers::lead::create_lead,
        handlers::lead::create_request,

        // --- Admin ---
        handlers::admin::list_leads,
        handlers::admin::update_lead_status,
    ),
    components(
        schemas(
            // --- Health ---
            handlers::health::HealthResponse,
            handlers::health::DatabaseHealth,

            // --- Catalog ---
            models::catalog::Environment,
            models::catalog::Availability,
            models::catalog::CatalogType,
            models::catalog::SortMode,
            models::catalog::Facet,
            models::catalog::CatalogItemView,
            models::catalog::FacetValueView,
            models::catalog::FacetView,
            models::catalog::SortOptionView,
            models::catalog::PartitionView,
            models::catalog::CatalogView,

            // --- Chat ---
            models::chat::ChatStep,
            models::chat::ChatAnswers,
            models::chat::ChatMessage,
            models::chat::ChatSessionView,
            handlers::chat::OpenSessionPayload,
            handlers::chat::SendMessagePayload,

            // --- Leads ---
            models::lead::MessageRole,
            models::lead::HistoryItem,
            models::lead::PayloadSource,
            models::lead::LeadPayload,
            models::lead::RequestFormPayload,
            models::lead::LeadResponse,
            models::lead::Integrations,
            models::lead::RequestResponse,

            // --- Admin ---
            models::lead::LeadSource,
            models::lead::LeadStatus,
            models::lead::Lead,
            models::lead::UpdateLeadStatusPayload,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database check"),
        (name = "Catalog", description = "LED modules and displays with filters and sorting"),
        (name = "Chat", description = "Scripted consultant questionnaire"),
        (name = "Leads", description = "Chat leads and product request forms"),
        (name = "Admin", description = "Stored leads, requires ADMIN_TOKEN")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
