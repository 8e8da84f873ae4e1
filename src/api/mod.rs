//! Route table and OpenAPI document.

use crate::handlers::{self, AppState};
use crate::models::{
    Confirmation, ContactInput, ContactView, ProfessionalInput, ProfessionalView, Role,
};
use axum::{routing::get, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_professional,
        handlers::create_professional,
        handlers::update_professional,
        handlers::delete_professional,
        handlers::search_professionals,
        handlers::search_professionals_by_role,
        handlers::get_contact,
        handlers::create_contact,
        handlers::update_contact,
        handlers::delete_contact,
        handlers::search_contacts,
    ),
    components(schemas(
        Role,
        ProfessionalInput,
        ContactInput,
        ProfessionalView,
        ContactView,
        Confirmation
    )),
    tags(
        (name = "professionals", description = "Professionals and their contact lists"),
        (name = "contacts", description = "Standalone contact records"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Builds the application routes with Swagger UI at `/docs`.
///
/// Transport layers (tracing, CORS, rate limiting, body limit) are added by the
/// binary so this router can be driven directly in tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/professionals",
            get(handlers::search_professionals)
                .post(handlers::create_professional)
                .put(handlers::update_professional),
        )
        .route(
            "/api/v1/professionals/role",
            get(handlers::search_professionals_by_role),
        )
        .route(
            "/api/v1/professionals/:id",
            get(handlers::get_professional).delete(handlers::delete_professional),
        )
        .route(
            "/api/v1/contacts",
            get(handlers::search_contacts)
                .post(handlers::create_contact)
                .put(handlers::update_contact),
        )
        .route(
            "/api/v1/contacts/:id",
            get(handlers::get_contact).delete(handlers::delete_contact),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
