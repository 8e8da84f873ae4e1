use crate::contact_service::ContactService;
use crate::errors::AppError;
use crate::gateway::RecordStore;
use crate::models::*;
use crate::professional_service::ProfessionalService;
use axum::{
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway shared by every request.
    pub store: Arc<dyn RecordStore>,
}

/// JSON request body. Malformed payloads are rejected as invalid input.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

impl AppState {
    fn professionals(&self) -> ProfessionalService {
        ProfessionalService::new(Arc::clone(&self.store))
    }

    fn contacts(&self) -> ContactService {
        ContactService::new(Arc::clone(&self.store))
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "professional-registry",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Professionals ============

/// GET /api/v1/professionals/:id
///
/// Returns the professional with its contacts.
#[utoipa::path(
    get,
    path = "/api/v1/professionals/{id}",
    params(("id" = i64, Path, description = "Professional id")),
    responses(
        (status = 200, description = "Professional found", body = ProfessionalView),
        (status = 404, description = "Professional not found")
    ),
    tag = "professionals"
)]
pub async fn get_professional(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProfessionalView>, AppError> {
    tracing::info!("GET /professionals/{}", id);
    let professional = state.professionals().fetch_by_id(id).await?;
    Ok(Json(professional))
}

/// POST /api/v1/professionals
///
/// Creates a professional and the contacts listed with it.
#[utoipa::path(
    post,
    path = "/api/v1/professionals",
    request_body = ProfessionalInput,
    responses(
        (status = 201, description = "Professional created", body = Confirmation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "A listed contact does not exist")
    ),
    tag = "professionals"
)]
pub async fn create_professional(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ProfessionalInput>,
) -> Result<(StatusCode, Json<Confirmation>), AppError> {
    tracing::info!("POST /professionals - name: {:?}", input.name);
    let confirmation = state.professionals().create(input).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// PUT /api/v1/professionals
///
/// Replaces a professional and its whole contact list.
#[utoipa::path(
    put,
    path = "/api/v1/professionals",
    request_body = ProfessionalInput,
    responses(
        (status = 200, description = "Professional updated", body = Confirmation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Professional or listed contact not found")
    ),
    tag = "professionals"
)]
pub async fn update_professional(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ProfessionalInput>,
) -> Result<Json<Confirmation>, AppError> {
    tracing::info!("PUT /professionals - id: {:?}", input.id);
    let confirmation = state.professionals().update(input).await?;
    Ok(Json(confirmation))
}

/// DELETE /api/v1/professionals/:id
#[utoipa::path(
    delete,
    path = "/api/v1/professionals/{id}",
    params(("id" = i64, Path, description = "Professional id")),
    responses(
        (status = 200, description = "Professional and its contacts deleted", body = Confirmation),
        (status = 404, description = "Professional not found")
    ),
    tag = "professionals"
)]
pub async fn delete_professional(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Confirmation>, AppError> {
    tracing::info!("DELETE /professionals/{}", id);
    let confirmation = state.professionals().delete(id).await?;
    Ok(Json(confirmation))
}

/// GET /api/v1/professionals?name=
#[utoipa::path(
    get,
    path = "/api/v1/professionals",
    params(ProfessionalNameQuery),
    responses(
        (status = 200, description = "Matching professionals", body = [ProfessionalView]),
        (status = 400, description = "Missing name")
    ),
    tag = "professionals"
)]
pub async fn search_professionals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProfessionalNameQuery>,
) -> Result<Json<Vec<ProfessionalView>>, AppError> {
    tracing::info!("GET /professionals - params: {:?}", params);
    let name = params
        .name
        .ok_or_else(|| AppError::InvalidInput("Query parameter 'name' is required".to_string()))?;
    let found = state.professionals().search(&name).await?;
    Ok(Json(found))
}

/// GET /api/v1/professionals/role?role=
#[utoipa::path(
    get,
    path = "/api/v1/professionals/role",
    params(ProfessionalRoleQuery),
    responses(
        (status = 200, description = "Professionals with the role", body = [ProfessionalView]),
        (status = 400, description = "Missing or unknown role")
    ),
    tag = "professionals"
)]
pub async fn search_professionals_by_role(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProfessionalRoleQuery>,
) -> Result<Json<Vec<ProfessionalView>>, AppError> {
    tracing::info!("GET /professionals/role - params: {:?}", params);
    let role = params
        .role
        .ok_or_else(|| AppError::InvalidInput("Query parameter 'role' is required".to_string()))?
        .parse::<Role>()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let found = state.professionals().search_by_role(role).await?;
    Ok(Json(found))
}

// ============ Contacts ============

/// GET /api/v1/contacts/:id
#[utoipa::path(
    get,
    path = "/api/v1/contacts/{id}",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact found", body = ContactView),
        (status = 404, description = "Contact not found")
    ),
    tag = "contacts"
)]
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ContactView>, AppError> {
    tracing::info!("GET /contacts/{}", id);
    let contact = state.contacts().fetch_by_id(id).await?;
    Ok(Json(contact))
}

/// POST /api/v1/contacts
#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    request_body = ContactInput,
    responses(
        (status = 201, description = "Contact created", body = Confirmation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Owning professional not found")
    ),
    tag = "contacts"
)]
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ContactInput>,
) -> Result<(StatusCode, Json<Confirmation>), AppError> {
    tracing::info!("POST /contacts - owner: {:?}", input.owner_id);
    let confirmation = state.contacts().create(input).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// PUT /api/v1/contacts
#[utoipa::path(
    put,
    path = "/api/v1/contacts",
    request_body = ContactInput,
    responses(
        (status = 200, description = "Contact updated", body = Confirmation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Contact or owning professional not found")
    ),
    tag = "contacts"
)]
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ContactInput>,
) -> Result<Json<Confirmation>, AppError> {
    tracing::info!("PUT /contacts - id: {:?}", input.id);
    let confirmation = state.contacts().update(input).await?;
    Ok(Json(confirmation))
}

/// DELETE /api/v1/contacts/:id
#[utoipa::path(
    delete,
    path = "/api/v1/contacts/{id}",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact deleted", body = Confirmation),
        (status = 404, description = "Contact not found")
    ),
    tag = "contacts"
)]
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Confirmation>, AppError> {
    tracing::info!("DELETE /contacts/{}", id);
    let confirmation = state.contacts().delete(id).await?;
    Ok(Json(confirmation))
}

/// GET /api/v1/contacts?name=&contactValue=
///
/// `name` wins when both are given; at least one is required.
#[utoipa::path(
    get,
    path = "/api/v1/contacts",
    params(ContactSearchQuery),
    responses(
        (status = 200, description = "Matching contacts", body = [ContactView]),
        (status = 400, description = "Neither name nor contactValue given")
    ),
    tag = "contacts"
)]
pub async fn search_contacts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContactSearchQuery>,
) -> Result<Json<Vec<ContactView>>, AppError> {
    tracing::info!("GET /contacts - params: {:?}", params);
    let found = state
        .contacts()
        .search(params.name.as_deref(), params.contact_value.as_deref())
        .await?;
    Ok(Json(found))
}
