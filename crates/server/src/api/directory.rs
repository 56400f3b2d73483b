//! Organization, venue and category API handlers.
//!
//! Straightforward CRUD over the directory store; the interesting parts
//! (protect-on-delete, versioned updates) live in the core.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use boxoffice_core::{
    CreateOrganizationRequest, CreateVenueRequest, DirectoryError, EventCategory, Organization,
    UpdateOrganizationRequest, UpdateVenueRequest, Venue,
};

use super::bookings::ApiErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationBody {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub contact_email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationBody {
    pub name: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub expected_version: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateVenueBody {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub capacity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVenueBody {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<u32>,
    pub expected_version: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
}

/// Query parameter shared by the list endpoints
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Include soft-deleted rows
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
    pub website: String,
    pub contact_email: String,
    pub is_active: bool,
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            website: org.website,
            contact_email: org.contact_email,
            is_active: org.meta.is_active,
            version: org.meta.version,
            created_at: org.meta.created_at.to_rfc3339(),
            updated_at: org.meta.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VenueResponse {
    pub id: String,
    pub name: String,
    pub address: String,
    pub capacity: u32,
    pub is_active: bool,
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Venue> for VenueResponse {
    fn from(venue: Venue) -> Self {
        Self {
            id: venue.id,
            name: venue.name,
            address: venue.address,
            capacity: venue.capacity,
            is_active: venue.meta.is_active,
            version: venue.meta.version,
            created_at: venue.meta.created_at.to_rfc3339(),
            updated_at: venue.meta.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub version: u32,
}

impl From<EventCategory> for CategoryResponse {
    fn from(category: EventCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
            is_active: category.meta.is_active,
            version: category.meta.version,
        }
    }
}

/// Map a directory error to an HTTP response.
fn error_response(e: DirectoryError) -> (StatusCode, Json<ApiErrorResponse>) {
    let status = match &e {
        DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
        DirectoryError::DuplicateName(_)
        | DirectoryError::ProtectedReference { .. }
        | DirectoryError::StaleWrite { .. } => StatusCode::CONFLICT,
        DirectoryError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        DirectoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Organization handlers
// ============================================================================

pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrganizationBody>,
) -> Result<(StatusCode, Json<OrganizationResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    let request = CreateOrganizationRequest {
        name: body.name,
        website: body.website,
        contact_email: body.contact_email,
    };

    match state.directory().create_organization(request) {
        Ok(org) => Ok((StatusCode::CREATED, Json(OrganizationResponse::from(org)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().get_organization(&id) {
        Ok(Some(org)) => Ok(Json(OrganizationResponse::from(org))),
        Ok(None) => Err(error_response(DirectoryError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrganizationResponse>>, (StatusCode, Json<ApiErrorResponse>)> {
    let result = if params.include_deleted {
        state.directory().list_all_organizations()
    } else {
        state.directory().list_organizations()
    };

    match result {
        Ok(orgs) => Ok(Json(orgs.into_iter().map(OrganizationResponse::from).collect())),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateOrganizationBody>,
) -> Result<Json<OrganizationResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let request = UpdateOrganizationRequest {
        name: body.name,
        website: body.website,
        contact_email: body.contact_email,
        expected_version: body.expected_version,
    };

    match state.directory().update_organization(&id, request) {
        Ok(org) => Ok(Json(OrganizationResponse::from(org))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().soft_delete_organization(&id) {
        Ok(org) => Ok(Json(OrganizationResponse::from(org))),
        Err(e) => Err(error_response(e)),
    }
}

// ============================================================================
// Venue handlers
// ============================================================================

pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateVenueBody>,
) -> Result<(StatusCode, Json<VenueResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    let request = CreateVenueRequest {
        name: body.name,
        address: body.address,
        capacity: body.capacity,
    };

    match state.directory().create_venue(request) {
        Ok(venue) => Ok((StatusCode::CREATED, Json(VenueResponse::from(venue)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VenueResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().get_venue(&id) {
        Ok(Some(venue)) => Ok(Json(VenueResponse::from(venue))),
        Ok(None) => Err(error_response(DirectoryError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn list_venues(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<VenueResponse>>, (StatusCode, Json<ApiErrorResponse>)> {
    let result = if params.include_deleted {
        state.directory().list_all_venues()
    } else {
        state.directory().list_venues()
    };

    match result {
        Ok(venues) => Ok(Json(venues.into_iter().map(VenueResponse::from).collect())),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateVenueBody>,
) -> Result<Json<VenueResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let request = UpdateVenueRequest {
        name: body.name,
        address: body.address,
        capacity: body.capacity,
        expected_version: body.expected_version,
    };

    match state.directory().update_venue(&id, request) {
        Ok(venue) => Ok(Json(VenueResponse::from(venue))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn delete_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VenueResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().soft_delete_venue(&id) {
        Ok(venue) => Ok(Json(VenueResponse::from(venue))),
        Err(e) => Err(error_response(e)),
    }
}

// ============================================================================
// Category handlers
// ============================================================================

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<(StatusCode, Json<CategoryResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().create_category(&body.name) {
        Ok(category) => Ok((StatusCode::CREATED, Json(CategoryResponse::from(category)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CategoryResponse>>, (StatusCode, Json<ApiErrorResponse>)> {
    let result = if params.include_deleted {
        state.directory().list_all_categories()
    } else {
        state.directory().list_categories()
    };

    match result {
        Ok(categories) => Ok(Json(
            categories.into_iter().map(CategoryResponse::from).collect(),
        )),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CategoryResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.directory().soft_delete_category(&id) {
        Ok(category) => Ok(Json(CategoryResponse::from(category))),
        Err(e) => Err(error_response(e)),
    }
}
