//! Event and ticket-tier API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use boxoffice_core::{
    AuditEvent, CreateEventRequest, CreateTierRequest, Event, EventError, EventFilter,
    EventStatus, TicketTier, TicketType, UpdateEventRequest,
};

use super::bookings::ApiErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for event queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for event queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating an event
#[derive(Debug, Deserialize)]
pub struct CreateEventBody {
    pub organization_id: String,
    pub venue_id: String,
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<u32>,
}

/// Request body for updating an event
#[derive(Debug, Deserialize)]
pub struct UpdateEventBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    /// Version the caller read; the update fails on mismatch.
    pub expected_version: u32,
}

/// Query parameters for listing events
#[derive(Debug, Deserialize)]
pub struct ListEventsParams {
    pub status: Option<EventStatus>,
    pub organization_id: Option<String>,
    /// Only events that have not yet started
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for creating a ticket tier
#[derive(Debug, Deserialize)]
pub struct CreateTierBody {
    pub ticket_type: TicketType,
    pub price: Decimal,
    pub quota: u32,
}

/// Request body for adjusting a tier quota
#[derive(Debug, Deserialize)]
pub struct AdjustQuotaBody {
    pub quota: u32,
}

/// Response for event operations
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub organization_id: String,
    pub venue_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub starts_at: String,
    pub ends_at: String,
    pub status: EventStatus,
    pub capacity: Option<u32>,
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            organization_id: event.organization_id,
            venue_id: event.venue_id,
            category_id: event.category_id,
            title: event.title,
            description: event.description,
            starts_at: event.starts_at.to_rfc3339(),
            ends_at: event.ends_at.to_rfc3339(),
            status: event.status,
            capacity: event.capacity,
            version: event.meta.version,
            created_at: event.meta.created_at.to_rfc3339(),
            updated_at: event.meta.updated_at.to_rfc3339(),
        }
    }
}

/// Response for cancelling an event
#[derive(Debug, Serialize)]
pub struct CancelEventResponse {
    pub event: EventResponse,
    pub cancelled_bookings: u64,
    pub released_seats: u64,
}

/// Response for tier operations
#[derive(Debug, Serialize)]
pub struct TierResponse {
    pub id: String,
    pub event_id: String,
    pub ticket_type: TicketType,
    pub price: Decimal,
    pub quota: u32,
    pub sold: u32,
    pub available: u32,
    pub version: u32,
}

impl From<TicketTier> for TierResponse {
    fn from(tier: TicketTier) -> Self {
        let available = tier.available();
        Self {
            id: tier.id,
            event_id: tier.event_id,
            ticket_type: tier.ticket_type,
            price: tier.price,
            quota: tier.quota,
            sold: tier.sold,
            available,
            version: tier.meta.version,
        }
    }
}

/// Response for listing events
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    pub events: Vec<EventResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Map an event error to an HTTP response.
fn error_response(e: EventError) -> (StatusCode, Json<ApiErrorResponse>) {
    let status = match &e {
        EventError::NotFound(_) => StatusCode::NOT_FOUND,
        EventError::InvalidSchedule
        | EventError::InvalidPrice(_)
        | EventError::UnknownReference(_) => StatusCode::BAD_REQUEST,
        EventError::DuplicateTitle(_)
        | EventError::DuplicateTierType(_)
        | EventError::NotDraft { .. }
        | EventError::NoTicketTiers
        | EventError::EventAlreadyStarted
        | EventError::AlreadyCancelled
        | EventError::EventCancelled
        | EventError::QuotaBelowSold { .. }
        | EventError::ProtectedByBookings { .. }
        | EventError::StaleWrite { .. } => StatusCode::CONFLICT,
        EventError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        EventError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new draft event
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEventBody>,
) -> Result<(StatusCode, Json<EventResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    let request = CreateEventRequest {
        organization_id: body.organization_id,
        venue_id: body.venue_id,
        category_id: body.category_id,
        title: body.title,
        description: body.description,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        capacity: body.capacity,
    };

    match state.events().create(request) {
        Ok(event) => Ok((StatusCode::CREATED, Json(EventResponse::from(event)))),
        Err(e) => Err(error_response(e)),
    }
}

/// Get an event by ID
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().get(&id) {
        Ok(Some(event)) => Ok(Json(EventResponse::from(event))),
        Ok(None) => Err(error_response(EventError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

/// List events with optional filters
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<ListEventsResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = EventFilter::new().with_limit(limit).with_offset(offset);

    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }

    if let Some(ref organization_id) = params.organization_id {
        filter = filter.with_organization(organization_id.as_str());
    }

    if params.upcoming {
        filter = filter.upcoming();
    }

    let events = state.events().list(&filter).map_err(error_response)?;

    let count_filter = EventFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state.events().count(&count_filter).map_err(error_response)?;

    Ok(Json(ListEventsResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Update an event's editable fields (versioned)
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateEventBody>,
) -> Result<Json<EventResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let request = UpdateEventRequest {
        title: body.title,
        description: body.description,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        capacity: body.capacity,
        expected_version: body.expected_version,
    };

    match state.events().update(&id, request) {
        Ok(event) => Ok(Json(EventResponse::from(event))),
        Err(e) => Err(error_response(e)),
    }
}

/// Publish a draft event
pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().publish(&id) {
        Ok(event) => {
            state.audit().try_emit(AuditEvent::EventPublished {
                event_id: event.id.clone(),
                title: event.title.clone(),
            });

            Ok(Json(EventResponse::from(event)))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Cancel an event, cascading over its outstanding bookings
pub async fn cancel_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancelEventResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().cancel(&id) {
        Ok(outcome) => {
            state.audit().try_emit(AuditEvent::EventCancelled {
                event_id: outcome.event.id.clone(),
                cancelled_bookings: outcome.cancelled_bookings,
                released_seats: outcome.released_seats,
            });

            Ok(Json(CancelEventResponse {
                event: EventResponse::from(outcome.event),
                cancelled_bookings: outcome.cancelled_bookings,
                released_seats: outcome.released_seats,
            }))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Soft-delete an event
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().soft_delete(&id) {
        Ok(event) => Ok(Json(EventResponse::from(event))),
        Err(e) => Err(error_response(e)),
    }
}

/// Add a ticket tier to an event
pub async fn create_tier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CreateTierBody>,
) -> Result<(StatusCode, Json<TierResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    let request = CreateTierRequest {
        ticket_type: body.ticket_type,
        price: body.price,
        quota: body.quota,
    };

    match state.events().create_tier(&id, request) {
        Ok(tier) => {
            state.audit().try_emit(AuditEvent::TierCreated {
                tier_id: tier.id.clone(),
                event_id: tier.event_id.clone(),
                ticket_type: tier.ticket_type.as_str().to_string(),
                quota: tier.quota,
            });

            Ok((StatusCode::CREATED, Json(TierResponse::from(tier))))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// All live tiers of an event
pub async fn list_tiers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TierResponse>>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().list_tiers(&id) {
        Ok(tiers) => Ok(Json(tiers.into_iter().map(TierResponse::from).collect())),
        Err(e) => Err(error_response(e)),
    }
}

/// Tiers of an event that still have availability, cheapest first
pub async fn available_tiers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TierResponse>>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().available_tiers(&id) {
        Ok(tiers) => Ok(Json(tiers.into_iter().map(TierResponse::from).collect())),
        Err(e) => Err(error_response(e)),
    }
}

/// Get a tier by ID
pub async fn get_tier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TierResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.events().get_tier(&id) {
        Ok(Some(tier)) => Ok(Json(TierResponse::from(tier))),
        Ok(None) => Err(error_response(EventError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

/// Change a tier's quota (never below the current sold count)
pub async fn adjust_quota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AdjustQuotaBody>,
) -> Result<Json<TierResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let old_quota = match state.events().get_tier(&id) {
        Ok(Some(tier)) => tier.quota,
        Ok(None) => return Err(error_response(EventError::NotFound(id))),
        Err(e) => return Err(error_response(e)),
    };

    match state.events().adjust_quota(&id, body.quota) {
        Ok(tier) => {
            state.audit().try_emit(AuditEvent::TierQuotaAdjusted {
                tier_id: tier.id.clone(),
                old_quota,
                new_quota: tier.quota,
            });

            Ok(Json(TierResponse::from(tier)))
        }
        Err(e) => Err(error_response(e)),
    }
}
