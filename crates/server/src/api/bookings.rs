//! Booking API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use boxoffice_core::{
    AuditEvent, Booking, BookingError, BookingFilter, BookingStatus, CreateBookingRequest,
};

use crate::api::middleware::AuthActor;
use crate::state::AppState;

/// Maximum allowed limit for booking queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for booking queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    /// Tier to reserve seats on
    pub tier_id: String,
    /// Number of seats
    pub quantity: u32,
}

/// Query parameters for listing bookings
#[derive(Debug, Deserialize)]
pub struct ListBookingsParams {
    /// Filter by status
    pub status: Option<BookingStatus>,
    /// Filter by tier
    pub tier_id: Option<String>,
    /// Filter by user (managing roles only; others always see their own)
    pub user_id: Option<String>,
    /// Maximum number of bookings to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for booking operations
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub tier_id: String,
    pub quantity: u32,
    pub status: BookingStatus,
    pub expires_at: Option<String>,
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            tier_id: booking.tier_id,
            quantity: booking.quantity,
            status: booking.status,
            expires_at: booking.expires_at.map(|t| t.to_rfc3339()),
            version: booking.meta.version,
            created_at: booking.meta.created_at.to_rfc3339(),
            updated_at: booking.meta.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing bookings
#[derive(Debug, Serialize)]
pub struct ListBookingsResponse {
    pub bookings: Vec<BookingResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

/// Map a booking error to an HTTP response.
fn error_response(e: BookingError) -> (StatusCode, Json<ApiErrorResponse>) {
    let status = match &e {
        BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        BookingError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        BookingError::NotOwner => StatusCode::FORBIDDEN,
        BookingError::EventNotBookable { .. }
        | BookingError::EventAlreadyStarted
        | BookingError::InsufficientInventory { .. }
        | BookingError::NotPending { .. }
        | BookingError::BookingExpired
        | BookingError::AlreadyCancelled => StatusCode::CONFLICT,
        BookingError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::IntegrityViolation(_) | BookingError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
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

/// Create a new booking (reserves seats, starts the expiry hold)
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Json(body): Json<CreateBookingBody>,
) -> Result<(StatusCode, Json<BookingResponse>), (StatusCode, Json<ApiErrorResponse>)> {
    let request = CreateBookingRequest {
        user_id: actor.user_id.clone(),
        tier_id: body.tier_id,
        quantity: body.quantity,
    };

    match state.bookings().create(request) {
        Ok(booking) => {
            state.audit().try_emit(AuditEvent::BookingCreated {
                booking_id: booking.id.clone(),
                user_id: booking.user_id.clone(),
                tier_id: booking.tier_id.clone(),
                quantity: booking.quantity,
                expires_at: booking.expires_at,
            });

            Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Get a booking by ID
///
/// Bookings are private: callers see their own, managing roles see all.
/// Anything else reads as not found.
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.bookings().get(&id) {
        Ok(Some(booking))
            if booking.user_id == actor.user_id || actor.can_manage_bookings() =>
        {
            Ok(Json(BookingResponse::from(booking)))
        }
        Ok(_) => Err(error_response(BookingError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

/// List bookings with optional filters
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<ListBookingsResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Non-managing callers are pinned to their own bookings.
    let user_id = if actor.can_manage_bookings() {
        params.user_id.unwrap_or_else(|| actor.user_id.clone())
    } else {
        actor.user_id.clone()
    };

    let mut filter = BookingFilter::new()
        .with_user(user_id)
        .with_limit(limit)
        .with_offset(offset);

    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }

    if let Some(ref tier_id) = params.tier_id {
        filter = filter.with_tier(tier_id.as_str());
    }

    let bookings = state.bookings().list(&filter).map_err(error_response)?;

    let count_filter = BookingFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state.bookings().count(&count_filter).map_err(error_response)?;

    Ok(Json(ListBookingsResponse {
        bookings: bookings.into_iter().map(BookingResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Confirm a pending booking (simulated payment completion)
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    // Same visibility rule as get: only the owner or a managing role may
    // act on the booking.
    match state.bookings().get(&id) {
        Ok(Some(booking))
            if booking.user_id == actor.user_id || actor.can_manage_bookings() => {}
        Ok(_) => return Err(error_response(BookingError::NotFound(id))),
        Err(e) => return Err(error_response(e)),
    }

    match state.bookings().confirm(&id) {
        Ok(booking) => {
            state.audit().try_emit(AuditEvent::BookingConfirmed {
                booking_id: booking.id.clone(),
                user_id: booking.user_id.clone(),
            });

            Ok(Json(BookingResponse::from(booking)))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Cancel a booking, releasing its seats
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let previous_status = match state.bookings().get(&id) {
        Ok(Some(booking)) => booking.status.as_str().to_string(),
        Ok(None) => return Err(error_response(BookingError::NotFound(id))),
        Err(e) => return Err(error_response(e)),
    };

    match state.bookings().cancel(&id, &actor) {
        Ok(booking) => {
            state.audit().try_emit(AuditEvent::BookingCancelled {
                booking_id: booking.id.clone(),
                cancelled_by: actor.user_id.clone(),
                previous_status,
            });

            Ok(Json(BookingResponse::from(booking)))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Refund a booking (administrative override, managing roles only)
pub async fn refund_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    if !actor.can_manage_bookings() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiErrorResponse {
                error: "Refunds require a staff or support role".to_string(),
            }),
        ));
    }

    let previous_status = match state.bookings().get(&id) {
        Ok(Some(booking)) => booking.status.as_str().to_string(),
        Ok(None) => return Err(error_response(BookingError::NotFound(id))),
        Err(e) => return Err(error_response(e)),
    };

    match state.bookings().refund(&id) {
        Ok(booking) => {
            state.audit().try_emit(AuditEvent::BookingRefunded {
                booking_id: booking.id.clone(),
                refunded_by: actor.user_id.clone(),
                previous_status,
            });

            Ok(Json(BookingResponse::from(booking)))
        }
        Err(e) => Err(error_response(e)),
    }
}
