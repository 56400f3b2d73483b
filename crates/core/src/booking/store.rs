//! Booking storage trait and request types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::Actor;

use super::{Booking, BookingStatus};

/// Error type for booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// No row with the given id.
    #[error("Booking not found: {0}")]
    NotFound(String),

    /// Quantity outside the configured policy bounds.
    #[error("Invalid quantity {quantity}: must be between {min} and {max}")]
    InvalidQuantity { quantity: u32, min: u32, max: u32 },

    /// The tier's event is not published.
    #[error("Event is not available for booking (status: {status})")]
    EventNotBookable { status: String },

    /// The tier's event has already started.
    #[error("Event has already started")]
    EventAlreadyStarted,

    /// Not enough seats left on the tier.
    #[error("Only {available} ticket(s) available")]
    InsufficientInventory { available: u32 },

    /// Confirm requires a pending booking.
    #[error("Booking is not pending (status: {status})")]
    NotPending { status: String },

    /// The pending hold has lapsed.
    #[error("Booking has expired")]
    BookingExpired,

    /// The booking is already cancelled.
    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    /// The actor neither owns the booking nor holds a managing role.
    #[error("Not the booking owner")]
    NotOwner,

    /// The ledger is in a state that violates `0 <= sold <= quota`.
    /// Programmer error or bypassed write path; never silently repaired.
    #[error("Ledger integrity violation: {0}")]
    IntegrityViolation(String),

    /// Write lock could not be acquired in time; safe to retry.
    #[error("Database busy, retry later")]
    Busy,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new booking.
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    /// User making the reservation.
    pub user_id: String,
    /// Tier to reserve seats on.
    pub tier_id: String,
    pub quantity: u32,
}

/// Filter for querying bookings.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Filter by owning user.
    pub user_id: Option<String>,
    /// Filter by status.
    pub status: Option<BookingStatus>,
    /// Filter by tier.
    pub tier_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl BookingFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tier(mut self, tier_id: impl Into<String>) -> Self {
        self.tier_id = Some(tier_id.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for booking storage backends.
///
/// Every transition is atomic with its paired ledger adjustment: either
/// both the status change and the `sold` mutation persist, or neither
/// does.
pub trait BookingStore: Send + Sync {
    /// Reserve seats and create a PENDING booking with an expiry hold.
    fn create(&self, request: CreateBookingRequest) -> Result<Booking, BookingError>;

    /// Get a booking by ID.
    fn get(&self, id: &str) -> Result<Option<Booking>, BookingError>;

    /// List bookings matching the filter, newest first.
    fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError>;

    /// Count bookings matching the filter.
    fn count(&self, filter: &BookingFilter) -> Result<i64, BookingError>;

    /// PENDING -> CONFIRMED. Rejects lapsed holds; inventory is untouched
    /// (a pending booking already holds its seats).
    fn confirm(&self, id: &str) -> Result<Booking, BookingError>;

    /// PENDING or CONFIRMED -> CANCELLED, releasing the held seats.
    /// Allowed for the booking owner or actors with a managing role, and
    /// only before the event starts.
    fn cancel(&self, id: &str, actor: &Actor) -> Result<Booking, BookingError>;

    /// Administrative CONFIRMED/PENDING -> CANCELLED with release; no
    /// started-event restriction.
    fn refund(&self, id: &str) -> Result<Booking, BookingError>;

    /// Cancel up to `limit` PENDING bookings whose hold lapsed before
    /// `now`, releasing their seats. Each booking is its own transaction.
    /// Returns the expired bookings.
    fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Booking>, BookingError>;
}
