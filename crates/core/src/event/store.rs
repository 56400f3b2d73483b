//! Event storage trait and request types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::{Event, EventStatus, TicketTier, TicketType};

/// Error type for event and tier operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// No row with the given id (or it is soft-deleted).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another event already uses the requested title.
    #[error("Event title already in use: {0}")]
    DuplicateTitle(String),

    /// A referenced organization, venue or category does not exist.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// `ends_at` is not strictly after `starts_at`.
    #[error("Event must end after it starts")]
    InvalidSchedule,

    /// Publish requires a draft event.
    #[error("Event is not a draft (status: {status})")]
    NotDraft { status: String },

    /// Publish requires at least one ticket tier.
    #[error("Event has no ticket tiers")]
    NoTicketTiers,

    /// The event's start time has already passed.
    #[error("Event has already started")]
    EventAlreadyStarted,

    /// The event is already cancelled.
    #[error("Event is already cancelled")]
    AlreadyCancelled,

    /// Tiers cannot be added to a cancelled event.
    #[error("Event is cancelled")]
    EventCancelled,

    /// The event already has a tier of this type.
    #[error("Event already has a {0:?} tier")]
    DuplicateTierType(TicketType),

    /// Tier price must be non-negative.
    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// The new quota would fall below seats already sold.
    #[error("Quota cannot drop below sold count ({sold})")]
    QuotaBelowSold { sold: u32 },

    /// Bookings still reference the event's tiers.
    #[error("Cannot delete event {id}: {references} booking(s) reference its tiers")]
    ProtectedByBookings { id: String, references: i64 },

    /// The stored version moved since the caller read the row.
    #[error("Stale write: expected version {expected}, found {found}")]
    StaleWrite { expected: u32, found: u32 },

    /// Write lock could not be acquired in time; safe to retry.
    #[error("Database busy, retry later")]
    Busy,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new event (always created as a draft).
#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    pub organization_id: String,
    pub venue_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<u32>,
}

/// Versioned update of an event's editable fields.
///
/// `expected_version` must match the stored row or the write fails with
/// [`EventError::StaleWrite`]. Status is never changed here; the
/// publication gate owns status transitions.
#[derive(Debug, Clone, Default)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub expected_version: u32,
}

/// Filter for querying events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by status.
    pub status: Option<EventStatus>,
    /// Filter by owning organization.
    pub organization_id: Option<String>,
    /// Only events that have not yet started.
    pub upcoming_only: bool,
    /// Include soft-deleted rows.
    pub include_deleted: bool,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl EventFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn upcoming(mut self) -> Self {
        self.upcoming_only = true;
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
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

/// Request to create a ticket tier on an event.
#[derive(Debug, Clone)]
pub struct CreateTierRequest {
    pub ticket_type: TicketType,
    pub price: Decimal,
    pub quota: u32,
}

/// Result of cancelling an event, including the cascade over its bookings.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub event: Event,
    /// Outstanding bookings that were cancelled by the cascade.
    pub cancelled_bookings: u64,
    /// Seats released back to the tiers' ledgers.
    pub released_seats: u64,
}

/// Trait for event storage backends.
pub trait EventStore: Send + Sync {
    /// Create a new draft event.
    fn create(&self, request: CreateEventRequest) -> Result<Event, EventError>;

    /// Get an event by ID.
    fn get(&self, id: &str) -> Result<Option<Event>, EventError>;

    /// List events matching the filter, ordered by start time.
    fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, EventError>;

    /// Count events matching the filter.
    fn count(&self, filter: &EventFilter) -> Result<i64, EventError>;

    /// Versioned update of editable fields.
    fn update(&self, id: &str, request: UpdateEventRequest) -> Result<Event, EventError>;

    /// Publication gate: DRAFT -> PUBLISHED.
    ///
    /// Requires a future start time and at least one ticket tier.
    fn publish(&self, id: &str) -> Result<Event, EventError>;

    /// Publication gate: any non-cancelled status -> CANCELLED.
    ///
    /// Cascades over the event's outstanding bookings: each is cancelled
    /// and its held inventory released, in the same transaction.
    fn cancel(&self, id: &str) -> Result<CancelOutcome, EventError>;

    /// Soft-delete an event.
    fn soft_delete(&self, id: &str) -> Result<Event, EventError>;

    /// Physically delete an event and its tiers. Refused while bookings
    /// reference any tier.
    fn hard_delete(&self, id: &str) -> Result<(), EventError>;

    /// Add a ticket tier to a non-cancelled event.
    fn create_tier(&self, event_id: &str, request: CreateTierRequest)
        -> Result<TicketTier, EventError>;

    /// Get a tier by ID.
    fn get_tier(&self, tier_id: &str) -> Result<Option<TicketTier>, EventError>;

    /// All live tiers of an event.
    fn list_tiers(&self, event_id: &str) -> Result<Vec<TicketTier>, EventError>;

    /// Tiers of an event that still have availability, cheapest first.
    fn available_tiers(&self, event_id: &str) -> Result<Vec<TicketTier>, EventError>;

    /// Change a tier's quota. The quota may be lowered only down to the
    /// current sold count; the check runs under the ledger's exclusive
    /// serialization.
    fn adjust_quota(&self, tier_id: &str, new_quota: u32) -> Result<TicketTier, EventError>;
}
