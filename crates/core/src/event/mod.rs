//! Events, their publication gate and their ticket tiers.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteEventStore;
pub use store::{
    CancelOutcome, CreateEventRequest, CreateTierRequest, EventError, EventFilter, EventStore,
    UpdateEventRequest,
};
pub use types::{Event, EventStatus, TicketTier, TicketType};
