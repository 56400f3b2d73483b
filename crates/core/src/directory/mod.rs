//! Organizations, venues and event categories.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteDirectoryStore;
pub use store::{
    CreateOrganizationRequest, CreateVenueRequest, DirectoryError, DirectoryStore,
    UpdateOrganizationRequest, UpdateVenueRequest,
};
pub use types::{EventCategory, Organization, Venue};
