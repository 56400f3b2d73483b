//! Directory storage trait and request types.

use thiserror::Error;

use super::{EventCategory, Organization, Venue};

/// Error type for directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No row with the given id (or it is soft-deleted).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another row already uses the requested unique name.
    #[error("Name already in use: {0}")]
    DuplicateName(String),

    /// The row is still referenced by live events and cannot be deleted.
    #[error("Cannot delete {entity} {id}: referenced by {references} event(s)")]
    ProtectedReference {
        entity: &'static str,
        id: String,
        references: i64,
    },

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

/// Request to create an organization.
#[derive(Debug, Clone)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub website: String,
    pub contact_email: String,
}

/// Versioned update of an organization's mutable fields.
///
/// `expected_version` must match the stored row or the write fails with
/// [`DirectoryError::StaleWrite`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub expected_version: u32,
}

/// Request to create a venue.
#[derive(Debug, Clone)]
pub struct CreateVenueRequest {
    pub name: String,
    pub address: String,
    pub capacity: u32,
}

/// Versioned update of a venue's mutable fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateVenueRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<u32>,
    pub expected_version: u32,
}

/// Trait for directory storage backends.
///
/// Default reads exclude soft-deleted rows; the `list_all_*` accessors
/// include them. Soft delete refuses while live events reference the row;
/// hard delete refuses while any event does.
pub trait DirectoryStore: Send + Sync {
    // Organizations
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<Organization, DirectoryError>;
    fn get_organization(&self, id: &str) -> Result<Option<Organization>, DirectoryError>;
    fn list_organizations(&self) -> Result<Vec<Organization>, DirectoryError>;
    fn list_all_organizations(&self) -> Result<Vec<Organization>, DirectoryError>;
    fn update_organization(
        &self,
        id: &str,
        request: UpdateOrganizationRequest,
    ) -> Result<Organization, DirectoryError>;
    fn soft_delete_organization(&self, id: &str) -> Result<Organization, DirectoryError>;
    fn hard_delete_organization(&self, id: &str) -> Result<(), DirectoryError>;

    // Venues
    fn create_venue(&self, request: CreateVenueRequest) -> Result<Venue, DirectoryError>;
    fn get_venue(&self, id: &str) -> Result<Option<Venue>, DirectoryError>;
    fn list_venues(&self) -> Result<Vec<Venue>, DirectoryError>;
    fn list_all_venues(&self) -> Result<Vec<Venue>, DirectoryError>;
    fn update_venue(&self, id: &str, request: UpdateVenueRequest) -> Result<Venue, DirectoryError>;
    fn soft_delete_venue(&self, id: &str) -> Result<Venue, DirectoryError>;
    fn hard_delete_venue(&self, id: &str) -> Result<(), DirectoryError>;

    // Categories
    fn create_category(&self, name: &str) -> Result<EventCategory, DirectoryError>;
    fn get_category(&self, id: &str) -> Result<Option<EventCategory>, DirectoryError>;
    fn list_categories(&self) -> Result<Vec<EventCategory>, DirectoryError>;
    fn list_all_categories(&self) -> Result<Vec<EventCategory>, DirectoryError>;
    fn soft_delete_category(&self, id: &str) -> Result<EventCategory, DirectoryError>;
    fn hard_delete_category(&self, id: &str) -> Result<(), DirectoryError>;
}
