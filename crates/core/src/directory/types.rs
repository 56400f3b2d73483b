//! Reference entities owned by organizer-role actors: the organizations
//! that host events, the venues they happen at and the categories they
//! are filed under.

use serde::{Deserialize, Serialize};

use crate::entity::Substrate;

/// An event organizer or company that hosts events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier (UUID).
    pub id: String,
    /// Unique name.
    pub name: String,
    pub website: String,
    pub contact_email: String,
    #[serde(flatten)]
    pub meta: Substrate,
}

/// A physical location where events are held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Unique identifier (UUID).
    pub id: String,
    /// Unique name.
    pub name: String,
    pub address: String,
    /// Maximum number of attendees the venue can hold.
    pub capacity: u32,
    #[serde(flatten)]
    pub meta: Substrate,
}

/// A classification bucket for events (concert, conference, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCategory {
    /// Unique identifier (UUID).
    pub id: String,
    /// Unique name.
    pub name: String,
    #[serde(flatten)]
    pub meta: Substrate,
}
