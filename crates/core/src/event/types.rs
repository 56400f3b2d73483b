//! Event and ticket-tier data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::Substrate;

/// Lifecycle status of an event.
///
/// ```text
/// Draft -> Published -> Cancelled
///   \________________________^
/// ```
///
/// Only published, not-yet-started events accept bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Published => "PUBLISHED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(EventStatus::Draft),
            "PUBLISHED" => Some(EventStatus::Published),
            "CANCELLED" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

/// Priced ticket category for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    Standard,
    Vip,
    EarlyBird,
    Student,
    Group,
}

impl TicketType {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Standard => "STANDARD",
            TicketType::Vip => "VIP",
            TicketType::EarlyBird => "EARLY_BIRD",
            TicketType::Student => "STUDENT",
            TicketType::Group => "GROUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STANDARD" => Some(TicketType::Standard),
            "VIP" => Some(TicketType::Vip),
            "EARLY_BIRD" => Some(TicketType::EarlyBird),
            "STUDENT" => Some(TicketType::Student),
            "GROUP" => Some(TicketType::Group),
            _ => None,
        }
    }
}

/// A scheduled event that customers can book tickets for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier (UUID).
    pub id: String,
    pub organization_id: String,
    pub venue_id: String,
    pub category_id: String,
    /// Unique title.
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    /// Always strictly after `starts_at`.
    pub ends_at: DateTime<Utc>,
    pub status: EventStatus,
    /// Optional override of the venue capacity for this event.
    pub capacity: Option<u32>,
    #[serde(flatten)]
    pub meta: Substrate,
}

impl Event {
    /// Whether the event has already started at `now`.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }
}

/// A ticket tier of one event: the `quota`/`sold` pair is the inventory
/// ledger for that tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTier {
    /// Unique identifier (UUID).
    pub id: String,
    pub event_id: String,
    pub ticket_type: TicketType,
    /// Non-negative price per ticket.
    pub price: Decimal,
    /// Total sellable tickets.
    pub quota: u32,
    /// Currently reserved + confirmed tickets. Never exceeds `quota`.
    pub sold: u32,
    #[serde(flatten)]
    pub meta: Substrate,
}

impl TicketTier {
    /// Seats still available for sale.
    pub fn available(&self) -> u32 {
        self.quota.saturating_sub(self.sold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [EventStatus::Draft, EventStatus::Published, EventStatus::Cancelled] {
            assert_eq!(EventStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EventStatus::parse("NOPE"), None);
    }

    #[test]
    fn test_ticket_type_roundtrip() {
        for ticket_type in [
            TicketType::Standard,
            TicketType::Vip,
            TicketType::EarlyBird,
            TicketType::Student,
            TicketType::Group,
        ] {
            assert_eq!(TicketType::parse(ticket_type.as_str()), Some(ticket_type));
        }
        assert_eq!(TicketType::parse("PLATINUM"), None);
    }

    #[test]
    fn test_ticket_type_serialization() {
        let json = serde_json::to_string(&TicketType::EarlyBird).unwrap();
        assert_eq!(json, "\"EARLY_BIRD\"");
        let parsed: TicketType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TicketType::EarlyBird);
    }

    #[test]
    fn test_tier_available() {
        let now = Utc::now();
        let tier = TicketTier {
            id: "t1".to_string(),
            event_id: "e1".to_string(),
            ticket_type: TicketType::Standard,
            price: Decimal::new(10000, 2),
            quota: 10,
            sold: 3,
            meta: Substrate::new(now),
        };
        assert_eq!(tier.available(), 7);
    }

    #[test]
    fn test_event_has_started() {
        let now = Utc::now();
        let event = Event {
            id: "e1".to_string(),
            organization_id: "o1".to_string(),
            venue_id: "v1".to_string(),
            category_id: "c1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            starts_at: now - chrono::Duration::hours(1),
            ends_at: now + chrono::Duration::hours(1),
            status: EventStatus::Published,
            capacity: None,
            meta: Substrate::new(now),
        };
        assert!(event.has_started(now));
        assert!(!event.has_started(now - chrono::Duration::hours(2)));
    }
}
