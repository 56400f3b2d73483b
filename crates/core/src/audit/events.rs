//! Typed audit events for the booking domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Event lifecycle
    EventPublished {
        event_id: String,
        title: String,
    },
    EventCancelled {
        event_id: String,
        /// Outstanding bookings cancelled by the cascade.
        cancelled_bookings: u64,
        /// Seats released back to the tiers.
        released_seats: u64,
    },
    TierCreated {
        tier_id: String,
        event_id: String,
        ticket_type: String,
        quota: u32,
    },
    TierQuotaAdjusted {
        tier_id: String,
        old_quota: u32,
        new_quota: u32,
    },

    // Booking lifecycle
    BookingCreated {
        booking_id: String,
        user_id: String,
        tier_id: String,
        quantity: u32,
        expires_at: Option<DateTime<Utc>>,
    },
    BookingConfirmed {
        booking_id: String,
        user_id: String,
    },
    BookingCancelled {
        booking_id: String,
        cancelled_by: String,
        previous_status: String,
    },
    BookingRefunded {
        booking_id: String,
        refunded_by: String,
        previous_status: String,
    },
    /// A lapsed pending hold was swept by the reaper.
    BookingExpired {
        booking_id: String,
        user_id: String,
        tier_id: String,
        quantity: u32,
    },
}

impl AuditEvent {
    /// Event type string used for storage and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::ServiceStarted { .. } => "service_started",
            AuditEvent::ServiceStopped { .. } => "service_stopped",
            AuditEvent::EventPublished { .. } => "event_published",
            AuditEvent::EventCancelled { .. } => "event_cancelled",
            AuditEvent::TierCreated { .. } => "tier_created",
            AuditEvent::TierQuotaAdjusted { .. } => "tier_quota_adjusted",
            AuditEvent::BookingCreated { .. } => "booking_created",
            AuditEvent::BookingConfirmed { .. } => "booking_confirmed",
            AuditEvent::BookingCancelled { .. } => "booking_cancelled",
            AuditEvent::BookingRefunded { .. } => "booking_refunded",
            AuditEvent::BookingExpired { .. } => "booking_expired",
        }
    }

    /// Booking this event concerns, if any.
    pub fn booking_id(&self) -> Option<&str> {
        match self {
            AuditEvent::BookingCreated { booking_id, .. }
            | AuditEvent::BookingConfirmed { booking_id, .. }
            | AuditEvent::BookingCancelled { booking_id, .. }
            | AuditEvent::BookingRefunded { booking_id, .. }
            | AuditEvent::BookingExpired { booking_id, .. } => Some(booking_id),
            _ => None,
        }
    }

    /// User this event concerns, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuditEvent::BookingCreated { user_id, .. }
            | AuditEvent::BookingConfirmed { user_id, .. }
            | AuditEvent::BookingExpired { user_id, .. } => Some(user_id),
            AuditEvent::BookingCancelled { cancelled_by, .. } => Some(cancelled_by),
            AuditEvent::BookingRefunded { refunded_by, .. } => Some(refunded_by),
            _ => None,
        }
    }
}

/// A stored audit record: the event plus its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Database-assigned ID.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub booking_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_strings() {
        let event = AuditEvent::BookingCreated {
            booking_id: "b1".to_string(),
            user_id: "alice".to_string(),
            tier_id: "t1".to_string(),
            quantity: 2,
            expires_at: None,
        };
        assert_eq!(event.event_type(), "booking_created");
        assert_eq!(event.booking_id(), Some("b1"));
        assert_eq!(event.user_id(), Some("alice"));
    }

    #[test]
    fn test_system_events_have_no_booking() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert!(event.booking_id().is_none());
        assert!(event.user_id().is_none());
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = AuditEvent::EventCancelled {
            event_id: "e1".to_string(),
            cancelled_bookings: 3,
            released_seats: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"event_cancelled\""));

        let deserialized: AuditEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            AuditEvent::EventCancelled {
                cancelled_bookings: 3,
                released_seats: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_expired_event_fields() {
        let event = AuditEvent::BookingExpired {
            booking_id: "b9".to_string(),
            user_id: "bob".to_string(),
            tier_id: "t2".to_string(),
            quantity: 4,
        };
        assert_eq!(event.event_type(), "booking_expired");
        assert_eq!(event.booking_id(), Some("b9"));
        assert_eq!(event.user_id(), Some("bob"));
    }
}
