//! Booking data types and policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Substrate;

/// Status of a ticket booking.
///
/// ```text
/// Pending -> Confirmed -> Cancelled (refund)
///    \___________________^
/// ```
///
/// Pending bookings already hold their seats; expiry or cancellation
/// releases them. Cancelled is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }
}

/// A user's reservation of `quantity` seats on one ticket tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier (UUID).
    pub id: String,
    /// User who made the booking (from auth identity).
    pub user_id: String,
    pub tier_id: String,
    pub quantity: u32,
    pub status: BookingStatus,
    /// Set only while PENDING; a pending booking past this instant can no
    /// longer be confirmed and will be swept by the reaper.
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub meta: Substrate,
}

impl Booking {
    /// Whether a pending hold has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending
            && self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Quantity bounds and hold duration for new bookings.
///
/// Negative `hold_minutes` produce already-expired holds; configuration
/// validation rejects that, tests use it to exercise expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPolicy {
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u32,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
    /// How long a pending booking holds its seats before expiring.
    #[serde(default = "default_hold_minutes")]
    pub hold_minutes: i64,
}

fn default_min_quantity() -> u32 {
    1
}

fn default_max_quantity() -> u32 {
    10
}

fn default_hold_minutes() -> i64 {
    15
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_quantity: default_min_quantity(),
            max_quantity: default_max_quantity(),
            hold_minutes: default_hold_minutes(),
        }
    }
}
