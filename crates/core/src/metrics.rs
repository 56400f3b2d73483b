//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Booking lifecycle (created, confirmed, cancelled by path)
//! - Inventory ledger (rejected reservations)
//! - Expiry reaper (sweeps, expired holds)

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Booking Lifecycle Metrics
// =============================================================================

/// Bookings created (successful reservations).
pub static BOOKINGS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("boxoffice_bookings_created_total", "Total bookings created").unwrap()
});

/// Bookings confirmed.
pub static BOOKINGS_CONFIRMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_bookings_confirmed_total",
        "Total bookings confirmed",
    )
    .unwrap()
});

/// Bookings cancelled, by path.
pub static BOOKINGS_CANCELLED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "boxoffice_bookings_cancelled_total",
            "Total bookings cancelled",
        ),
        &["path"], // "cancel", "refund", "expired", "event_cancelled"
    )
    .unwrap()
});

/// Booking creation failures, by reason.
pub static BOOKING_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "boxoffice_booking_rejections_total",
            "Booking requests rejected before reservation",
        ),
        &["reason"], // "insufficient_inventory", "not_bookable", "started", "quantity"
    )
    .unwrap()
});

// =============================================================================
// Inventory Ledger Metrics
// =============================================================================

/// Seats reserved through the ledger.
pub static SEATS_RESERVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_seats_reserved_total",
        "Seats reserved through the inventory ledger",
    )
    .unwrap()
});

/// Seats released back through the ledger.
pub static SEATS_RELEASED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_seats_released_total",
        "Seats released through the inventory ledger",
    )
    .unwrap()
});

/// Ledger integrity violations detected (bypassed write path).
pub static LEDGER_INTEGRITY_VIOLATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_ledger_integrity_violations_total",
        "Ledger states that violate 0 <= sold <= quota",
    )
    .unwrap()
});

// =============================================================================
// Reaper Metrics
// =============================================================================

/// Reaper sweep iterations.
pub static REAPER_SWEEPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("boxoffice_reaper_sweeps_total", "Expiry reaper sweeps").unwrap()
});

/// Holds expired by the reaper.
pub static REAPER_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_reaper_expired_total",
        "Pending bookings expired by the reaper",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(BOOKINGS_CREATED.clone()),
        Box::new(BOOKINGS_CONFIRMED.clone()),
        Box::new(BOOKINGS_CANCELLED.clone()),
        Box::new(BOOKING_REJECTIONS.clone()),
        Box::new(SEATS_RESERVED.clone()),
        Box::new(SEATS_RELEASED.clone()),
        Box::new(LEDGER_INTEGRITY_VIOLATIONS.clone()),
        Box::new(REAPER_SWEEPS.clone()),
        Box::new(REAPER_EXPIRED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }

    #[test]
    fn test_counters_increment() {
        let before = BOOKINGS_CREATED.get();
        BOOKINGS_CREATED.inc();
        assert_eq!(BOOKINGS_CREATED.get(), before + 1);
    }
}
