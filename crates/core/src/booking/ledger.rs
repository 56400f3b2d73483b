//! Inventory ledger: the `quota`/`sold` accounting for one tier.
//!
//! Both operations run against an already-exclusive transaction and
//! re-read the counters inside it. A snapshot taken before the lock is
//! never trusted: two callers could both observe availability and both
//! commit, overselling the tier.

use rusqlite::{params, Connection};

use crate::metrics;

use super::BookingError;

/// Increment `sold` by `quantity` if the tier has that many seats left.
///
/// Fails with [`BookingError::InsufficientInventory`] and no mutation
/// otherwise.
pub(crate) fn reserve(
    conn: &Connection,
    tier_id: &str,
    quantity: u32,
) -> Result<(), BookingError> {
    let (quota, sold) = read_counters(conn, tier_id)?;

    let available = quota - sold;
    if available < quantity {
        metrics::BOOKING_REJECTIONS
            .with_label_values(&["insufficient_inventory"])
            .inc();
        return Err(BookingError::InsufficientInventory { available });
    }

    adjust_sold(conn, tier_id, sold + quantity)?;
    metrics::SEATS_RESERVED.inc_by(quantity as u64);
    Ok(())
}

/// Decrement `sold` by `quantity`.
///
/// `sold` dropping below zero means a transition double-released or a
/// write path bypassed the protocol; that is surfaced as
/// [`BookingError::IntegrityViolation`], never clamped.
pub(crate) fn release(
    conn: &Connection,
    tier_id: &str,
    quantity: u32,
) -> Result<(), BookingError> {
    let (_quota, sold) = read_counters(conn, tier_id)?;

    if sold < quantity {
        metrics::LEDGER_INTEGRITY_VIOLATIONS.inc();
        tracing::error!(
            tier_id = %tier_id,
            sold,
            quantity,
            "Release would drive sold below zero"
        );
        return Err(BookingError::IntegrityViolation(format!(
            "tier {}: cannot release {} of {} sold",
            tier_id, quantity, sold
        )));
    }

    adjust_sold(conn, tier_id, sold - quantity)?;
    metrics::SEATS_RELEASED.inc_by(quantity as u64);
    Ok(())
}

/// Read `(quota, sold)` under the caller's transaction, verifying the
/// ledger invariant on the way.
fn read_counters(conn: &Connection, tier_id: &str) -> Result<(u32, u32), BookingError> {
    let (quota, sold): (u32, u32) = conn
        .query_row(
            "SELECT quota, sold FROM ticket_tiers WHERE id = ? AND deleted_at IS NULL",
            params![tier_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => BookingError::NotFound(tier_id.to_string()),
            other => map_err(other),
        })?;

    if sold > quota {
        metrics::LEDGER_INTEGRITY_VIOLATIONS.inc();
        tracing::error!(tier_id = %tier_id, quota, sold, "Ledger invariant violated");
        return Err(BookingError::IntegrityViolation(format!(
            "tier {}: sold {} exceeds quota {}",
            tier_id, sold, quota
        )));
    }

    Ok((quota, sold))
}

fn adjust_sold(conn: &Connection, tier_id: &str, new_sold: u32) -> Result<(), BookingError> {
    conn.execute(
        "UPDATE ticket_tiers SET sold = ?, updated_at = ?, version = version + 1 WHERE id = ?",
        params![new_sold, chrono::Utc::now().to_rfc3339(), tier_id],
    )
    .map_err(map_err)?;
    Ok(())
}

pub(crate) fn map_err(e: rusqlite::Error) -> BookingError {
    if crate::db::is_busy(&e) {
        BookingError::Busy
    } else {
        BookingError::Database(e.to_string())
    }
}
