//! SQLite-backed booking store implementation.
//!
//! Every transition runs inside a `BEGIN IMMEDIATE` transaction: the
//! write lock is taken up front, the tier counters and booking row are
//! re-read under it, and the status change commits together with its
//! paired ledger adjustment. An error on any step rolls the whole
//! transaction back, leaving both rows at their pre-call values.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::auth::Actor;
use crate::db;
use crate::entity::{parse_timestamp, Substrate, SUBSTRATE_COLUMNS};
use crate::metrics;

use super::ledger::{self, map_err};
use super::{
    Booking, BookingError, BookingFilter, BookingPolicy, BookingStatus, BookingStore,
    CreateBookingRequest,
};

/// SQLite-backed booking store.
pub struct SqliteBookingStore {
    conn: Mutex<Connection>,
    policy: BookingPolicy,
}

impl SqliteBookingStore {
    /// Create a new SQLite booking store, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path, policy: BookingPolicy) -> Result<Self, BookingError> {
        let conn = db::open(path).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            policy,
        })
    }

    /// Create an in-memory SQLite booking store (useful for testing).
    pub fn in_memory(policy: BookingPolicy) -> Result<Self, BookingError> {
        let conn = db::open_in_memory().map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            policy,
        })
    }

    fn booking_select(where_clause: &str) -> String {
        format!(
            "SELECT id, user_id, tier_id, quantity, status, expires_at, {} FROM bookings {}",
            SUBSTRATE_COLUMNS, where_clause
        )
    }

    fn row_to_booking(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
        let status_str: String = row.get(4)?;
        let expires_at_str: Option<String> = row.get(5)?;

        Ok(Booking {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tier_id: row.get(2)?,
            quantity: row.get(3)?,
            status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
            expires_at: expires_at_str.as_deref().map(parse_timestamp),
            meta: Substrate::from_row(row, 6)?,
        })
    }

    fn get_booking_in(conn: &Connection, id: &str) -> Result<Booking, BookingError> {
        conn.query_row(
            &Self::booking_select("WHERE id = ?"),
            params![id],
            Self::row_to_booking,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => BookingError::NotFound(id.to_string()),
            other => map_err(other),
        })
    }

    /// Gate checks shared by create and cancel: the tier must be live and
    /// its event must be in the expected shape.
    fn tier_event_state(
        conn: &Connection,
        tier_id: &str,
    ) -> Result<(String, DateTime<Utc>), BookingError> {
        conn.query_row(
            "SELECT e.status, e.starts_at FROM ticket_tiers t \
             JOIN events e ON e.id = t.event_id \
             WHERE t.id = ? AND t.deleted_at IS NULL AND e.deleted_at IS NULL",
            params![tier_id],
            |row| {
                let status: String = row.get(0)?;
                let starts_at: String = row.get(1)?;
                Ok((status, parse_timestamp(&starts_at)))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => BookingError::NotFound(tier_id.to_string()),
            other => map_err(other),
        })
    }

    fn set_status(
        conn: &Connection,
        id: &str,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        conn.execute(
            "UPDATE bookings SET status = ?, expires_at = NULL, updated_at = ?, \
             version = version + 1 WHERE id = ?",
            params![status.as_str(), now.to_rfc3339(), id],
        )
        .map_err(map_err)?;
        Ok(())
    }

    fn build_where_clause(filter: &BookingFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(ref tier_id) = filter.tier_id {
            conditions.push("tier_id = ?");
            params.push(Box::new(tier_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Run the expire transition for one booking id. Returns None if the
    /// booking was confirmed or cancelled between the scan and this call.
    fn expire_one(
        conn: &mut Connection,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingError> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let booking = Self::get_booking_in(&tx, id)?;
        if !booking.is_expired(now) {
            return Ok(None);
        }

        ledger::release(&tx, &booking.tier_id, booking.quantity)?;
        Self::set_status(&tx, id, BookingStatus::Cancelled, now)?;

        let expired = Self::get_booking_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        metrics::BOOKINGS_CANCELLED
            .with_label_values(&["expired"])
            .inc();
        Ok(Some(expired))
    }
}

impl BookingStore for SqliteBookingStore {
    fn create(&self, request: CreateBookingRequest) -> Result<Booking, BookingError> {
        if request.quantity < self.policy.min_quantity
            || request.quantity > self.policy.max_quantity
        {
            metrics::BOOKING_REJECTIONS
                .with_label_values(&["quantity"])
                .inc();
            return Err(BookingError::InvalidQuantity {
                quantity: request.quantity,
                min: self.policy.min_quantity,
                max: self.policy.max_quantity,
            });
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let now = Utc::now();
        let (event_status, starts_at) = Self::tier_event_state(&tx, &request.tier_id)?;

        if event_status != "PUBLISHED" {
            metrics::BOOKING_REJECTIONS
                .with_label_values(&["not_bookable"])
                .inc();
            return Err(BookingError::EventNotBookable {
                status: event_status,
            });
        }

        if starts_at <= now {
            metrics::BOOKING_REJECTIONS
                .with_label_values(&["started"])
                .inc();
            return Err(BookingError::EventAlreadyStarted);
        }

        ledger::reserve(&tx, &request.tier_id, request.quantity)?;

        let id = uuid::Uuid::new_v4().to_string();
        let expires_at = now + Duration::minutes(self.policy.hold_minutes);
        let meta = Substrate::new(now);

        tx.execute(
            "INSERT INTO bookings (id, user_id, tier_id, quantity, status, expires_at, \
             created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, 'PENDING', ?, ?, ?, 1, NULL, 0)",
            params![
                id,
                request.user_id,
                request.tier_id,
                request.quantity,
                expires_at.to_rfc3339(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(map_err)?;

        tx.commit().map_err(map_err)?;

        metrics::BOOKINGS_CREATED.inc();
        tracing::debug!(
            booking_id = %id,
            tier_id = %request.tier_id,
            quantity = request.quantity,
            "Booking created"
        );

        Ok(Booking {
            id,
            user_id: request.user_id,
            tier_id: request.tier_id,
            quantity: request.quantity,
            status: BookingStatus::Pending,
            expires_at: Some(expires_at),
            meta,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Booking>, BookingError> {
        let conn = self.conn.lock().unwrap();

        match Self::get_booking_in(&conn, id) {
            Ok(booking) => Ok(Some(booking)),
            Err(BookingError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            Self::booking_select(&where_clause)
        );

        let mut stmt = conn.prepare(&sql).map_err(map_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_booking)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn count(&self, filter: &BookingFilter) -> Result<i64, BookingError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM bookings {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(map_err)
    }

    fn confirm(&self, id: &str) -> Result<Booking, BookingError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let booking = Self::get_booking_in(&tx, id)?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::NotPending {
                status: booking.status.as_str().to_string(),
            });
        }

        let now = Utc::now();
        if booking.is_expired(now) {
            return Err(BookingError::BookingExpired);
        }

        // Inventory was reserved at create time; confirming only flips the
        // status and drops the hold deadline.
        Self::set_status(&tx, id, BookingStatus::Confirmed, now)?;

        let confirmed = Self::get_booking_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        metrics::BOOKINGS_CONFIRMED.inc();
        Ok(confirmed)
    }

    fn cancel(&self, id: &str, actor: &Actor) -> Result<Booking, BookingError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let booking = Self::get_booking_in(&tx, id)?;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled);
        }

        if booking.user_id != actor.user_id && !actor.can_manage_bookings() {
            return Err(BookingError::NotOwner);
        }

        let now = Utc::now();
        let (_, starts_at) = Self::tier_event_state(&tx, &booking.tier_id)?;
        if starts_at <= now {
            return Err(BookingError::EventAlreadyStarted);
        }

        ledger::release(&tx, &booking.tier_id, booking.quantity)?;
        Self::set_status(&tx, id, BookingStatus::Cancelled, now)?;

        let cancelled = Self::get_booking_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        metrics::BOOKINGS_CANCELLED
            .with_label_values(&["cancel"])
            .inc();
        Ok(cancelled)
    }

    fn refund(&self, id: &str) -> Result<Booking, BookingError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let booking = Self::get_booking_in(&tx, id)?;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled);
        }

        // Pending and confirmed bookings both hold seats, so both paths
        // release; the administrative override just skips the
        // started-event restriction.
        ledger::release(&tx, &booking.tier_id, booking.quantity)?;
        Self::set_status(&tx, id, BookingStatus::Cancelled, Utc::now())?;

        let refunded = Self::get_booking_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        metrics::BOOKINGS_CANCELLED
            .with_label_values(&["refund"])
            .inc();
        Ok(refunded)
    }

    fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Booking>, BookingError> {
        let overdue_ids: Vec<String> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM bookings WHERE status = 'PENDING' \
                     AND expires_at IS NOT NULL AND expires_at <= ? \
                     ORDER BY expires_at ASC LIMIT ?",
                )
                .map_err(map_err)?;

            let rows = stmt
                .query_map(params![now.to_rfc3339(), limit], |row| row.get(0))
                .map_err(map_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)?
        };

        let mut expired = Vec::new();
        for id in overdue_ids {
            let mut conn = self.conn.lock().unwrap();
            match Self::expire_one(&mut conn, &id, now) {
                Ok(Some(booking)) => expired.push(booking),
                // Raced a confirm or cancel; nothing to do.
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(booking_id = %id, "Failed to expire booking: {}", e);
                }
            }
        }

        Ok(expired)
    }
}
