//! SQLite-backed event store implementation.
//!
//! Status transitions and quota changes run inside `BEGIN IMMEDIATE`
//! transactions so their read-check-write sequences are serialized
//! against the booking ledger, which shares the same tables.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use rust_decimal::Decimal;

use crate::db;
use crate::entity::{parse_timestamp, Substrate, SUBSTRATE_COLUMNS};

use super::{
    CancelOutcome, CreateEventRequest, CreateTierRequest, Event, EventError, EventFilter,
    EventStatus, EventStore, TicketTier, TicketType, UpdateEventRequest,
};

/// SQLite-backed event store.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Create a new SQLite event store, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path) -> Result<Self, EventError> {
        let conn = db::open(path).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite event store (useful for testing).
    pub fn in_memory() -> Result<Self, EventError> {
        let conn = db::open_in_memory().map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn event_select(where_clause: &str) -> String {
        format!(
            "SELECT id, organization_id, venue_id, category_id, title, description, \
             starts_at, ends_at, status, capacity, {} FROM events {}",
            SUBSTRATE_COLUMNS, where_clause
        )
    }

    fn tier_select(where_clause: &str) -> String {
        format!(
            "SELECT id, event_id, ticket_type, price, quota, sold, {} FROM ticket_tiers {}",
            SUBSTRATE_COLUMNS, where_clause
        )
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let starts_at_str: String = row.get(6)?;
        let ends_at_str: String = row.get(7)?;
        let status_str: String = row.get(8)?;

        Ok(Event {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            venue_id: row.get(2)?,
            category_id: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            starts_at: parse_timestamp(&starts_at_str),
            ends_at: parse_timestamp(&ends_at_str),
            status: EventStatus::parse(&status_str).unwrap_or(EventStatus::Draft),
            capacity: row.get(9)?,
            meta: Substrate::from_row(row, 10)?,
        })
    }

    fn row_to_tier(row: &rusqlite::Row) -> rusqlite::Result<TicketTier> {
        let type_str: String = row.get(2)?;
        let price_str: String = row.get(3)?;

        Ok(TicketTier {
            id: row.get(0)?,
            event_id: row.get(1)?,
            ticket_type: TicketType::parse(&type_str).unwrap_or(TicketType::Standard),
            price: Decimal::from_str(&price_str).unwrap_or_default(),
            quota: row.get(4)?,
            sold: row.get(5)?,
            meta: Substrate::from_row(row, 6)?,
        })
    }

    fn get_event_in(conn: &Connection, id: &str) -> Result<Event, EventError> {
        conn.query_row(
            &Self::event_select("WHERE id = ? AND deleted_at IS NULL"),
            params![id],
            Self::row_to_event,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => EventError::NotFound(id.to_string()),
            other => map_err(other),
        })
    }

    fn build_where_clause(filter: &EventFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.include_deleted {
            conditions.push("deleted_at IS NULL".to_string());
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(ref organization_id) = filter.organization_id {
            conditions.push("organization_id = ?".to_string());
            params.push(Box::new(organization_id.clone()));
        }

        if filter.upcoming_only {
            conditions.push("starts_at > ?".to_string());
            params.push(Box::new(Utc::now().to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Ensure a directory row exists and is live; used for the event's
    /// protect-on-delete foreign keys.
    fn check_reference(
        conn: &Connection,
        table: &str,
        label: &str,
        id: &str,
    ) -> Result<(), EventError> {
        let exists: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ? AND deleted_at IS NULL", table),
                params![id],
                |row| row.get(0),
            )
            .map_err(map_err)?;

        if exists == 0 {
            return Err(EventError::UnknownReference(format!("{}: {}", label, id)));
        }
        Ok(())
    }
}

fn map_err(e: rusqlite::Error) -> EventError {
    if db::is_busy(&e) {
        EventError::Busy
    } else {
        EventError::Database(e.to_string())
    }
}

impl EventStore for SqliteEventStore {
    fn create(&self, request: CreateEventRequest) -> Result<Event, EventError> {
        if request.ends_at <= request.starts_at {
            return Err(EventError::InvalidSchedule);
        }

        let conn = self.conn.lock().unwrap();

        Self::check_reference(&conn, "organizations", "organization", &request.organization_id)?;
        Self::check_reference(&conn, "venues", "venue", &request.venue_id)?;
        Self::check_reference(&conn, "event_categories", "category", &request.category_id)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let meta = Substrate::new(now);

        conn.execute(
            "INSERT INTO events (id, organization_id, venue_id, category_id, title, description, \
             starts_at, ends_at, status, capacity, created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'DRAFT', ?, ?, ?, 1, NULL, 0)",
            params![
                id,
                request.organization_id,
                request.venue_id,
                request.category_id,
                request.title,
                request.description,
                request.starts_at.to_rfc3339(),
                request.ends_at.to_rfc3339(),
                request.capacity,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                EventError::DuplicateTitle(request.title.clone())
            } else {
                map_err(e)
            }
        })?;

        Ok(Event {
            id,
            organization_id: request.organization_id,
            venue_id: request.venue_id,
            category_id: request.category_id,
            title: request.title,
            description: request.description,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            status: EventStatus::Draft,
            capacity: request.capacity,
            meta,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Event>, EventError> {
        let conn = self.conn.lock().unwrap();

        match Self::get_event_in(&conn, id) {
            Ok(event) => Ok(Some(event)),
            Err(EventError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, EventError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "{} ORDER BY starts_at ASC LIMIT ? OFFSET ?",
            Self::event_select(&where_clause)
        );

        let mut stmt = conn.prepare(&sql).map_err(map_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_event)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn count(&self, filter: &EventFilter) -> Result<i64, EventError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM events {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(map_err)
    }

    fn update(&self, id: &str, request: UpdateEventRequest) -> Result<Event, EventError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let current = Self::get_event_in(&tx, id)?;

        if current.meta.version != request.expected_version {
            return Err(EventError::StaleWrite {
                expected: request.expected_version,
                found: current.meta.version,
            });
        }

        let starts_at = request.starts_at.unwrap_or(current.starts_at);
        let ends_at = request.ends_at.unwrap_or(current.ends_at);
        if ends_at <= starts_at {
            return Err(EventError::InvalidSchedule);
        }

        let now = Utc::now();
        tx.execute(
            "UPDATE events SET \
             title = COALESCE(?, title), \
             description = COALESCE(?, description), \
             starts_at = ?, ends_at = ?, \
             capacity = COALESCE(?, capacity), \
             updated_at = ?, version = version + 1 \
             WHERE id = ?",
            params![
                request.title,
                request.description,
                starts_at.to_rfc3339(),
                ends_at.to_rfc3339(),
                request.capacity,
                now.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                EventError::DuplicateTitle(request.title.clone().unwrap_or_default())
            } else {
                map_err(e)
            }
        })?;

        let updated = Self::get_event_in(&tx, id)?;
        tx.commit().map_err(map_err)?;
        Ok(updated)
    }

    fn publish(&self, id: &str) -> Result<Event, EventError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let event = Self::get_event_in(&tx, id)?;

        if event.status != EventStatus::Draft {
            return Err(EventError::NotDraft {
                status: event.status.as_str().to_string(),
            });
        }

        let now = Utc::now();
        if event.has_started(now) {
            return Err(EventError::EventAlreadyStarted);
        }

        let tier_count: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM ticket_tiers WHERE event_id = ? AND deleted_at IS NULL",
                params![id],
                |row| row.get(0),
            )
            .map_err(map_err)?;
        if tier_count == 0 {
            return Err(EventError::NoTicketTiers);
        }

        tx.execute(
            "UPDATE events SET status = 'PUBLISHED', updated_at = ?, version = version + 1 \
             WHERE id = ?",
            params![now.to_rfc3339(), id],
        )
        .map_err(map_err)?;

        let published = Self::get_event_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        tracing::info!(event_id = %id, "Event published");
        Ok(published)
    }

    fn cancel(&self, id: &str) -> Result<CancelOutcome, EventError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        let event = Self::get_event_in(&tx, id)?;

        if event.status == EventStatus::Cancelled {
            return Err(EventError::AlreadyCancelled);
        }

        let now = Utc::now();

        // Cascade: gather the outstanding bookings on this event's tiers,
        // release their held seats, then cancel them. Tiers are updated
        // before the bookings flip status because the release amount is
        // derived from the still-outstanding rows.
        let (cancelled_bookings, released_seats): (i64, i64) = tx
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(b.quantity), 0) FROM bookings b \
                 JOIN ticket_tiers t ON t.id = b.tier_id \
                 WHERE t.event_id = ? AND b.status IN ('PENDING', 'CONFIRMED')",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(map_err)?;

        if cancelled_bookings > 0 {
            tx.execute(
                "UPDATE ticket_tiers SET \
                 sold = sold - (SELECT COALESCE(SUM(b.quantity), 0) FROM bookings b \
                                WHERE b.tier_id = ticket_tiers.id \
                                AND b.status IN ('PENDING', 'CONFIRMED')), \
                 updated_at = ?, version = version + 1 \
                 WHERE event_id = ?",
                params![now.to_rfc3339(), id],
            )
            .map_err(map_err)?;

            tx.execute(
                "UPDATE bookings SET status = 'CANCELLED', expires_at = NULL, \
                 updated_at = ?, version = version + 1 \
                 WHERE status IN ('PENDING', 'CONFIRMED') \
                 AND tier_id IN (SELECT id FROM ticket_tiers WHERE event_id = ?)",
                params![now.to_rfc3339(), id],
            )
            .map_err(map_err)?;
        }

        tx.execute(
            "UPDATE events SET status = 'CANCELLED', updated_at = ?, version = version + 1 \
             WHERE id = ?",
            params![now.to_rfc3339(), id],
        )
        .map_err(map_err)?;

        let cancelled = Self::get_event_in(&tx, id)?;
        tx.commit().map_err(map_err)?;

        tracing::info!(
            event_id = %id,
            cancelled_bookings,
            released_seats,
            "Event cancelled"
        );

        Ok(CancelOutcome {
            event: cancelled,
            cancelled_bookings: cancelled_bookings as u64,
            released_seats: released_seats as u64,
        })
    }

    fn soft_delete(&self, id: &str) -> Result<Event, EventError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().to_rfc3339();
        let updated = conn
            .execute(
                "UPDATE events SET deleted_at = ?, is_active = 0, updated_at = ?, \
                 version = version + 1 WHERE id = ? AND deleted_at IS NULL",
                params![now, now, id],
            )
            .map_err(map_err)?;

        if updated == 0 {
            return Err(EventError::NotFound(id.to_string()));
        }

        conn.query_row(
            &Self::event_select("WHERE id = ?"),
            params![id],
            Self::row_to_event,
        )
        .map_err(map_err)
    }

    fn hard_delete(&self, id: &str) -> Result<(), EventError> {
        let conn = self.conn.lock().unwrap();

        let references: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM bookings b \
                 JOIN ticket_tiers t ON t.id = b.tier_id WHERE t.event_id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(map_err)?;
        if references > 0 {
            return Err(EventError::ProtectedByBookings {
                id: id.to_string(),
                references,
            });
        }

        // Tiers go with the event (ON DELETE CASCADE).
        let deleted = conn
            .execute("DELETE FROM events WHERE id = ?", params![id])
            .map_err(map_err)?;

        if deleted == 0 {
            return Err(EventError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn create_tier(
        &self,
        event_id: &str,
        request: CreateTierRequest,
    ) -> Result<TicketTier, EventError> {
        if request.price < Decimal::ZERO {
            return Err(EventError::InvalidPrice(request.price));
        }

        let conn = self.conn.lock().unwrap();

        let event = Self::get_event_in(&conn, event_id)?;
        if event.status == EventStatus::Cancelled {
            return Err(EventError::EventCancelled);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let meta = Substrate::new(now);

        conn.execute(
            "INSERT INTO ticket_tiers (id, event_id, ticket_type, price, quota, sold, \
             created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, 1, NULL, 0)",
            params![
                id,
                event_id,
                request.ticket_type.as_str(),
                request.price.to_string(),
                request.quota,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                EventError::DuplicateTierType(request.ticket_type)
            } else {
                map_err(e)
            }
        })?;

        Ok(TicketTier {
            id,
            event_id: event_id.to_string(),
            ticket_type: request.ticket_type,
            price: request.price,
            quota: request.quota,
            sold: 0,
            meta,
        })
    }

    fn get_tier(&self, tier_id: &str) -> Result<Option<TicketTier>, EventError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &Self::tier_select("WHERE id = ? AND deleted_at IS NULL"),
            params![tier_id],
            Self::row_to_tier,
        );

        match result {
            Ok(tier) => Ok(Some(tier)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    fn list_tiers(&self, event_id: &str) -> Result<Vec<TicketTier>, EventError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&Self::tier_select(
                "WHERE event_id = ? AND deleted_at IS NULL ORDER BY CAST(price AS REAL) ASC",
            ))
            .map_err(map_err)?;

        let rows = stmt
            .query_map(params![event_id], Self::row_to_tier)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn available_tiers(&self, event_id: &str) -> Result<Vec<TicketTier>, EventError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&Self::tier_select(
                "WHERE event_id = ? AND deleted_at IS NULL AND quota > sold \
                 ORDER BY CAST(price AS REAL) ASC",
            ))
            .map_err(map_err)?;

        let rows = stmt
            .query_map(params![event_id], Self::row_to_tier)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn adjust_quota(&self, tier_id: &str, new_quota: u32) -> Result<TicketTier, EventError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_err)?;

        // Re-read sold under the exclusive transaction; a pre-lock snapshot
        // could race a concurrent reservation.
        let sold: u32 = tx
            .query_row(
                "SELECT sold FROM ticket_tiers WHERE id = ? AND deleted_at IS NULL",
                params![tier_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => EventError::NotFound(tier_id.to_string()),
                other => map_err(other),
            })?;

        if new_quota < sold {
            return Err(EventError::QuotaBelowSold { sold });
        }

        tx.execute(
            "UPDATE ticket_tiers SET quota = ?, updated_at = ?, version = version + 1 \
             WHERE id = ?",
            params![new_quota, Utc::now().to_rfc3339(), tier_id],
        )
        .map_err(map_err)?;

        let tier = tx
            .query_row(
                &Self::tier_select("WHERE id = ?"),
                params![tier_id],
                Self::row_to_tier,
            )
            .map_err(map_err)?;

        tx.commit().map_err(map_err)?;
        Ok(tier)
    }
}
