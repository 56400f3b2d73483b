//! SQLite-backed directory store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db;
use crate::entity::{Substrate, SUBSTRATE_COLUMNS};

use super::{
    CreateOrganizationRequest, CreateVenueRequest, DirectoryError, DirectoryStore, EventCategory,
    Organization, UpdateOrganizationRequest, UpdateVenueRequest, Venue,
};

/// SQLite-backed directory store.
pub struct SqliteDirectoryStore {
    conn: Mutex<Connection>,
}

impl SqliteDirectoryStore {
    /// Create a new SQLite directory store, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path) -> Result<Self, DirectoryError> {
        let conn = db::open(path).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite directory store (useful for testing).
    pub fn in_memory() -> Result<Self, DirectoryError> {
        let conn = db::open_in_memory().map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_organization(row: &rusqlite::Row) -> rusqlite::Result<Organization> {
        Ok(Organization {
            id: row.get(0)?,
            name: row.get(1)?,
            website: row.get(2)?,
            contact_email: row.get(3)?,
            meta: Substrate::from_row(row, 4)?,
        })
    }

    fn row_to_venue(row: &rusqlite::Row) -> rusqlite::Result<Venue> {
        Ok(Venue {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            capacity: row.get(3)?,
            meta: Substrate::from_row(row, 4)?,
        })
    }

    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<EventCategory> {
        Ok(EventCategory {
            id: row.get(0)?,
            name: row.get(1)?,
            meta: Substrate::from_row(row, 2)?,
        })
    }

    /// Count events referencing the row through `column`. `live_only`
    /// restricts the count to non-deleted events (soft-delete protection);
    /// hard delete protects against any reference.
    fn count_event_references(
        conn: &Connection,
        column: &str,
        id: &str,
        live_only: bool,
    ) -> Result<i64, DirectoryError> {
        let sql = if live_only {
            format!("SELECT COUNT(*) FROM events WHERE {} = ? AND deleted_at IS NULL", column)
        } else {
            format!("SELECT COUNT(*) FROM events WHERE {} = ?", column)
        };
        conn.query_row(&sql, params![id], |row| row.get(0))
            .map_err(map_err)
    }

    /// Soft delete one row of `table`, refusing while live events reference
    /// it through `ref_column`.
    fn soft_delete_row(
        conn: &Connection,
        table: &str,
        entity: &'static str,
        ref_column: &str,
        id: &str,
    ) -> Result<(), DirectoryError> {
        let references = Self::count_event_references(conn, ref_column, id, true)?;
        if references > 0 {
            return Err(DirectoryError::ProtectedReference {
                entity,
                id: id.to_string(),
                references,
            });
        }

        let now = Utc::now().to_rfc3339();
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET deleted_at = ?, is_active = 0, updated_at = ?, \
                     version = version + 1 WHERE id = ? AND deleted_at IS NULL",
                    table
                ),
                params![now, now, id],
            )
            .map_err(map_err)?;

        if updated == 0 {
            return Err(DirectoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Physically delete one row of `table`, refusing while any event
    /// references it through `ref_column`.
    fn hard_delete_row(
        conn: &Connection,
        table: &str,
        entity: &'static str,
        ref_column: &str,
        id: &str,
    ) -> Result<(), DirectoryError> {
        let references = Self::count_event_references(conn, ref_column, id, false)?;
        if references > 0 {
            return Err(DirectoryError::ProtectedReference {
                entity,
                id: id.to_string(),
                references,
            });
        }

        let deleted = conn
            .execute(&format!("DELETE FROM {} WHERE id = ?", table), params![id])
            .map_err(map_err)?;

        if deleted == 0 {
            return Err(DirectoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Distinguish a stale write from a missing row after a guarded UPDATE
    /// touched nothing.
    fn stale_or_missing(
        conn: &Connection,
        table: &str,
        id: &str,
        expected: u32,
    ) -> DirectoryError {
        let found: Result<u32, _> = conn.query_row(
            &format!("SELECT version FROM {} WHERE id = ? AND deleted_at IS NULL", table),
            params![id],
            |row| row.get(0),
        );
        match found {
            Ok(found) => DirectoryError::StaleWrite { expected, found },
            Err(_) => DirectoryError::NotFound(id.to_string()),
        }
    }
}

fn map_err(e: rusqlite::Error) -> DirectoryError {
    if db::is_busy(&e) {
        DirectoryError::Busy
    } else {
        DirectoryError::Database(e.to_string())
    }
}

/// Map an insert/update error, turning UNIQUE violations into DuplicateName.
fn map_write_err(e: rusqlite::Error, name: &str) -> DirectoryError {
    if db::is_unique_violation(&e) {
        DirectoryError::DuplicateName(name.to_string())
    } else {
        map_err(e)
    }
}

impl DirectoryStore for SqliteDirectoryStore {
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<Organization, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let meta = Substrate::new(now);

        conn.execute(
            "INSERT INTO organizations (id, name, website, contact_email, created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, 1, NULL, 0)",
            params![
                id,
                request.name,
                request.website,
                request.contact_email,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| map_write_err(e, &request.name))?;

        Ok(Organization {
            id,
            name: request.name,
            website: request.website,
            contact_email: request.contact_email,
            meta,
        })
    }

    fn get_organization(&self, id: &str) -> Result<Option<Organization>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!(
                "SELECT id, name, website, contact_email, {} FROM organizations \
                 WHERE id = ? AND deleted_at IS NULL",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_organization,
        );

        match result {
            Ok(org) => Ok(Some(org)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    fn list_organizations(&self) -> Result<Vec<Organization>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, website, contact_email, {} FROM organizations \
                 WHERE deleted_at IS NULL ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt
            .query_map([], Self::row_to_organization)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn list_all_organizations(&self) -> Result<Vec<Organization>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, website, contact_email, {} FROM organizations ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt
            .query_map([], Self::row_to_organization)
            .map_err(map_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn update_organization(
        &self,
        id: &str,
        request: UpdateOrganizationRequest,
    ) -> Result<Organization, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().to_rfc3339();
        let name_for_err = request.name.clone().unwrap_or_default();
        let updated = conn
            .execute(
                "UPDATE organizations SET \
                 name = COALESCE(?, name), \
                 website = COALESCE(?, website), \
                 contact_email = COALESCE(?, contact_email), \
                 updated_at = ?, version = version + 1 \
                 WHERE id = ? AND deleted_at IS NULL AND version = ?",
                params![
                    request.name,
                    request.website,
                    request.contact_email,
                    now,
                    id,
                    request.expected_version,
                ],
            )
            .map_err(|e| map_write_err(e, &name_for_err))?;

        if updated == 0 {
            return Err(Self::stale_or_missing(
                &conn,
                "organizations",
                id,
                request.expected_version,
            ));
        }

        drop(conn);
        self.get_organization(id)?
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    fn soft_delete_organization(&self, id: &str) -> Result<Organization, DirectoryError> {
        {
            let conn = self.conn.lock().unwrap();
            Self::soft_delete_row(&conn, "organizations", "organization", "organization_id", id)?;
        }

        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT id, name, website, contact_email, {} FROM organizations WHERE id = ?",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_organization,
        )
        .map_err(map_err)
    }

    fn hard_delete_organization(&self, id: &str) -> Result<(), DirectoryError> {
        let conn = self.conn.lock().unwrap();
        Self::hard_delete_row(&conn, "organizations", "organization", "organization_id", id)
    }

    fn create_venue(&self, request: CreateVenueRequest) -> Result<Venue, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let meta = Substrate::new(now);

        conn.execute(
            "INSERT INTO venues (id, name, address, capacity, created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, 1, NULL, 0)",
            params![
                id,
                request.name,
                request.address,
                request.capacity,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| map_write_err(e, &request.name))?;

        Ok(Venue {
            id,
            name: request.name,
            address: request.address,
            capacity: request.capacity,
            meta,
        })
    }

    fn get_venue(&self, id: &str) -> Result<Option<Venue>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!(
                "SELECT id, name, address, capacity, {} FROM venues \
                 WHERE id = ? AND deleted_at IS NULL",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_venue,
        );

        match result {
            Ok(venue) => Ok(Some(venue)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    fn list_venues(&self) -> Result<Vec<Venue>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, address, capacity, {} FROM venues \
                 WHERE deleted_at IS NULL ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt.query_map([], Self::row_to_venue).map_err(map_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn list_all_venues(&self) -> Result<Vec<Venue>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, address, capacity, {} FROM venues ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt.query_map([], Self::row_to_venue).map_err(map_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn update_venue(&self, id: &str, request: UpdateVenueRequest) -> Result<Venue, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().to_rfc3339();
        let name_for_err = request.name.clone().unwrap_or_default();
        let updated = conn
            .execute(
                "UPDATE venues SET \
                 name = COALESCE(?, name), \
                 address = COALESCE(?, address), \
                 capacity = COALESCE(?, capacity), \
                 updated_at = ?, version = version + 1 \
                 WHERE id = ? AND deleted_at IS NULL AND version = ?",
                params![
                    request.name,
                    request.address,
                    request.capacity,
                    now,
                    id,
                    request.expected_version,
                ],
            )
            .map_err(|e| map_write_err(e, &name_for_err))?;

        if updated == 0 {
            return Err(Self::stale_or_missing(
                &conn,
                "venues",
                id,
                request.expected_version,
            ));
        }

        drop(conn);
        self.get_venue(id)?
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    fn soft_delete_venue(&self, id: &str) -> Result<Venue, DirectoryError> {
        {
            let conn = self.conn.lock().unwrap();
            Self::soft_delete_row(&conn, "venues", "venue", "venue_id", id)?;
        }

        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT id, name, address, capacity, {} FROM venues WHERE id = ?",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_venue,
        )
        .map_err(map_err)
    }

    fn hard_delete_venue(&self, id: &str) -> Result<(), DirectoryError> {
        let conn = self.conn.lock().unwrap();
        Self::hard_delete_row(&conn, "venues", "venue", "venue_id", id)
    }

    fn create_category(&self, name: &str) -> Result<EventCategory, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let meta = Substrate::new(now);

        conn.execute(
            "INSERT INTO event_categories (id, name, created_at, updated_at, is_active, deleted_at, version) \
             VALUES (?, ?, ?, ?, 1, NULL, 0)",
            params![id, name, now.to_rfc3339(), now.to_rfc3339()],
        )
        .map_err(|e| map_write_err(e, name))?;

        Ok(EventCategory {
            id,
            name: name.to_string(),
            meta,
        })
    }

    fn get_category(&self, id: &str) -> Result<Option<EventCategory>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!(
                "SELECT id, name, {} FROM event_categories WHERE id = ? AND deleted_at IS NULL",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_category,
        );

        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    fn list_categories(&self) -> Result<Vec<EventCategory>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, {} FROM event_categories \
                 WHERE deleted_at IS NULL ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt.query_map([], Self::row_to_category).map_err(map_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn list_all_categories(&self) -> Result<Vec<EventCategory>, DirectoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, {} FROM event_categories ORDER BY name ASC",
                SUBSTRATE_COLUMNS
            ))
            .map_err(map_err)?;

        let rows = stmt.query_map([], Self::row_to_category).map_err(map_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }

    fn soft_delete_category(&self, id: &str) -> Result<EventCategory, DirectoryError> {
        {
            let conn = self.conn.lock().unwrap();
            Self::soft_delete_row(&conn, "event_categories", "category", "category_id", id)?;
        }

        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT id, name, {} FROM event_categories WHERE id = ?",
                SUBSTRATE_COLUMNS
            ),
            params![id],
            Self::row_to_category,
        )
        .map_err(map_err)
    }

    fn hard_delete_category(&self, id: &str) -> Result<(), DirectoryError> {
        let conn = self.conn.lock().unwrap();
        Self::hard_delete_row(&conn, "event_categories", "category", "category_id", id)
    }
}
