//! Shared persistence substrate carried by every entity.
//!
//! Each entity struct embeds a [`Substrate`] value instead of inheriting
//! behavior: timestamps, the active flag, the soft-delete marker and the
//! optimistic-concurrency version all live here, and the storage layer
//! applies the same read/write policy to every table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column list shared by every table, in the order [`Substrate::from_row`]
/// expects to read them.
pub const SUBSTRATE_COLUMNS: &str = "created_at, updated_at, is_active, deleted_at, version";

/// Bookkeeping fields common to all persisted entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    /// Set once at insert, never changed afterwards.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
    /// Enable/disable flag; forced to false on soft delete.
    pub is_active: bool,
    /// Soft-delete marker. Default read paths exclude rows where this is set.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped on every state-changing update.
    pub version: u32,
}

impl Substrate {
    /// Fresh substrate for a row inserted at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            is_active: true,
            deleted_at: None,
            version: 0,
        }
    }

    /// Whether the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Read the substrate columns from a row, starting at `offset`.
    ///
    /// Columns must appear in [`SUBSTRATE_COLUMNS`] order.
    pub fn from_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Self> {
        let created_at_str: String = row.get(offset)?;
        let updated_at_str: String = row.get(offset + 1)?;
        let is_active: bool = row.get(offset + 2)?;
        let deleted_at_str: Option<String> = row.get(offset + 3)?;
        let version: u32 = row.get(offset + 4)?;

        Ok(Self {
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
            is_active,
            deleted_at: deleted_at_str.as_deref().map(parse_timestamp),
            version,
        })
    }
}

/// Parse an RFC 3339 timestamp, falling back to now on corrupt data.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_substrate() {
        let now = Utc::now();
        let meta = Substrate::new(now);
        assert_eq!(meta.created_at, now);
        assert_eq!(meta.updated_at, now);
        assert!(meta.is_active);
        assert!(!meta.is_deleted());
        assert_eq!(meta.version, 0);
    }

    #[test]
    fn test_deleted_flag() {
        let now = Utc::now();
        let mut meta = Substrate::new(now);
        meta.deleted_at = Some(now);
        assert!(meta.is_deleted());
    }

    #[test]
    fn test_parse_timestamp_roundtrip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&now.to_rfc3339());
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_parse_timestamp_garbage_does_not_panic() {
        let _ = parse_timestamp("not a timestamp");
    }
}
