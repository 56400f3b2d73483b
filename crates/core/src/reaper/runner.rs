//! Booking expiry reaper.
//!
//! A pending booking holds its seats until it is confirmed, cancelled or
//! its `expires_at` passes. Confirm rejects lapsed holds lazily, but
//! without an active sweep a never-confirmed hold would keep its seats
//! forever. The reaper periodically scans for lapsed holds and runs the
//! expire transition (cancel + release) on each.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::booking::{BookingFilter, BookingStatus, BookingStore};
use crate::metrics;

use super::config::ReaperConfig;

/// Snapshot of the reaper's state for the status API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReaperStatus {
    pub running: bool,
    /// Pending bookings currently in the store (not only overdue ones).
    pub pending_count: usize,
}

/// The expiry reaper - sweeps lapsed pending bookings in the background.
pub struct ExpiryReaper {
    config: ReaperConfig,
    bookings: Arc<dyn BookingStore>,
    audit: Option<AuditHandle>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ExpiryReaper {
    /// Create a new reaper.
    pub fn new(
        config: ReaperConfig,
        bookings: Arc<dyn BookingStore>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            bookings,
            audit,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the reaper (spawns the sweep loop).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Reaper already running");
            return;
        }

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Starting expiry reaper"
        );

        let bookings = Arc::clone(&self.bookings);
        let audit = self.audit.clone();
        let running = Arc::clone(&self.running);
        let batch_size = self.config.batch_size;
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            // The first tick fires immediately; holds that lapsed while the
            // service was down are released on startup.
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::sweep(&bookings, &audit, batch_size);
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            info!("Expiry reaper stopped");
        });
    }

    /// Stop the reaper gracefully.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Reaper not running");
            return;
        }

        info!("Stopping expiry reaper");
        let _ = self.shutdown_tx.send(());
    }

    /// Current reaper status.
    pub fn status(&self) -> ReaperStatus {
        let pending_count = self
            .bookings
            .count(&BookingFilter::new().with_status(BookingStatus::Pending))
            .unwrap_or(0) as usize;

        ReaperStatus {
            running: self.running.load(Ordering::Relaxed),
            pending_count,
        }
    }

    /// One sweep: expire up to `batch_size` lapsed holds.
    fn sweep(bookings: &Arc<dyn BookingStore>, audit: &Option<AuditHandle>, batch_size: i64) {
        metrics::REAPER_SWEEPS.inc();

        let expired = match bookings.expire_overdue(Utc::now(), batch_size) {
            Ok(expired) => expired,
            Err(e) => {
                warn!("Reaper sweep failed: {}", e);
                return;
            }
        };

        if expired.is_empty() {
            debug!("Reaper sweep found no lapsed holds");
            return;
        }

        metrics::REAPER_EXPIRED.inc_by(expired.len() as u64);
        info!(count = expired.len(), "Expired lapsed booking holds");

        if let Some(audit) = audit {
            for booking in &expired {
                audit.try_emit(AuditEvent::BookingExpired {
                    booking_id: booking.id.clone(),
                    user_id: booking.user_id.clone(),
                    tier_id: booking.tier_id.clone(),
                    quantity: booking.quantity,
                });
            }
        }
    }
}
