use std::sync::Arc;

use boxoffice_core::{
    AuditHandle, AuditStore, Authenticator, BookingStore, Config, DirectoryStore, EventStore,
    ExpiryReaper, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    directory_store: Arc<dyn DirectoryStore>,
    event_store: Arc<dyn EventStore>,
    booking_store: Arc<dyn BookingStore>,
    audit_handle: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    reaper: Option<Arc<ExpiryReaper>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        directory_store: Arc<dyn DirectoryStore>,
        event_store: Arc<dyn EventStore>,
        booking_store: Arc<dyn BookingStore>,
        audit_handle: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        reaper: Option<Arc<ExpiryReaper>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            directory_store,
            event_store,
            booking_store,
            audit_handle,
            audit_store,
            reaper,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn directory(&self) -> &dyn DirectoryStore {
        self.directory_store.as_ref()
    }

    pub fn events(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }

    pub fn bookings(&self) -> &dyn BookingStore {
        self.booking_store.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit_handle
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn reaper(&self) -> Option<&Arc<ExpiryReaper>> {
        self.reaper.as_ref()
    }
}
