use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{audit, bookings, directory, events, handlers, middleware as mw};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config, reaper status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/reaper/status", get(handlers::reaper_status))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Directory: organizations
        .route("/organizations", post(directory::create_organization))
        .route("/organizations", get(directory::list_organizations))
        .route("/organizations/{id}", get(directory::get_organization))
        .route("/organizations/{id}", patch(directory::update_organization))
        .route("/organizations/{id}", delete(directory::delete_organization))
        // Directory: venues
        .route("/venues", post(directory::create_venue))
        .route("/venues", get(directory::list_venues))
        .route("/venues/{id}", get(directory::get_venue))
        .route("/venues/{id}", patch(directory::update_venue))
        .route("/venues/{id}", delete(directory::delete_venue))
        // Directory: categories
        .route("/categories", post(directory::create_category))
        .route("/categories", get(directory::list_categories))
        .route("/categories/{id}", delete(directory::delete_category))
        // Events and the publication gate
        .route("/events", post(events::create_event))
        .route("/events", get(events::list_events))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}", patch(events::update_event))
        .route("/events/{id}", delete(events::delete_event))
        .route("/events/{id}/publish", post(events::publish_event))
        .route("/events/{id}/cancel", post(events::cancel_event))
        // Ticket tiers
        .route("/events/{id}/tiers", post(events::create_tier))
        .route("/events/{id}/tiers", get(events::list_tiers))
        .route("/events/{id}/tiers/available", get(events::available_tiers))
        .route("/tiers/{id}", get(events::get_tier))
        .route("/tiers/{id}/quota", patch(events::adjust_quota))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/{id}", get(bookings::get_booking))
        .route("/bookings/{id}/confirm", post(bookings::confirm_booking))
        .route("/bookings/{id}/cancel", post(bookings::cancel_booking))
        .route("/bookings/{id}/refund", post(bookings::refund_booking))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            mw::auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(mw::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
