//! Audit query API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use boxoffice_core::{AuditFilter, AuditRecord};

use super::bookings::ApiErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the audit log
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub booking_id: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for audit queries
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub records: Vec<AuditRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query the audit log with optional filters
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = AuditFilter::new()
        .with_limit(limit)
        .with_offset(offset)
        .with_time_range(params.from, params.to);

    if let Some(ref booking_id) = params.booking_id {
        filter = filter.with_booking_id(booking_id.as_str());
    }

    if let Some(ref event_type) = params.event_type {
        filter = filter.with_event_type(event_type.as_str());
    }

    if let Some(ref user_id) = params.user_id {
        filter = filter.with_user_id(user_id.as_str());
    }

    let error = |e: boxoffice_core::AuditError| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse {
                error: e.to_string(),
            }),
        )
    };

    let records = state.audit_store().query(&filter).map_err(error)?;

    let count_filter = AuditFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state.audit_store().count(&count_filter).map_err(error)?;

    Ok(Json(AuditQueryResponse {
        records,
        total,
        limit,
        offset,
    }))
}
