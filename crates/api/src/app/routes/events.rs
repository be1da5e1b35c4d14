//! Ledger journal inspection.
//!
//! Clients that fall behind the `/stream` feed catch up here with
//! `?after=<last seen sequence number>`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use printshop_auth::permissions;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

/// GET /events?after=N
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::EventListQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::STATS_READ) {
        return resp;
    }

    let events = match services.events_since(query.after.unwrap_or(0)) {
        Ok(v) => v,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "count": events.len(),
            "last_sequence": events.last().map(|e| e.sequence_number()).or(query.after).unwrap_or(0),
            "events": events.iter().map(dto::envelope_to_json).collect::<Vec<_>>(),
        })),
    )
        .into_response()
}
