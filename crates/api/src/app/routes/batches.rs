use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;

use printshop_auth::permissions;
use printshop_inventory::{BatchDefinition, BatchEntry};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_batches).post(define_batch))
        .route("/:code", delete(remove_batch))
        .route("/:code/withdraw", post(withdraw_batch))
}

/// GET /batches
pub async fn list_batches(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::BATCHES_READ) {
        return resp;
    }

    match services.batches() {
        Ok(batches) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": batches.len(),
                "batches": batches.iter().map(dto::batch_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /batches
pub async fn define_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::DefineBatchRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::BATCHES_WRITE) {
        return resp;
    }

    let mut entries = Vec::with_capacity(body.entries.len());
    for entry in &body.entries {
        match entry.quantity.parse() {
            Ok(q) => entries.push(BatchEntry::new(entry.code.clone(), q)),
            Err(e) => return errors::ledger_error_to_response(e),
        }
    }

    let batch = match BatchDefinition::new(body.code, body.name, entries) {
        Ok(b) => b,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.define_batch(batch) {
        Ok(batch) => (StatusCode::CREATED, Json(dto::batch_to_json(&batch))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /batches/:code
pub async fn remove_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::BATCHES_WRITE) {
        return resp;
    }

    match services.remove_batch(&code) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /batches/:code/withdraw
///
/// Withdraws every entry of the batch, or nothing if any entry fails.
pub async fn withdraw_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::INVENTORY_WITHDRAW) {
        return resp;
    }

    match services.withdraw_batch(&code, Utc::now()) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "batch": code,
                "events_committed": committed.len(),
                "events": committed.iter().map(dto::envelope_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
