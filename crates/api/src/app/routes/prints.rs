use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::Utc;

use printshop_auth::permissions;
use printshop_core::RecordId;
use printshop_inventory::{CorrectQuantity, RecordStatus, RegisterPrint, UpdateStatus};

use crate::app::{
    dto, errors,
    services::{AppServices, RecordFilter},
};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_records).post(register_print))
        .route("/catalog", get(list_catalog))
        .route("/catalog/:code", get(get_catalog_entry))
        .route("/:id", get(get_record))
        .route("/:id/status", patch(update_status))
        .route("/:id/quantity", patch(correct_quantity))
}

fn parse_record_id(id: &str) -> Result<RecordId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid record id"))
}

fn parse_status(raw: &str) -> Result<RecordStatus, axum::response::Response> {
    raw.parse().map_err(errors::ledger_error_to_response)
}

/// GET /prints?status=in_process&code=EST001
///
/// Inventory records in ledger order.
pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::RecordListQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::PRINTS_READ) {
        return resp;
    }

    let status = match query.status.as_deref().map(parse_status).transpose() {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let filter = RecordFilter {
        status,
        code: query.code,
    };

    match services.records(&filter) {
        Ok(records) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": records.len(),
                "records": records.iter().map(dto::record_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /prints
///
/// Registers a new print and its initial lot.
pub async fn register_print(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterPrintRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::PRINTS_CREATE) {
        return resp;
    }

    let quantity = match body.quantity.parse() {
        Ok(q) => q,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let status = match body.status.as_deref().map(parse_status).transpose() {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let cmd = RegisterPrint {
        code: body.code,
        name: body.name,
        description: body.description,
        image_url: body.image_url,
        quantity,
        status,
        operator: body
            .operator
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| principal.username().to_string()),
        occurred_at: Utc::now(),
    };

    match services.register_print(cmd) {
        Ok(record) => (StatusCode::CREATED, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /prints/catalog
pub async fn list_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::PRINTS_READ) {
        return resp;
    }

    match services.prints() {
        Ok(prints) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": prints.len(),
                "prints": prints.iter().map(dto::print_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /prints/catalog/:code
///
/// Catalog entry with its in-process and total quantities.
pub async fn get_catalog_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::PRINTS_READ) {
        return resp;
    }

    match services.print_summary(&code) {
        Ok((print, in_process, total)) => {
            let mut body = dto::print_to_json(&print);
            body["in_process_quantity"] = serde_json::json!(in_process);
            body["total_quantity"] = serde_json::json!(total);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /prints/:id
pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::PRINTS_READ) {
        return resp;
    }
    let record_id = match parse_record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.record(record_id) {
        Ok(record) => (StatusCode::OK, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PATCH /prints/:id/status
pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::INVENTORY_STATUS) {
        return resp;
    }
    let record_id = match parse_record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match parse_status(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let cmd = UpdateStatus {
        record_id,
        status,
        occurred_at: Utc::now(),
    };

    match services.update_status(cmd) {
        Ok(record) => (StatusCode::OK, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PATCH /prints/:id/quantity
///
/// Administrative correction of a record's quantity.
pub async fn correct_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CorrectQuantityRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::INVENTORY_ADJUST) {
        return resp;
    }
    let record_id = match parse_record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match body.quantity.parse_correction() {
        Ok(q) => q,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let cmd = CorrectQuantity {
        record_id,
        quantity,
        occurred_at: Utc::now(),
    };

    match services.correct_quantity(cmd) {
        Ok(record) => (StatusCode::OK, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
