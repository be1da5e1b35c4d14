use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use printshop_auth::permissions;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

/// GET /stats
pub async fn get_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::STATS_READ) {
        return resp;
    }

    match services.stats() {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(&stats))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
