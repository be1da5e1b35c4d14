use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use printshop_auth::permissions;
use printshop_inventory::Withdraw;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/withdrawals", post(withdraw))
}

/// POST /withdrawals
///
/// Moves `quantity` units of an in-process print to completed.
pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::WithdrawRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::INVENTORY_WITHDRAW) {
        return resp;
    }

    let quantity = match body.quantity.parse() {
        Ok(q) => q,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let cmd = Withdraw {
        code: body.code,
        quantity,
        occurred_at: Utc::now(),
    };
    let code = cmd.code.trim().to_string();

    let committed = match services.withdraw(cmd) {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "code": code,
            "quantity": quantity,
            "events_committed": committed.len(),
            "events": committed.iter().map(dto::envelope_to_json).collect::<Vec<_>>(),
        })),
    )
        .into_response()
}
