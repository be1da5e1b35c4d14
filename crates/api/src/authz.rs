//! API-side authorization guard.
//!
//! Role gating happens here, before a handler touches the ledger. The ledger
//! itself is auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use printshop_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the request principal holds `required`.
///
/// Returns a ready-made 403 response on failure.
pub fn require(principal: &PrincipalContext, required: &Permission) -> Result<(), Response> {
    authorize(principal.principal(), required).map_err(|e| {
        tracing::info!(
            user = principal.username(),
            role = %principal.role(),
            permission = required.as_str(),
            "forbidden"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
