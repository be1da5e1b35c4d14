use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::{dto, errors, services::AppServices};

/// POST /auth/login
///
/// Exchanges a username/password for a bearer token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.username, &body.password).await {
        Ok((token, user)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "token": token,
                "token_type": "Bearer",
                "expires_in": services.token_ttl_seconds(),
                "user": dto::user_to_json(&user),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
