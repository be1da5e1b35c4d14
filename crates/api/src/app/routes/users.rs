use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use printshop_auth::{NewUser, Role, permissions};
use printshop_core::UserId;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", delete(delete_user))
}

/// GET /users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::USERS_READ) {
        return resp;
    }

    match services.users() {
        Ok(users) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": users.len(),
                "users": users.iter().map(dto::user_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::USERS_WRITE) {
        return resp;
    }

    let role: Role = match body.role.parse() {
        Ok(r) => r,
        Err(e) => return errors::auth_error_to_response(e),
    };

    let new_user = NewUser {
        username: body.username,
        role,
        password: body.password,
    };

    match services.add_user(new_user).await {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, &permissions::USERS_WRITE) {
        return resp;
    }

    let user_id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"),
    };
    if user_id == principal.user_id() {
        return errors::json_error(
            StatusCode::CONFLICT,
            "cannot_delete_self",
            "you cannot delete your own account",
        );
    }

    match services.remove_user(user_id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
