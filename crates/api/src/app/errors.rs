use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use printshop_auth::AuthError;
use printshop_core::DomainError;
use printshop_inventory::LedgerError;

use crate::app::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Ledger(e) => ledger_error_to_response(e),
        ServiceError::Auth(e) => auth_error_to_response(e),
        ServiceError::Token(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "token_error",
            e.to_string(),
        ),
        ServiceError::LockPoisoned(what) => {
            tracing::error!(state = what, "state lock poisoned");
            internal_error("internal state unavailable")
        }
        ServiceError::Blocking(msg) => {
            tracing::error!(error = %msg, "blocking task failed");
            internal_error("internal task failed")
        }
    }
}

/// HTTP status for a coarse domain error class.
pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let code = err.kind();
    let message = err.to_string();

    let mut body = json!({
        "error": code,
        "message": message,
    });
    if let LedgerError::InsufficientQuantity {
        code,
        requested,
        available,
    } = err.root()
    {
        body["code"] = json!(code);
        body["requested"] = json!(requested);
        body["available"] = json!(available);
    }
    if let LedgerError::BatchEntryFailed { index, code, .. } = &err {
        body["batch_entry"] = json!({ "index": index, "code": code });
    }

    let status = domain_status(&DomainError::from(err));
    (status, axum::Json(body)).into_response()
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let code = match &err {
        AuthError::MissingCredentials => "missing_credentials",
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::DuplicateUsername(_) => "duplicate_username",
        AuthError::UserNotFound(_) => "user_not_found",
        AuthError::UnknownRole(_) | AuthError::Validation(_) => "validation_error",
        AuthError::PasswordHash(_) => {
            tracing::error!(error = %err, "password hashing failed");
            return internal_error("password hashing failed");
        }
    };
    let message = err.to_string();
    json_error(domain_status(&DomainError::from(err)), code, message)
}

fn internal_error(message: &'static str) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
