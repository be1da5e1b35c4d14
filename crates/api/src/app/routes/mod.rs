use axum::{Router, routing::get};

pub mod auth;
pub mod batches;
pub mod events;
pub mod prints;
pub mod stats;
pub mod system;
pub mod users;
pub mod withdrawals;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/stats", get(stats::get_stats))
        .route("/events", get(events::list_events))
        .merge(withdrawals::router())
        .nest("/prints", prints::router())
        .nest("/batches", batches::router())
        .nest("/users", users::router())
}
