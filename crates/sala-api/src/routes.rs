use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};

use sala_types::api::HealthResponse;

use crate::messages;
use crate::middleware::identify;
use crate::participants;
use crate::state::AppState;

/// Every chat route, with the `user` header already resolved into an
/// [`Identity`](crate::middleware::Identity) extension.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/participants",
            post(participants::register).get(participants::list_participants),
        )
        .route("/status", post(participants::heartbeat))
        .route(
            "/messages",
            post(messages::send_message).get(messages::get_messages),
        )
        .route(
            "/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/health", get(health))
        .layer(middleware::from_fn(identify))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
