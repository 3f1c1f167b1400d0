//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`, chat sockets under `/ws/chat/`, and the
//! liveness probe at `/health`. Middleware: CORS, tracing.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/consultations",
            post(handlers::consultation::create_consultation).get(handlers::consultation::list_consultations),
        )
        .route("/consultations/{id}", get(handlers::consultation::get_consultation))
        .route(
            "/consultations/{id}/start",
            post(handlers::consultation::start_consultation),
        )
        .route(
            "/consultations/{id}/end",
            post(handlers::consultation::end_consultation),
        )
        .route(
            "/consultations/{id}/cancel",
            post(handlers::consultation::cancel_consultation),
        )
        .route(
            "/consultations/{id}/messages",
            get(handlers::consultation::list_messages),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws/chat/{consultation_id}", get(handlers::ws::chat_ws))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": state.fabric.room_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn test_health_reports_open_rooms() {
        let (state, _dir) = test_state().await;
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rooms"], 0);
    }

    #[tokio::test]
    async fn test_router_builds_with_state() {
        let (state, _dir) = test_state().await;
        let _router = build_router(state);
    }
}
