//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`; `/health` and the `/ws` live channel
//! sit at the root. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chats
        .route("/chats", post(handlers::chat::create_chat))
        .route(
            "/chats/{id}",
            get(handlers::chat::get_chat).delete(handlers::chat::delete_chat),
        )
        .route("/chats/{id}/messages", post(handlers::chat::add_message))
        .route("/chats/{id}/sync", put(handlers::chat::sync_chat))
        .route(
            "/chats/{id}/volatile",
            axum::routing::delete(handlers::chat::delete_volatile),
        )
        // Participants
        .route(
            "/persons/{person_id}",
            put(handlers::participant::register_person),
        )
        .route(
            "/participants",
            post(handlers::participant::add_participant)
                .delete(handlers::participant::remove_participant),
        )
        .route(
            "/participants/{person_id}/chats",
            get(handlers::participant::list_chats_for_person),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness only; does not touch the stores.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
