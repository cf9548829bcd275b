pub mod auth;
pub mod chats;
mod convert;
pub mod error;
pub mod matches;
pub mod middleware;
pub mod routes;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Full API surface: public auth endpoints and liveness probe, plus the
/// bearer-token-protected domain routes.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login))
        .route("/api/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/routes", get(routes::list_catalog_routes))
        .route(
            "/api/user/routes",
            get(routes::list_user_routes).post(routes::add_user_route),
        )
        .route(
            "/api/user/routes/{user_route_id}",
            delete(routes::remove_user_route),
        )
        .route("/api/connect/users", get(matches::find_matches))
        .route(
            "/api/chats",
            get(chats::list_chats).post(chats::create_or_get_chat),
        )
        .route("/api/chats/{chat_id}", get(chats::get_chat))
        .route(
            "/api/chats/{chat_id}/messages",
            get(chats::list_messages).post(chats::send_message),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
