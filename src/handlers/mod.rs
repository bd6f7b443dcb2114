mod organizations;
mod uploads;
pub mod webhooks;
mod workspaces;

pub use organizations::*;
pub use uploads::*;
pub use workspaces::*;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;
use crate::middleware::session_auth;

pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route(
            "/organizations",
            get(list_organizations)
                .post(create_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route(
            "/workspaces",
            get(list_workspaces)
                .post(create_workspace)
                .put(update_workspace)
                .delete(delete_workspace),
        )
        // The largest upload category allows 100 MB; the per-category
        // limits in the handler do the real enforcement.
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(110 * 1024 * 1024)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_auth));

    Router::new()
        .route("/health", get(health))
        .route(
            "/webhooks/identity",
            post(webhooks::handle_identity_webhook),
        )
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
