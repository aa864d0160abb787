use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_mw;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware;
use crate::state::AppState;

pub mod health;
pub mod sections;
pub mod snippets;

/// Extractor body cap. Kept above the 1 MiB write cap, which the Gateway
/// enforces.
const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (no store access)
        .route("/health", get(health::health_check))
        .route("/sections", get(sections::list_sections))
        .route(
            "/snippets",
            get(snippets::list_snippets).post(snippets::create_snippet),
        )
        .route(
            "/snippets/{id}",
            get(snippets::get_snippet)
                .patch(snippets::update_snippet)
                // The admin form saves edits with PUT.
                .put(snippets::update_snippet)
                .delete(snippets::delete_snippet),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
