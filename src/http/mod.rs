pub mod auth;
pub mod dto;
pub mod routes;
pub mod trace;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/process", post(routes::process))
        .route("/process/batch", post(routes::process_batch))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job))
        .route("/jobs/:id", delete(routes::cancel_job))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let api = Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
        .layer(middleware::from_fn(trace::trace_context))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Router::new()
        .nest("/api/v1", api)
        .fallback(routes::not_found)
}
