pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::{auth::extractors, state::AppState};
use axum::{middleware, Router};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new().merge(handlers::read_routes()).merge(
        handlers::write_routes()
            .route_layer(middleware::from_fn_with_state(state, extractors::require_auth)),
    )
}
