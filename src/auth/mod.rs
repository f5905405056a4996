use crate::state::AppState;
use axum::{middleware, Router};

pub mod claims;
pub mod cookie;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new().merge(handlers::auth_routes()).merge(
        handlers::session_routes()
            .route_layer(middleware::from_fn_with_state(state, extractors::require_auth)),
    )
}
