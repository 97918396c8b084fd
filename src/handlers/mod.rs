//! HTTP Request Handlers
//!
//! Authentication and health endpoints are written by hand; everything else
//! is generated from the resource registry.

pub mod auth;
pub mod health;
pub mod resources;

use axum::Router;

use crate::{factory::Registry, state::AppState};

/// Create all API routes
pub fn routes(registry: &Registry) -> Router<AppState> {
    registry.iter().fold(
        Router::new()
            .merge(health::routes())
            .nest("/auth", auth::routes()),
        |router, resource| router.merge(resources::routes(resource.clone())),
    )
}
