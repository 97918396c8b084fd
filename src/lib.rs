//! CodeArena - online judge backend
//!
//! Problems, contests, test cases, submissions, tutorials and comments are
//! served as REST resources generated from declarative configurations.
//!
//! # Architecture
//!
//! - **Factory**: resource declarations, validated once into serializers,
//!   filters and permission checks
//! - **Resources**: the declarations for each entity
//! - **Handlers**: generic HTTP handlers plus authentication
//! - **Services**: the request flow shared by every resource
//! - **Repositories**: SQL generated from the entity schemas

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod factory;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod resources;
pub mod services;
pub mod state;
pub mod utils;

use axum::{middleware as axum_middleware, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

use constants::API_BASE_PATH;
use factory::Registry;

/// The full HTTP application over `registry`
pub fn app(state: AppState, registry: &Registry) -> Router {
    Router::new()
        .nest(API_BASE_PATH, handlers::routes(registry))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
