//! Routes generated for every registered resource

mod handler;

use std::sync::Arc;

use axum::{
    routing::{get, MethodRouter},
    Extension, Router,
};

use crate::{factory::Resource, state::AppState};

/// `/{name}` and `/{name}/{id}`, each with and without a trailing slash
pub fn routes(resource: Arc<Resource>) -> Router<AppState> {
    let name = resource.name();

    Router::new()
        .route(&format!("/{name}"), collection())
        .route(&format!("/{name}/"), collection())
        .route(&format!("/{name}/{{id}}"), detail())
        .route(&format!("/{name}/{{id}}/"), detail())
        .layer(Extension(resource))
}

fn collection() -> MethodRouter<AppState> {
    get(handler::list)
        .post(handler::create)
        .fallback(handler::method_not_allowed)
}

fn detail() -> MethodRouter<AppState> {
    get(handler::retrieve)
        .put(handler::update)
        .patch(handler::partial_update)
        .delete(handler::destroy)
        .fallback(handler::method_not_allowed)
}
