//! Resource handler implementations

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    Extension, Json,
};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    factory::{Action, RequestContext, Resource},
    middleware::auth::OptionalAuth,
    services::ResourceService,
    state::AppState,
};

/// List objects
pub async fn list(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Value>>> {
    let ctx = RequestContext::new(Action::List, auth_user).with_params(params);
    let rows = ResourceService::list(state.db(), &resource, &ctx).await?;

    Ok(Json(rows))
}

/// Create an object
pub async fn create(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ctx = RequestContext::new(Action::Create, auth_user).with_params(params);
    let payload = parse_body(&body)?;
    let created = ResourceService::create(state.db(), &resource, &ctx, &payload).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get one object
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let ctx = RequestContext::new(Action::Retrieve, auth_user).with_params(params);
    let object = ResourceService::retrieve(state.db(), &resource, &ctx, &id).await?;

    Ok(Json(object))
}

/// Replace an object
pub async fn update(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let ctx = RequestContext::new(Action::Update, auth_user).with_params(params);
    let payload = parse_body(&body)?;
    let object = ResourceService::update(state.db(), &resource, &ctx, &id, &payload).await?;

    Ok(Json(object))
}

/// Change some fields of an object
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let ctx = RequestContext::new(Action::PartialUpdate, auth_user).with_params(params);
    let payload = parse_body(&body)?;
    let object = ResourceService::update(state.db(), &resource, &ctx, &id, &payload).await?;

    Ok(Json(object))
}

/// Delete an object
pub async fn destroy(
    State(state): State<AppState>,
    Extension(resource): Extension<Arc<Resource>>,
    OptionalAuth(auth_user): OptionalAuth,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<StatusCode> {
    let ctx = RequestContext::new(Action::Destroy, auth_user).with_params(params);
    ResourceService::destroy(state.db(), &resource, &ctx, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Any method a route does not serve
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

/// An empty body reads as an empty object
fn parse_body(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("JSON parse error - {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), serde_json::json!({}));
        assert_eq!(parse_body(b" \n").unwrap(), serde_json::json!({}));
        assert_eq!(parse_body(br#"{"a": 1}"#).unwrap(), serde_json::json!({"a": 1}));
        assert!(matches!(parse_body(b"{nope"), Err(AppError::Validation(_))));
    }
}
