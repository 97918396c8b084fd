//! Request logging middleware

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

/// How a finished request is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ok,
    Rejected,
    Failed,
}

impl Outcome {
    /// Misses (404) are routine for lookups and stay at info
    fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::Failed
        } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
            Self::Rejected
        } else {
            Self::Ok
        }
    }
}

/// Log one line per request with its resource path, caller kind and timing
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();
    let authenticated = request.headers().contains_key(AUTHORIZATION);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match Outcome::of(response.status()) {
        Outcome::Failed => warn!(
            %method, %path, %query, authenticated, status, elapsed_ms,
            "Request failed"
        ),
        Outcome::Rejected => info!(
            %method, %path, %query, authenticated, status, elapsed_ms,
            "Request rejected"
        ),
        Outcome::Ok => info!(
            %method, %path, %query, authenticated, status, elapsed_ms,
            "Request completed"
        ),
    }

    response
}
