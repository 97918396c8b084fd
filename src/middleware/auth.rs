//! Authentication middleware

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::AppError, services::AuthService, state::AppState};

/// Authenticated user extracted from JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::NotAuthenticated)
    }
}

/// Optional authenticated user wrapper (never fails)
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Resolve the caller from a bearer token
///
/// Requests without a bearer token pass through anonymously. A bearer token
/// that does not verify ends the request with 401.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .map(str::to_owned);

    if let Some(token) = token {
        let path = request.uri().path().to_owned();
        let user = authenticate(&token, &state.config().jwt.secret).inspect_err(|e| {
            debug!(path = %path, error = ?e, "Auth failed: Token verification failed");
        })?;

        debug!(path = %path, user_id = user.id, username = %user.username, "User authenticated successfully");
        request.extensions_mut().insert(user);
    }

    Ok(next.run(request).await)
}

fn authenticate(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let claims = AuthService::verify_token(token, secret)?;
    let id = claims.sub.parse::<i64>().map_err(|_| AppError::InvalidToken)?;

    Ok(AuthenticatedUser {
        id,
        username: claims.username,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{config::JwtConfig, models::User};

    #[test]
    fn test_authenticate_token() {
        let jwt = JwtConfig {
            secret: "secret".to_string(),
            expiry_hours: 1,
        };
        let user = User {
            id: 9,
            username: "bob".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        let (token, _) = AuthService::generate_access_token(&user, &jwt).unwrap();

        assert_eq!(
            authenticate(&token, "secret").unwrap(),
            AuthenticatedUser {
                id: 9,
                username: "bob".to_string()
            }
        );
        assert!(matches!(authenticate("garbage", "secret"), Err(AppError::InvalidToken)));
    }
}
