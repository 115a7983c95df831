//! # Authentication
//!
//! Two separate concerns:
//!
//! - **Service token.** A static bearer token guards the API. Upstream
//!   gateways present it on every call. Compared in constant time.
//! - **Caller identity.** End-user authentication is delegated upstream;
//!   the gateway forwards the authenticated user as the `x-user-id`
//!   header. [`CallerIdentity`] extracts it for handlers that act on
//!   behalf of a user.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use subtle::ConstantTimeEq;

use caboard_core::UserId;

use crate::error::AppError;

/// Header carrying the upstream-authenticated user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so the early return
/// does not reveal the expected length.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Reject requests without the configured bearer token.
///
/// With no token configured, every request passes (development mode).
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) if constant_time_token_eq(bearer.token(), &expected) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("authentication failed: invalid bearer token");
            AppError::Unauthorized("invalid bearer token".into()).into_response()
        }
        None => {
            tracing::warn!("authentication failed: missing bearer token");
            AppError::Unauthorized("missing bearer token".into()).into_response()
        }
    }
}

/// The end user a request acts for, taken from the `x-user-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{USER_ID_HEADER} is not valid text")))?;
        let user_id = raw
            .trim()
            .parse::<UserId>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(token: Option<&str>) -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move { caller.user_id.to_string() }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig {
                token: token.map(str::to_string),
            }))
    }

    async fn status_of(app: Router, request: Request<Body>) -> StatusCode {
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(test_app(Some("s3cret")), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_or_missing_token_rejected() {
        let wrong = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(test_app(Some("s3cret")), wrong).await, StatusCode::UNAUTHORIZED);

        let basic = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Basic czNjcmV0")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(test_app(Some("s3cret")), basic).await, StatusCode::UNAUTHORIZED);

        let missing = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(status_of(test_app(Some("s3cret")), missing).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_configured_token_disables_auth() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(status_of(test_app(None), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn caller_identity_from_header() {
        let user = UserId::new();
        let request = Request::builder()
            .uri("/whoami")
            .header(USER_ID_HEADER, user.0.to_string())
            .body(Body::empty())
            .unwrap();
        let response = test_app(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), user.to_string());
    }

    #[tokio::test]
    async fn caller_identity_rejects_missing_or_malformed_header() {
        let missing = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        assert_eq!(status_of(test_app(None), missing).await, StatusCode::UNAUTHORIZED);

        let malformed = Request::builder()
            .uri("/whoami")
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(test_app(None), malformed).await, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn token_comparison() {
        assert!(constant_time_token_eq("abc", "abc"));
        assert!(!constant_time_token_eq("abc", "abd"));
        assert!(!constant_time_token_eq("abc", "abcd"));
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            token: Some("super-secret".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
