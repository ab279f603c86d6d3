//! API Middleware
//!
//! Bearer-token authentication and request logging.

use std::fmt;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::bearer_token;
use crate::domain::OperationContext;
use crate::error::AppError;

use super::AppState;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id sent by the client, if it is a valid UUID
fn correlation_id_from(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

// =========================================================================
// Bearer Token Authentication Middleware
// =========================================================================

/// Resolve the caller from `Authorization: Bearer <token>` and attach an
/// `OperationContext` to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let caller = bearer_token(header)
        .and_then(|token| state.auth.authenticate(token))
        .map_err(|e| {
            tracing::warn!(reason = %e, uri = %request.uri(), "Authentication failed");
            AppError::Unauthorized(e.to_string())
        })?;

    // Normally already set by the logging middleware
    let correlation_id = correlation_id_from(&headers).unwrap_or_else(Uuid::new_v4);

    let context = OperationContext::new()
        .with_caller(caller)
        .with_correlation_id(correlation_id);

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Headers whose values never reach the logs
static REDACTED_HEADERS: [HeaderName; 4] = [
    axum::http::header::AUTHORIZATION,
    axum::http::header::COOKIE,
    axum::http::header::SET_COOKIE,
    HeaderName::from_static("idempotency-key"),
];

/// Debug view of a header map with credentials and idempotency keys hidden
pub struct RedactedHeaders<'a>(pub &'a HeaderMap);

impl fmt::Debug for RedactedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(name, value)| {
                let shown = if REDACTED_HEADERS.contains(name) {
                    "[REDACTED]"
                } else {
                    value.to_str().unwrap_or("[non-ascii]")
                };
                (name.as_str(), shown)
            }))
            .finish()
    }
}

/// Outermost middleware of the protected routes.
///
/// Settles the request's correlation id (client-supplied or fresh) and
/// forwards it to the inner layers and the response, so every log line of
/// the request carries the same id.
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = correlation_id_from(request.headers()).unwrap_or_else(Uuid::new_v4);
    let header_value = HeaderValue::from_str(&correlation_id.to_string()).ok();
    if let Some(value) = &header_value {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value.clone());
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
        headers = ?RedactedHeaders(request.headers()),
        "Incoming request"
    );

    let mut response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
        status = %response.status(),
        duration_ms = %started.elapsed().as_millis(),
        "Request completed"
    );

    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    #[test]
    fn test_redacted_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("idempotency-key", "key-1".parse().unwrap());
        headers.insert("x-correlation-id", "corr-1".parse().unwrap());

        let rendered = format!("{:?}", RedactedHeaders(&headers));

        assert!(rendered.contains(r#""authorization": "[REDACTED]""#));
        assert!(rendered.contains(r#""idempotency-key": "[REDACTED]""#));
        assert!(rendered.contains(r#""content-type": "application/json""#));
        assert!(rendered.contains(r#""x-correlation-id": "corr-1""#));
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("key-1"));
    }

    /// Router whose handler echoes the correlation id it was given
    fn echo_app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|headers: HeaderMap| async move {
                    headers
                        .get(CORRELATION_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(axum::middleware::from_fn(logging_middleware))
    }

    async fn echo(request: Request<Body>) -> (Option<String>, String) {
        let response = echo_app().oneshot(request).await.unwrap();
        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_client_correlation_id_reaches_handler_and_response() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .uri("/echo")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();

        let (header, seen) = echo(request).await;

        assert_eq!(seen, id.to_string());
        assert_eq!(header, Some(id.to_string()));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_correlation_id_is_generated() {
        for supplied in [None, Some("not-a-uuid")] {
            let mut builder = Request::builder().uri("/echo");
            if let Some(value) = supplied {
                builder = builder.header(CORRELATION_ID_HEADER, value);
            }

            let (header, seen) = echo(builder.body(Body::empty()).unwrap()).await;

            assert!(Uuid::parse_str(&seen).is_ok(), "{supplied:?}");
            assert_eq!(header, Some(seen));
        }
    }
}
