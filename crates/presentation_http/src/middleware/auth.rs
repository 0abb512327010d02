//! Operator API key authentication middleware
//!
//! Guards the operator endpoints (sandbox connect, send-text, conversation
//! lookups) with a single shared Bearer token, compared in constant time.
//! The inbound provider webhook is never wrapped in this layer: a provider
//! cannot supply a Bearer token, and the webhook contract requires a 200
//! regardless of credentials.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};

use crate::error::ApiError;

/// Layer that requires a matching Bearer token on every non-excluded path.
/// A `None` key disables authentication entirely.
#[derive(Clone, Debug)]
pub struct ApiKeyAuthLayer {
    api_key: Option<Arc<str>>,
    excluded_paths: Vec<String>,
}

impl ApiKeyAuthLayer {
    /// No key configured: every request passes through unauthenticated.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            excluded_paths: Vec::new(),
        }
    }

    /// Require `key` as a Bearer token on every non-excluded path.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(Arc::from(key.into())),
            excluded_paths: Vec::new(),
        }
    }

    /// Add paths that should be excluded from authentication
    #[must_use]
    pub fn exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.excluded_paths.extend(paths);
        self
    }
}

impl<S> Layer<S> for ApiKeyAuthLayer {
    type Service = ApiKeyAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuth {
            inner,
            api_key: self.api_key.clone(),
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Middleware service for operator API key authentication
#[derive(Clone, Debug)]
pub struct ApiKeyAuth<S> {
    inner: S,
    api_key: Option<Arc<str>>,
    excluded_paths: Vec<String>,
}

fn keys_match(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

impl<S> Service<Request> for ApiKeyAuth<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let api_key = self.api_key.clone();
        let excluded_paths = self.excluded_paths.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if excluded_paths.iter().any(|p| path.starts_with(p.as_str())) {
                return inner.call(req).await;
            }

            let Some(expected) = api_key else {
                return inner.call(req).await;
            };

            let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            match header {
                Some(h) if h.starts_with("Bearer ") && keys_match(&expected, &h[7..]) => inner.call(req).await,
                _ => Ok(ApiError::unauthorized("missing or invalid API key").into_response()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn test_handler() -> &'static str {
        "ok"
    }

    fn router_with(layer: ApiKeyAuthLayer) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .route("/webhooks/whatsapp/provider", get(test_handler))
            .layer(layer)
    }

    #[tokio::test]
    async fn disabled_auth_passes_every_request() {
        let app = router_with(ApiKeyAuthLayer::disabled());
        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_bearer_token_passes() {
        let app = router_with(ApiKeyAuthLayer::new("secret-key"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, "Bearer secret-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_bearer_token_rejected() {
        let app = router_with(ApiKeyAuthLayer::new("secret-key"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let app = router_with(ApiKeyAuthLayer::new("secret-key"));
        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = router_with(ApiKeyAuthLayer::new("secret-key"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn excluded_path_bypasses_auth() {
        let app = router_with(
            ApiKeyAuthLayer::new("secret-key").exclude_paths(vec!["/webhooks".to_string()]),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/webhooks/whatsapp/provider")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
