//! API key middleware for the encryption routes.
//!
//! With no key configured every request passes. Otherwise the key must be
//! presented as `Authorization: Bearer <key>` or `X-API-Key: <key>`.

use crate::domain::{ApiError, AuthConfig};
use axum::{body::Body, http::Request, response::IntoResponse, response::Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    config: Arc<AuthConfig>,
}

impl AuthLayer {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    config: Arc<AuthConfig>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if !check_api_key(&req, &self.config) {
            warn!(path = %req.uri().path(), "Rejected request with missing or invalid API key");
            return Box::pin(async move { Ok(ApiError::unauthorized().into_response()) });
        }

        // the clone may not be ready; swap so the ready one handles this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

/// Check API key from request
fn check_api_key<B>(req: &Request<B>, config: &AuthConfig) -> bool {
    let expected_key = match &config.api_key {
        Some(key) => key,
        None => return true, // No key configured = always valid
    };

    // Check Authorization header (Bearer token)
    if let Some(auth) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return constant_time_compare(token.trim(), expected_key);
            }
        }
    }

    // Check X-API-Key header
    if let Some(api_key) = req.headers().get("x-api-key") {
        if let Ok(key_str) = api_key.to_str() {
            return constant_time_compare(key_str.trim(), expected_key);
        }
    }

    false
}

/// Constant-time string comparison.
///
/// Runs in time independent of how many leading bytes match. Inputs of
/// different lengths are padded to a common length with different fill bytes
/// so the length check does not short-circuit either.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
