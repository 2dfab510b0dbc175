//! Origin allow-list enforcement.
//!
//! Requests without an `Origin` header (same-origin, curl, server-to-server)
//! always pass. Requests declaring an origin must match the allow-list
//! exactly or are rejected before reaching any handler. The CORS layer then
//! echoes allowed origins back with credentials enabled.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

use super::state::AppState;
use crate::error::RelayError;

/// Immutable set of permitted origins.
#[derive(Clone, Debug, Default)]
pub struct AllowedOrigins {
    origins: HashSet<String>,
}

impl AllowedOrigins {
    pub fn new(origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            origins: origins.into_iter().collect(),
        }
    }

    /// `true` when `origin` is absent or in the allow-list.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.origins.contains(origin),
        }
    }

    /// Header-level check; a non-UTF-8 origin never matches.
    fn permits_header(&self, origin: Option<&HeaderValue>) -> bool {
        match origin {
            None => true,
            Some(value) => value.to_str().is_ok_and(|o| self.permits(Some(o))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Axum middleware: reject requests whose declared origin is not allowed.
pub async fn origin_guard_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req.headers().get(header::ORIGIN);
    if !state.allowed_origins.permits_header(origin) {
        let origin = origin
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        warn!("Rejected request from origin: {}", origin);
        return RelayError::AccessDenied(origin).into_response();
    }

    next.run(req).await
}

/// CORS layer mirroring allowed origins, with credentials allowed.
pub fn cors_layer(allowed: Arc<AllowedOrigins>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| allowed.permits_header(Some(origin)),
        ))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
