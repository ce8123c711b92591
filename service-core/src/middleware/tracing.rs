//! Request correlation: one id per request, carried in the `x-request-id`
//! header, the request extensions and the `http_request` span.

use axum::http::{HeaderMap, HeaderValue, Request as HttpRequest};
use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id we are willing to echo back.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id attached to the request extensions by [`request_id_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
            .map(|s| Self(s.to_string()))
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Id of `request`, or `-` when the middleware has not run.
pub fn request_id_of<B>(request: &HttpRequest<B>) -> &str {
    request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::as_str)
        .unwrap_or("-")
}

/// Span for `tower_http::trace::TraceLayer`. The layer must sit inside
/// [`request_id_middleware`] for the id to be present.
pub fn http_request_span<B>(request: &HttpRequest<B>) -> Span {
    tracing::info_span!(
        "http_request",
        request_id = %request_id_of(request),
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
    )
}

/// Adopt the caller's `x-request-id` or mint a UUID, then expose it to inner
/// layers and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(req.headers()).unwrap_or_else(RequestId::generate);
    let header_value = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = &header_value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }
    req.extensions_mut().insert(request_id);

    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
