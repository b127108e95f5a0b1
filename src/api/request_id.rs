//! Transaction id propagation.
//!
//! Each request carries a transaction id taken from `X-Request-Id` or
//! generated as `tid_<ulid>`. It is attached to the request span and echoed
//! back in the response header.

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Span;
use ulid::Ulid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transaction id of the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn generate() -> Self {
        Self(format!("tid_{}", Ulid::new().to_string().to_lowercase()))
    }
}

pub async fn propagate(mut req: Request, next: Next) -> Response {
    let tid = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestId(v.to_string()))
        .unwrap_or_else(RequestId::generate);

    req.extensions_mut().insert(tid.clone());
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&tid.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub fn make_span(req: &Request<Body>) -> Span {
    let tid = req
        .extensions()
        .get::<RequestId>()
        .map(|tid| tid.0.as_str())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        transaction_id = %tid,
    )
}
