//! Request id propagation.
//!
//! Every request runs inside an `http_request` span carrying its id, so log
//! lines from handlers and the moderation hook can be correlated.

use axum::{
    body::Body,
    http::{header::HeaderName, Extensions, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied id we keep. Longer ones are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Accepts a client id only if it is short and made of visible ASCII.
fn sanitize_request_id(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty()
        || raw.len() > MAX_REQUEST_ID_LEN
        || !raw.chars().all(|c| c.is_ascii_graphic())
    {
        return None;
    }
    Some(raw.to_string())
}

/// Reuses the caller's `X-Request-ID` or mints a v4 UUID, records it in the
/// extensions and echoes it on the response.
pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = sanitize_request_id(
        req.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )
    .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let start = std::time::Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

/// The current request's id, or `"unknown"` outside the middleware.
pub fn get_request_id(extensions: &Extensions) -> String {
    extensions
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_id_missing() {
        assert_eq!(get_request_id(&Extensions::new()), "unknown");
    }

    #[test]
    fn test_get_request_id_present() {
        let mut extensions = Extensions::new();
        extensions.insert(RequestId("req-42".to_string()));
        assert_eq!(get_request_id(&extensions), "req-42");
    }

    #[test]
    fn test_sanitize_keeps_reasonable_ids() {
        assert_eq!(
            sanitize_request_id(Some("550e8400-e29b-41d4-a716-446655440000")).as_deref(),
            Some("550e8400-e29b-41d4-a716-446655440000")
        );
        assert_eq!(
            sanitize_request_id(Some("  abc.123_x  ")).as_deref(),
            Some("abc.123_x")
        );
    }

    #[test]
    fn test_sanitize_rejects_bad_ids() {
        assert_eq!(sanitize_request_id(None), None);
        assert_eq!(sanitize_request_id(Some("")), None);
        assert_eq!(sanitize_request_id(Some("has space")), None);
        assert_eq!(sanitize_request_id(Some("ünïcode")), None);
        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        assert_eq!(sanitize_request_id(Some(&long)), None);
    }
}
