//! Request logging middleware and license lifecycle events.
//!
//! Structured logging for the API:
//! - Unique request ID tracking with propagation in response headers
//! - Request timing
//! - License lifecycle audit events

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// License lifecycle event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseEvent {
    /// A new key was issued
    Issued,
    /// A key was bound to a hardware ID (first use)
    Bound,
    /// A bound key was verified successfully
    Verified,
    /// A verify request was rejected
    Rejected,
    /// A key was revoked
    Revoked,
}

impl std::fmt::Display for LicenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseEvent::Issued => "issued",
            LicenseEvent::Bound => "bound",
            LicenseEvent::Verified => "verified",
            LicenseEvent::Rejected => "rejected",
            LicenseEvent::Revoked => "revoked",
        };
        write!(f, "{}", s)
    }
}

/// Log a license lifecycle event.
///
/// # Arguments
///
/// * `event` - The type of license event
/// * `key` - The license key involved
/// * `details` - Optional additional details (rejection reason, nickname)
pub fn log_license_event(event: LicenseEvent, key: &str, details: Option<&str>) {
    let span = info_span!(
        "license_event",
        event = %event,
        key = %key,
    );
    let _enter = span.enter();

    match event {
        LicenseEvent::Rejected => {
            if let Some(d) = details {
                warn!(reason = %d, "License event occurred");
            } else {
                warn!("License event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "License event occurred");
            } else {
                info!("License event occurred");
            }
        }
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// This middleware:
/// 1. Generates a unique request ID for each incoming request
/// 2. Creates a tracing span with the request ID
/// 3. Logs the request method and path
/// 4. Measures and logs the response time
/// 5. Adds the request ID to the response headers
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    // Add request ID to response headers
    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}
