//! The `/verify` endpoint: trust-on-first-use hardware binding.
//!
//! Each license key moves through a small state machine:
//!
//! - `Unbound` (exists, hwid absent) - the first verify request commits the
//!   caller's hardware ID and nickname, exactly once.
//! - `Bound` (exists, hwid set) - subsequent requests are authorization
//!   checks against the committed hardware ID.
//!
//! Absent and deactivated keys are terminal failures and deliberately
//! indistinguishable to the caller (`invalid_key`, 403 rather than 404), so a
//! probing client cannot tell a wrong key from a disabled one. Re-binding is
//! not possible through this endpoint; the only path is an administrative
//! revoke and reissue.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::handlers::AppState;
use crate::server::logging::{log_license_event, LicenseEvent};
use crate::server::validation::require_non_empty;

/// Error codes for verify responses.
///
/// These codes are stable and part of the wire contract with the addon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyErrorCode {
    /// Request is missing `key` or `hwid`
    InvalidRequest,
    /// Key does not exist or has been deactivated
    InvalidKey,
    /// Key is bound to a different hardware ID
    HwidMismatch,
    /// Internal server error
    InternalError,
}

/// Verify error response.
#[derive(Debug, Serialize)]
pub struct VerifyError {
    pub error: VerifyErrorCode,
    pub message: String,
}

impl VerifyError {
    pub fn new(code: VerifyErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error {
            VerifyErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            // Absent and deactivated keys both answer 403, not 404.
            VerifyErrorCode::InvalidKey => StatusCode::FORBIDDEN,
            VerifyErrorCode::HwidMismatch => StatusCode::FORBIDDEN,
            VerifyErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

/// Request body for `POST /verify`.
///
/// `key` and `hwid` are required but deserialized as optional so that a
/// missing field answers the canonical 400 `invalid_request` instead of a
/// framework rejection.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Outcome of a successful verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    /// First use: the key was just bound to this hardware ID
    Binded,
    /// The key was already bound to this hardware ID
    Ok,
}

/// Response body for a successful verify.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: VerifyStatus,
}

/// Handler for `POST /verify`.
///
/// # Behavior
/// - Missing or empty `key`/`hwid` fail fast, before any store access
/// - Absent or deactivated keys fail with `invalid_key`
/// - An unbound key is bound to the caller's hwid (first committer wins)
/// - A bound key verifies only against its committed hwid
pub async fn verify_handler(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, VerifyError> {
    let key = require_non_empty(req.key.as_deref(), "key")
        .map_err(|e| VerifyError::new(VerifyErrorCode::InvalidRequest, e.to_string()))?;
    let hwid = require_non_empty(req.hwid.as_deref(), "hwid")
        .map_err(|e| VerifyError::new(VerifyErrorCode::InvalidRequest, e.to_string()))?;

    info!("Verify request for key={key}");

    let license = state
        .db
        .get_license(key)
        .await
        .map_err(|e| {
            warn!("Database error: {e}");
            VerifyError::new(VerifyErrorCode::InternalError, "Database error")
        })?
        .filter(|license| license.active)
        .ok_or_else(|| {
            log_license_event(LicenseEvent::Rejected, key, Some("invalid_key"));
            VerifyError::new(VerifyErrorCode::InvalidKey, "Key is invalid or deactivated")
        })?;

    match license.hwid.as_deref() {
        // Bound to this hardware: plain authorization success.
        Some(bound) if bound == hwid => {
            log_license_event(LicenseEvent::Verified, key, None);
            Ok(Json(VerifyResponse {
                status: VerifyStatus::Ok,
            }))
        }
        // Bound elsewhere: reject without mutating anything.
        Some(_) => {
            log_license_event(LicenseEvent::Rejected, key, Some("hwid_mismatch"));
            Err(VerifyError::new(
                VerifyErrorCode::HwidMismatch,
                "Key is bound to a different hardware ID",
            ))
        }
        // Unbound: commit this hwid, first committer wins.
        None => bind_first_use(&state, key, hwid, req.nickname.as_deref()).await,
    }
}

/// Attempt the one-time bind of an unbound key.
///
/// The store-level update is conditional on `hwid IS NULL`. If it reports no
/// row changed, a concurrent verify committed first; re-read the row and
/// resolve against the winning hwid.
async fn bind_first_use(
    state: &AppState,
    key: &str,
    hwid: &str,
    nickname: Option<&str>,
) -> Result<Json<VerifyResponse>, VerifyError> {
    let bound = state
        .db
        .bind_license(key, hwid, nickname)
        .await
        .map_err(|e| {
            warn!("Failed to bind key: {e}");
            VerifyError::new(VerifyErrorCode::InternalError, "Failed to bind key")
        })?;

    if bound {
        log_license_event(LicenseEvent::Bound, key, nickname);
        return Ok(Json(VerifyResponse {
            status: VerifyStatus::Binded,
        }));
    }

    // Lost the first-use race (or the key was revoked in between).
    let winner = state
        .db
        .get_license(key)
        .await
        .map_err(|e| {
            warn!("Database error: {e}");
            VerifyError::new(VerifyErrorCode::InternalError, "Database error")
        })?
        .filter(|license| license.active)
        .ok_or_else(|| {
            log_license_event(LicenseEvent::Rejected, key, Some("invalid_key"));
            VerifyError::new(VerifyErrorCode::InvalidKey, "Key is invalid or deactivated")
        })?;

    if winner.hwid.as_deref() == Some(hwid) {
        log_license_event(LicenseEvent::Verified, key, None);
        Ok(Json(VerifyResponse {
            status: VerifyStatus::Ok,
        }))
    } else {
        log_license_event(LicenseEvent::Rejected, key, Some("hwid_mismatch"));
        Err(VerifyError::new(
            VerifyErrorCode::HwidMismatch,
            "Key is bound to a different hardware ID",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serialization() {
        let err = VerifyError::new(VerifyErrorCode::HwidMismatch, "mismatch");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("hwid_mismatch"));
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            VerifyError::new(VerifyErrorCode::InvalidRequest, "").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VerifyError::new(VerifyErrorCode::InvalidKey, "").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            VerifyError::new(VerifyErrorCode::HwidMismatch, "").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            VerifyError::new(VerifyErrorCode::InternalError, "").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn status_serialization() {
        let binded = serde_json::to_string(&VerifyResponse {
            status: VerifyStatus::Binded,
        })
        .unwrap();
        assert_eq!(binded, r#"{"status":"binded"}"#);

        let ok = serde_json::to_string(&VerifyResponse {
            status: VerifyStatus::Ok,
        })
        .unwrap();
        assert_eq!(ok, r#"{"status":"ok"}"#);
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let req: VerifyRequest = serde_json::from_str("{}").unwrap();
        assert!(req.key.is_none());
        assert!(req.hwid.is_none());
        assert!(req.nickname.is_none());
    }
}
