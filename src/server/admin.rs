//! Admin API handlers for key-space management.
//!
//! These endpoints are for operator use: issuing fresh keys, revoking leaked
//! or retired ones, and listing the key-space.
//!
//! # Endpoints
//!
//! - `POST /admin/genkey` - Issue a new license key
//! - `POST /admin/revoke` - Delete a license key
//! - `GET /admin/list` - List all license records

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ServiceError;
use crate::license_key::generate_license_key_from_config;
use crate::server::database::License;
use crate::server::handlers::AppState;
use crate::server::logging::{log_license_event, LicenseEvent};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a freshly issued key.
#[derive(Debug, Serialize)]
pub struct GenkeyResponse {
    pub key: String,
}

/// Request body for revoking a key.
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub key: String,
}

/// Response for a successful revocation.
#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub status: &'static str,
}

/// One license record as exposed by `GET /admin/list`.
#[derive(Debug, Serialize)]
pub struct LicenseEntry {
    pub key: String,
    pub hwid: Option<String>,
    pub nickname: Option<String>,
    pub active: bool,
}

impl From<License> for LicenseEntry {
    fn from(license: License) -> Self {
        Self {
            key: license.key,
            hwid: license.hwid,
            nickname: license.nickname,
            active: license.active,
        }
    }
}

/// Admin API error type.
#[derive(Debug)]
pub enum AdminError {
    /// License key not found
    NotFound(String),
    /// Database error
    DatabaseError(String),
    /// Configuration error
    ConfigError(String),
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminError::NotFound(msg) => write!(f, "not found: {msg}"),
            AdminError::DatabaseError(msg) => write!(f, "database error: {msg}"),
            AdminError::ConfigError(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for AdminError {}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AdminError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AdminError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AdminError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ConfigError(msg) => AdminError::ConfigError(msg),
            ServiceError::DatabaseError(msg) => AdminError::DatabaseError(msg),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /admin/genkey`.
///
/// Generates a fresh key and persists it unbound and active. The generator
/// does not consult the store for uniqueness; the keyspace makes collisions
/// a non-concern.
pub async fn genkey_handler(
    State(state): State<AppState>,
) -> Result<Json<GenkeyResponse>, AdminError> {
    let key = generate_license_key_from_config()?;

    state.db.insert_license(&key).await?;

    log_license_event(LicenseEvent::Issued, &key, None);

    Ok(Json(GenkeyResponse { key }))
}

/// Handler for `POST /admin/revoke`.
///
/// Deletes the record unconditionally. Not idempotent: revoking a key that
/// does not exist (including one already revoked) answers 404, so callers
/// must track what they have already revoked.
pub async fn revoke_handler(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>, AdminError> {
    info!("Revoke request for key={}", req.key);

    let deleted = state.db.delete_license(&req.key).await?;

    if !deleted {
        return Err(AdminError::NotFound(req.key));
    }

    log_license_event(LicenseEvent::Revoked, &req.key, None);

    Ok(Json(RevokeResponse { status: "deleted" }))
}

/// Handler for `GET /admin/list`.
///
/// Returns every license record. No ordering guarantee.
pub async fn list_keys_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseEntry>>, AdminError> {
    let licenses = state.db.list_licenses().await?;

    Ok(Json(licenses.into_iter().map(LicenseEntry::from).collect()))
}
