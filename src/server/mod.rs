// src/server/mod.rs

//! Server-side components for StaffHelp.
//!
//! This module contains:
//! - `database`    → DB abstraction over SQLite/Postgres
//! - `handlers`    → Shared state and liveness endpoint
//! - `activation`  → The `/verify` hardware-binding endpoint
//! - `admin`       → Admin API for key issuance/revocation/listing
//! - `stats`       → Tolerant staff statistics ingestion
//! - `routes`      → Router builder
//! - `logging`     → Request logging middleware and lifecycle events
//! - `validation`  → Request validation utilities

pub mod activation;
pub mod admin;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod stats;
pub mod validation;

// Convenient re-exports so callers can do `staffhelp::server::X`
// instead of digging into submodules.

pub use activation::{
    verify_handler, VerifyError, VerifyErrorCode, VerifyRequest, VerifyResponse, VerifyStatus,
};
pub use admin::{
    genkey_handler, list_keys_handler, revoke_handler, AdminError, GenkeyResponse, LicenseEntry,
    RevokeRequest, RevokeResponse,
};
pub use database::{Database, License, StaffStats};
pub use handlers::{root_handler, AppState, StatusResponse};
pub use logging::{log_license_event, request_logging_middleware, LicenseEvent};
pub use routes::build_router;
pub use stats::{parse_stats_report, report_stats_handler, StatsReport, StatsResponse};
pub use validation::{require_non_empty, validate_license_key, ValidationError, ValidationResult};
