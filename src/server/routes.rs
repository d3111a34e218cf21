use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::activation::verify_handler;
use crate::server::admin::{genkey_handler, list_keys_handler, revoke_handler};
use crate::server::handlers::{root_handler, AppState};
use crate::server::logging::request_logging_middleware;
use crate::server::stats::report_stats_handler;

/// Build the main application router for the StaffHelp server.
///
/// This is a convenience helper so `main.rs` or tests can
/// construct the router in a single call.
///
/// # Routes
///
/// ## Client endpoints
/// - `POST /verify` - Verify a license key / bind on first use
/// - `POST /stats/report` - Ingest a staff statistics report
///
/// ## Admin endpoints
/// - `POST /admin/genkey` - Issue a new license key
/// - `POST /admin/revoke` - Delete a license key
/// - `GET /admin/list` - List all license records
///
/// ## Meta
/// - `GET /` - Liveness probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/verify", post(verify_handler))
        .route("/stats/report", post(report_stats_handler))
        .route("/admin/genkey", post(genkey_handler))
        .route("/admin/revoke", post(revoke_handler))
        .route("/admin/list", get(list_keys_handler))
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
