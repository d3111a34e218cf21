//! StaffHelp - license activation server for the StaffHelp moderation addon
//!
//! The crate ships a single HTTP service that owns the license key-space:
//! key issuance, revocation, listing, and the `/verify` trust-on-first-use
//! hardware-binding flow. An ancillary `/stats/report` endpoint ingests staff
//! moderation statistics (ban/mute counts) into the same store.
//!
//! # Features
//!
//! Database backends are selected via feature flags:
//!
//! - `sqlite` - SQLite backend. Enabled by default.
//! - `postgres` - PostgreSQL backend.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (sqlite)
//! staffhelp = { git = "https://github.com/staffhelp/staffhelp" }
//!
//! # PostgreSQL backend
//! staffhelp = { git = "https://github.com/staffhelp/staffhelp", default-features = false, features = ["postgres"] }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod license_key;

// Server components
pub mod server;
