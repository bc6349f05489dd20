//! # pawprint-core
//!
//! Core library for pawprint - a best-effort product-analytics session
//! bootstrap for client applications.
//!
//! This library provides:
//! - A tracking-session initializer that creates at most one analytics
//!   client per process
//! - A persisted per-device identifier correlating sessions across runs
//! - The event envelope and HTTP client for the events API
//! - Configuration management and logging infrastructure
//!
//! ## Contract
//!
//! Tracking is strictly best-effort. [`ensure_tracking_session`] never
//! panics and never returns an error: when storage or client setup fails,
//! the failure is logged and the session is simply absent, leaving the host
//! application unaffected.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pawprint_core::{ensure_tracking_session, shutdown_tracking};
//!
//! // Returns the shared session, or None when tracking is unavailable.
//! if let Some(session) = ensure_tracking_session() {
//!     println!("tracking as device {}", session.device_id());
//! }
//!
//! // Before exiting, emit the end-of-session signal.
//! shutdown_tracking();
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use session::{ensure_tracking_session, shutdown_tracking, TrackingRuntime, TrackingSession};
pub use store::{DeviceStore, FileStore, MemoryStore};

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;
pub mod store;
