//! FaceIt Common Utilities
//!
//! Shared infrastructure for all FaceIt crates:
//! - Error types and result aliases
//! - Recording clock for reconciling capture, analyzer, and event time bases
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
