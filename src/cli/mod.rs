// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! `serve` runs the HTTP annotation server; `predict` runs the same pipeline once
//! on a local file.

/// CLI arguments.
pub mod args;

/// Console output macros and `tracing` setup.
pub mod logging;

/// One-shot annotation.
pub mod predict;

/// HTTP server startup.
#[cfg(feature = "server")]
pub mod serve;
