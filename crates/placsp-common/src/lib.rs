//! PLACSP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the PLACSP sync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the workspace-wide [`PlacspError`] and [`Result`] alias
//! - **Logging**: `tracing` subscriber setup and rolled log file retention
//!
//! # Example
//!
//! ```no_run
//! use placsp_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{PlacspError, Result};
