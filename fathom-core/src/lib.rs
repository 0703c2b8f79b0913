//! Fathom Core - shared error taxonomy, configuration, and async primitives
//!
//! Everything the research crates have in common lives here: the error type
//! every component folds into, the layered TOML configuration, logging setup,
//! and the process-wide concurrency limiter.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
