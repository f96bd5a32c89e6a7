//! # ADSM Shared
//!
//! Declaration types, error types and configuration used across all ADSM
//! packages.

pub mod config;
pub mod declaration;
pub mod error;

// Re-exports
pub use config::*;
pub use declaration::*;
pub use error::*;
