//! # ADSM Loaders
//!
//! Turns security model documents into resolved object graphs.
//!
//! ## Components
//!
//! - `Builder` - Declaration table and object cache; resolves identifiers
//!   once per build, pulling `addb:` references from the store
//! - `Loader` - Parses documents and drives the builder

pub mod builder;
pub mod loader;

pub use builder::Builder;
pub use loader::{Loaded, Loader};
