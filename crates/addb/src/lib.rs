//! # ADSM ADDB
//!
//! External component store for reusable security model declarations.
//!
//! ## Components
//!
//! - `Addb` - Scans a directory of `.smspec` files and indexes them by ID
//! - `Component` - Declaration record as it appears in the store

pub mod component;
pub mod store;

pub use component::{Component, ComponentKind};
pub use store::Addb;
