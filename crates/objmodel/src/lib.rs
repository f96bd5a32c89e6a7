//! # ADSM Object Model
//!
//! Resolved, typed form of a security model. Objects link to each other
//! through shared handles, so an entity referenced from several places is
//! one instance.
//!
//! ## Components
//!
//! - `Human`, `Program`, `Role`, `Flow` - The four resolved kinds
//! - `SecurityModel` - The resolved top-level document
//! - `Node` - Shared handle over the four kinds
//! - `Resolver` - Link-resolution callback supplied by the builder
//!
//! ## Aggregation
//!
//! Every kind reports its ADM pointers, mitigations and recommendations
//! merged with those of its links. ADM keys are dotted paths
//! (`web.base.server`); mitigation keys are readable labels
//! (`Web -> Base:Server`).

pub mod common;
pub mod flow;
pub mod human;
pub mod program;
pub mod role;
pub mod security_model;

#[cfg(test)]
mod harness;

pub use common::{join_pointer, Aggregate, CoreObject, ModelObject, Node, Resolution, Resolver};
pub use flow::Flow;
pub use human::Human;
pub use program::Program;
pub use role::Role;
pub use security_model::SecurityModel;
