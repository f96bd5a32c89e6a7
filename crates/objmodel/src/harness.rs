//! In-memory resolver for object model tests
//!
//! Builds a fresh object on every call and never caches, so it exercises
//! construction only. Memoization belongs to the loaders' builder.

use crate::common::{Node, Resolution, Resolver};
use shared::{Declaration, Entity, Flow, ModelError};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct TestHarness {
    declarations: HashMap<String, Declaration>,
}

impl TestHarness {
    /// Builder: register a declaration under its own ID
    pub(crate) fn with(mut self, declaration: impl Into<Declaration>) -> Self {
        let declaration = declaration.into();
        self.declarations
            .insert(declaration.id().to_string(), declaration);
        self
    }

    /// Copy of a registered entity declaration
    pub(crate) fn entity(&self, id: &str) -> Entity {
        match self.declarations.get(id) {
            Some(Declaration::Entity(e)) => e.clone(),
            other => panic!("no entity '{id}' in harness: {other:?}"),
        }
    }

    /// Copy of a registered flow declaration
    pub(crate) fn flow(&self, id: &str) -> Flow {
        match self.declarations.get(id) {
            Some(Declaration::Flow(f)) => f.clone(),
            other => panic!("no flow '{id}' in harness: {other:?}"),
        }
    }
}

impl Resolver for TestHarness {
    fn resolve(&mut self, id: &str) -> Resolution {
        match self.declarations.get(id).cloned() {
            Some(declaration) => Node::build(&declaration, self),
            None => (
                None,
                vec![ModelError::NoDeclaration { id: id.to_string() }],
            ),
        }
    }
}
