//! SecurityModel - The resolved top-level model
//!
//! Holds the externals, entities and flows of one document. Every member is
//! obtained through the resolver, so objects shared with other documents
//! (or with each other) are the same instances.

use crate::common::{join_pointer, merge, Aggregate, ModelObject, Node, Resolver};
use crate::Flow;
use indexmap::IndexMap;
use shared::{Entity, EntityKind, ModelError};
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Resolved security model
#[derive(Debug, Clone, Default)]
pub struct SecurityModel {
    title: String,
    design_document: String,
    addb_location: String,
    /// Model-level ADM pointers
    adm: Vec<String>,
    externals: IndexMap<String, Node>,
    entities: IndexMap<String, Node>,
    flows: IndexMap<String, Rc<Flow>>,
}

impl SecurityModel {
    /// Initialize from a declaration, resolving every member through `resolver`
    pub fn init(
        &mut self,
        model: Option<&shared::SecurityModel>,
        resolver: &mut dyn Resolver,
    ) -> Vec<ModelError> {
        let Some(model) = model else {
            return vec![ModelError::NullDeclaration { kind: "security model" }];
        };

        self.title = model.title.clone();
        self.design_document = model.design_document.clone();
        self.addb_location = model.addb_location.clone();
        self.adm = model
            .adm
            .iter()
            .map(|name| join_pointer(model.adm_dir.as_deref(), name))
            .collect();

        let mut errors = Vec::new();

        for entity in &model.externals {
            if let Some(node) = resolve_member(resolver, entity, &mut errors) {
                self.externals.insert(entity.id.clone(), node);
            }
        }

        for entity in &model.entities {
            if let Some(node) = resolve_member(resolver, entity, &mut errors) {
                self.entities.insert(entity.id.clone(), node);
            }
        }

        for flow in &model.flows {
            if flow.id.is_empty() {
                warn!(name = %flow.name, "Flow without an ID");
                errors.push(ModelError::EmptyId);
                continue;
            }
            let (node, resolve_errors) = resolver.resolve(&flow.id);
            errors.extend(resolve_errors);
            match node {
                Some(Node::Flow(f)) => {
                    self.flows.insert(flow.id.clone(), f);
                }
                Some(other) => errors.push(mismatch("flow", &flow.id, &other)),
                None => debug!(id = %flow.id, "Flow could not be built"),
            }
        }

        debug!(
            title = %self.title,
            externals = self.externals.len(),
            entities = self.entities.len(),
            flows = self.flows.len(),
            errors = errors.len(),
            "Security model initialized"
        );
        errors
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn design_document(&self) -> &str {
        &self.design_document
    }

    /// ADDB location named by the document
    pub fn addb_location(&self) -> &str {
        &self.addb_location
    }

    /// Model-level ADM pointers
    pub fn adm(&self) -> &[String] {
        &self.adm
    }

    pub fn externals(&self) -> &IndexMap<String, Node> {
        &self.externals
    }

    pub fn entities(&self) -> &IndexMap<String, Node> {
        &self.entities
    }

    pub fn flows(&self) -> &IndexMap<String, Rc<Flow>> {
        &self.flows
    }

    /// Entities that are roles
    pub fn roles(&self) -> impl Iterator<Item = &Node> {
        self.entities.values().filter(|e| e.is_role())
    }

    /// Append model-level ADM pointers
    pub fn add_decision_model_pointers(&mut self, adm: &[String]) {
        self.adm.extend_from_slice(adm);
    }

    /// `sm` -> model pointers, plus every non-role entity under
    /// `sm.entities` and every flow under `sm.flows`
    pub fn decision_model_pointers(&self) -> Aggregate {
        let mut all = Aggregate::new();
        all.insert("sm".to_string(), self.adm.clone());
        for entity in self.entities.values().filter(|e| !e.is_role()) {
            merge(&mut all, "sm.entities", entity.decision_model_pointers());
        }
        for flow in self.flows.values() {
            merge(&mut all, "sm.flows", flow.decision_model_pointers());
        }
        all
    }

    /// Union of the labelled mitigations of non-role entities and flows
    pub fn mitigations(&self) -> Aggregate {
        self.union(Node::mitigations)
    }

    /// Union of the labelled recommendations of non-role entities and flows
    pub fn recommendations(&self) -> Aggregate {
        self.union(Node::recommendations)
    }

    fn union(&self, pick: fn(&Node) -> Aggregate) -> Aggregate {
        let mut all = Aggregate::new();
        let flows = self.flows.values().map(|f| Node::Flow(Rc::clone(f)));
        let members = self
            .entities
            .values()
            .filter(|e| !e.is_role())
            .cloned()
            .chain(flows);

        for member in members {
            for (key, values) in pick(&member) {
                all.entry(key).or_default().extend(values);
            }
        }
        all
    }
}

/// Resolve one external or entity and check it has the declared kind
///
/// Members without an ID were never indexed; they are reported here.
fn resolve_member(
    resolver: &mut dyn Resolver,
    entity: &Entity,
    errors: &mut Vec<ModelError>,
) -> Option<Node> {
    if entity.id.is_empty() {
        warn!(name = %entity.name, "Entity without an ID");
        errors.push(ModelError::EmptyId);
        return None;
    }

    let (node, resolve_errors) = resolver.resolve(&entity.id);
    errors.extend(resolve_errors);

    let node = match node {
        Some(node) => node,
        None => {
            debug!(id = %entity.id, "Entity could not be built");
            return None;
        }
    };

    let matches = match &entity.kind {
        Some(EntityKind::Human) => node.as_human().is_some(),
        Some(EntityKind::Program) | Some(EntityKind::System) => node.as_program().is_some(),
        Some(EntityKind::Role) => node.as_role().is_some(),
        Some(EntityKind::Unknown(_)) => false,
        None => !matches!(node, Node::Flow(_)),
    };

    if matches {
        Some(node)
    } else {
        errors.push(mismatch(
            entity.kind.as_ref().map(|k| k.as_str()).unwrap_or("entity"),
            &entity.id,
            &node,
        ));
        None
    }
}

/// The resolver handed back an object of another kind than was declared
fn mismatch(expected: &str, id: &str, found: &Node) -> ModelError {
    error!(id, expected, found = found.kind_label(), "Resolved object has the wrong kind");
    ModelError::Internal(format!(
        "error in creating {expected} '{id}': resolved to a {}",
        found.kind_label()
    ))
}
