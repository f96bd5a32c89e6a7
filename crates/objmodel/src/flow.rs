//! Flow - Data exchanged between two entities over a protocol stack

use crate::common::{
    fold_labelled, insert_link, link, merge, Aggregate, CoreObject, ModelObject, Node, Resolver,
};
use indexmap::IndexMap;
use shared::ModelError;
use std::rc::Rc;

/// Resolved data flow
#[derive(Debug, Clone, Default)]
pub struct Flow {
    core: CoreObject,
    /// Protocol layers, keyed by the reference as written
    protocol: IndexMap<String, Rc<Flow>>,
    /// Any identity-bearing object
    sender: Option<Node>,
    receiver: Option<Node>,
}

impl Flow {
    /// Initialize from a declaration, resolving links through `resolver`
    pub fn init(
        &mut self,
        flow: Option<&shared::Flow>,
        resolver: &mut dyn Resolver,
    ) -> Vec<ModelError> {
        let Some(flow) = flow else {
            return vec![ModelError::NullDeclaration { kind: "flow" }];
        };

        if let Err(e) = self.core.init_identity(&flow.id, &flow.name, &flow.description) {
            return vec![e];
        }

        self.core.init_leaves(
            &flow.adm,
            flow.adm_dir.as_deref(),
            &flow.mitigations,
            &flow.recommendations,
        );

        let mut errors = Vec::new();
        let owner = flow.id.as_str();

        for id in &flow.protocol {
            if let Some(layer) = link(resolver, "protocol", id, owner, &mut errors, |node| {
                node.as_flow().cloned()
            }) {
                insert_link(&mut self.protocol, "protocol", id, owner, layer, &mut errors);
            }
        }

        if !flow.sender.is_empty() {
            self.sender = link(resolver, "sender", &flow.sender, owner, &mut errors, Some);
        }

        if !flow.receiver.is_empty() {
            self.receiver = link(resolver, "receiver", &flow.receiver, owner, &mut errors, Some);
        }

        errors
    }

    pub fn protocol(&self) -> &IndexMap<String, Rc<Flow>> {
        &self.protocol
    }

    pub fn sender(&self) -> Option<&Node> {
        self.sender.as_ref()
    }

    pub fn receiver(&self) -> Option<&Node> {
        self.receiver.as_ref()
    }

    fn fold(&self, own: &[String], pick: fn(&Flow) -> Aggregate) -> Aggregate {
        let mut all = self.core.labelled(own);
        for layer in self.protocol.values() {
            fold_labelled(&mut all, self.name(), "Protocol", pick(layer));
        }
        all
    }
}

impl ModelObject for Flow {
    fn core(&self) -> &CoreObject {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CoreObject {
        &mut self.core
    }

    fn decision_model_pointers(&self) -> Aggregate {
        let mut all = self.core.pointer_seed();
        for layer in self.protocol.values() {
            merge(
                &mut all,
                &format!("{}.protocol", self.id()),
                layer.decision_model_pointers(),
            );
        }
        all
    }

    fn mitigations(&self) -> Aggregate {
        self.fold(self.core.own_mitigations(), |f| f.mitigations())
    }

    fn recommendations(&self) -> Aggregate {
        self.fold(self.core.own_recommendations(), |f| f.recommendations())
    }
}
