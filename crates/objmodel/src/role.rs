//! Role - A role a program plays; terminal in every aggregation

use crate::common::{Aggregate, CoreObject, ModelObject, Resolver};
use shared::{Entity, EntityKind, ModelError};

/// Resolved role entity
#[derive(Debug, Clone, Default)]
pub struct Role {
    core: CoreObject,
}

impl Role {
    /// Initialize from a declaration
    ///
    /// Roles carry no links; the resolver is accepted so every kind shares
    /// one construction signature.
    pub fn init(&mut self, entity: Option<&Entity>, _resolver: &mut dyn Resolver) -> Vec<ModelError> {
        let Some(entity) = entity else {
            return vec![ModelError::NullDeclaration { kind: "role" }];
        };

        if entity.kind != Some(EntityKind::Role) {
            return vec![ModelError::KindMismatch {
                expected: "role",
                found: entity.kind_label(),
            }];
        }

        if let Err(e) = self
            .core
            .init_identity(&entity.id, &entity.name, &entity.description)
        {
            return vec![e];
        }

        self.core.init_leaves(
            &entity.adm,
            entity.adm_dir.as_deref(),
            &entity.mitigations,
            &entity.recommendations,
        );

        Vec::new()
    }
}

impl ModelObject for Role {
    fn core(&self) -> &CoreObject {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CoreObject {
        &mut self.core
    }

    fn decision_model_pointers(&self) -> Aggregate {
        self.core.pointer_seed()
    }

    fn mitigations(&self) -> Aggregate {
        self.core.labelled(self.core.own_mitigations())
    }

    fn recommendations(&self) -> Aggregate {
        self.core.labelled(self.core.own_recommendations())
    }
}
