//! Program - Software entity (program or system) in the modeled system

use crate::common::{
    fold_labelled, insert_link, link, merge, Aggregate, CoreObject, ModelObject, Resolver,
};
use crate::Role;
use indexmap::IndexMap;
use shared::{Entity, ModelError};
use std::rc::Rc;
use url::Url;

/// Resolved program or system entity
#[derive(Debug, Clone, Default)]
pub struct Program {
    core: CoreObject,
    /// Code repository locator, validated at init
    repository: String,
    base: Vec<Rc<Program>>,
    /// Keyed by the reference as written
    roles: IndexMap<String, Rc<Role>>,
    languages: IndexMap<String, Rc<Program>>,
    dependencies: IndexMap<String, Rc<Program>>,
}

impl Program {
    /// Initialize from a declaration, resolving links through `resolver`
    pub fn init(&mut self, entity: Option<&Entity>, resolver: &mut dyn Resolver) -> Vec<ModelError> {
        let Some(entity) = entity else {
            return vec![ModelError::NullDeclaration { kind: "program" }];
        };

        if !entity.kind.as_ref().map(|k| k.is_program_like()).unwrap_or(false) {
            return vec![ModelError::KindMismatch {
                expected: "program",
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

        let mut errors = Vec::new();
        let owner = entity.id.as_str();

        if !entity.repository.is_empty() {
            match validate_repository(&entity.repository) {
                Ok(()) => self.repository = entity.repository.clone(),
                Err(source) => errors.push(ModelError::InvalidRepository {
                    url: entity.repository.clone(),
                    owner: owner.to_string(),
                    source,
                }),
            }
        }

        for base in &entity.base {
            if let Some(program) = link(resolver, "base", base, owner, &mut errors, |node| {
                node.as_program().cloned()
            }) {
                self.base.push(program);
            }
        }

        for id in &entity.roles {
            if let Some(role) = link(resolver, "role", id, owner, &mut errors, |node| {
                node.as_role().cloned()
            }) {
                insert_link(&mut self.roles, "role", id, owner, role, &mut errors);
            }
        }

        for id in &entity.languages {
            if let Some(language) = link(resolver, "language", id, owner, &mut errors, |node| {
                node.as_program().cloned()
            }) {
                insert_link(&mut self.languages, "language", id, owner, language, &mut errors);
            }
        }

        for id in &entity.dependencies {
            if let Some(dependency) = link(resolver, "dependency", id, owner, &mut errors, |node| {
                node.as_program().cloned()
            }) {
                insert_link(&mut self.dependencies, "dependency", id, owner, dependency, &mut errors);
            }
        }

        errors
    }

    /// Code repository locator, empty when none was declared
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn base(&self) -> &[Rc<Program>] {
        &self.base
    }

    pub fn roles(&self) -> &IndexMap<String, Rc<Role>> {
        &self.roles
    }

    pub fn languages(&self) -> &IndexMap<String, Rc<Program>> {
        &self.languages
    }

    pub fn dependencies(&self) -> &IndexMap<String, Rc<Program>> {
        &self.dependencies
    }

    fn fold(
        &self,
        own: &[String],
        pick_program: fn(&Program) -> Aggregate,
        pick_role: fn(&Role) -> Aggregate,
    ) -> Aggregate {
        let name = self.name();
        let mut all = self.core.labelled(own);
        for base in &self.base {
            fold_labelled(&mut all, name, "Base", pick_program(base));
        }
        for role in self.roles.values() {
            fold_labelled(&mut all, name, "Role", pick_role(role));
        }
        for language in self.languages.values() {
            fold_labelled(&mut all, name, "Language", pick_program(language));
        }
        for dependency in self.dependencies.values() {
            fold_labelled(&mut all, name, "Dependency", pick_program(dependency));
        }
        all
    }
}

/// Check that a repository locator is well formed
///
/// Absolute URLs must parse; scheme-less references are taken as relative.
fn validate_repository(locator: &str) -> Result<(), url::ParseError> {
    match Url::parse(locator) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("file:///")?.join(locator)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

impl ModelObject for Program {
    fn core(&self) -> &CoreObject {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CoreObject {
        &mut self.core
    }

    fn decision_model_pointers(&self) -> Aggregate {
        let id = self.id();
        let mut all = self.core.pointer_seed();
        for base in &self.base {
            merge(&mut all, &format!("{id}.base"), base.decision_model_pointers());
        }
        for role in self.roles.values() {
            merge(&mut all, &format!("{id}.roles"), role.decision_model_pointers());
        }
        for dependency in self.dependencies.values() {
            merge(&mut all, &format!("{id}.dependencies"), dependency.decision_model_pointers());
        }
        for language in self.languages.values() {
            merge(&mut all, &format!("{id}.languages"), language.decision_model_pointers());
        }
        all
    }

    fn mitigations(&self) -> Aggregate {
        self.fold(self.core.own_mitigations(), |p| p.mitigations(), |r| r.mitigations())
    }

    fn recommendations(&self) -> Aggregate {
        self.fold(
            self.core.own_recommendations(),
            |p| p.recommendations(),
            |r| r.recommendations(),
        )
    }
}
