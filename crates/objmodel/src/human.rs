//! Human - A person interacting with the modeled system

use crate::common::{fold_labelled, link, merge, Aggregate, CoreObject, ModelObject, Resolver};
use crate::Program;
use shared::{Entity, EntityKind, ModelError};
use std::rc::Rc;

/// Resolved human entity
#[derive(Debug, Clone, Default)]
pub struct Human {
    core: CoreObject,
    /// Humans this one inherits from
    base: Vec<Rc<Human>>,
    /// The program the human works through
    interface: Option<Rc<Program>>,
}

impl Human {
    /// Initialize from a declaration, resolving links through `resolver`
    pub fn init(&mut self, entity: Option<&Entity>, resolver: &mut dyn Resolver) -> Vec<ModelError> {
        let Some(entity) = entity else {
            return vec![ModelError::NullDeclaration { kind: "human" }];
        };

        if entity.kind != Some(EntityKind::Human) {
            return vec![ModelError::KindMismatch {
                expected: "human",
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

        for base in &entity.base {
            if let Some(human) = link(resolver, "base", base, owner, &mut errors, |node| {
                node.as_human().cloned()
            }) {
                self.base.push(human);
            }
        }

        if !entity.interface.is_empty() {
            self.interface = link(resolver, "interface", &entity.interface, owner, &mut errors, |node| {
                node.as_program().cloned()
            });
        }

        errors
    }

    pub fn base(&self) -> &[Rc<Human>] {
        &self.base
    }

    /// The program this human works through, if one was declared
    pub fn user_interface(&self) -> Option<&Rc<Program>> {
        self.interface.as_ref()
    }

    fn fold(&self, own: &[String], pick: fn(&Human) -> Aggregate) -> Aggregate {
        let mut all = self.core.labelled(own);
        for base in &self.base {
            fold_labelled(&mut all, self.name(), "Base", pick(base));
        }
        all
    }
}

impl ModelObject for Human {
    fn core(&self) -> &CoreObject {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CoreObject {
        &mut self.core
    }

    fn decision_model_pointers(&self) -> Aggregate {
        let mut all = self.core.pointer_seed();
        for base in &self.base {
            merge(&mut all, &format!("{}.base", self.id()), base.decision_model_pointers());
        }
        if let Some(interface) = &self.interface {
            merge(
                &mut all,
                &format!("{}.interface", self.id()),
                interface.decision_model_pointers(),
            );
        }
        all
    }

    fn mitigations(&self) -> Aggregate {
        self.fold(self.core.own_mitigations(), |h| h.mitigations())
    }

    fn recommendations(&self) -> Aggregate {
        self.fold(self.core.own_recommendations(), |h| h.recommendations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestHarness;

    fn human(id: &str, name: &str, description: &str) -> Entity {
        Entity::new(id, EntityKind::Human, name).with_description(description)
    }

    // ============== Construction Tests ==============

    #[test]
    fn test_human_with_null_declaration() {
        let mut h = Human::default();
        let errs = h.init(None, &mut TestHarness::default());
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].to_string(),
            "cannot convert nil declaration to human specification"
        );
    }

    #[test]
    fn test_human_with_empty_identity() {
        let mut th = TestHarness::default();

        let mut h1 = Human::default();
        let errs = h1.init(Some(&human("", "", "")), &mut th);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "empty IDs are not allowed");

        let mut h2 = Human::default();
        let errs = h2.init(Some(&human("someone", "", "")), &mut th);
        assert!(matches!(errs[..], [ModelError::EmptyName { .. }]));
    }

    #[test]
    fn test_human_with_empty_description() {
        let mut h = Human::default();
        let errs = h.init(Some(&human("someone", "Someone", "")), &mut TestHarness::default());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "empty description for 'someone'");
        assert!(!h.core().is_initialized());
    }

    #[test]
    fn test_human_with_non_human_declaration() {
        let android = Entity::new("android", EntityKind::System, "Android")
            .with_description("AI system masquerading as a human")
            .with_adm(&["skynet.adm", "matrix.adm"]);

        let mut h = Human::default();
        let errs = h.init(Some(&android), &mut TestHarness::default());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "cannot initialize human with 'system'");
    }

    // ============== Link Tests ==============

    #[test]
    fn test_human_inherited_from_another_human() {
        let mut th = TestHarness::default()
            .with(human("teen", "Teenager", "A teenager").with_base(&["father"]))
            .with(human("father", "Teen's Father", "Teen's father"));

        let teen = th.entity("teen");
        let mut h = Human::default();
        let errs = h.init(Some(&teen), &mut th);
        assert!(errs.is_empty());
        assert_eq!(h.base()[0].id(), "father");
        assert_eq!(h.base()[0].name(), "Teen's Father");
    }

    #[test]
    fn test_human_with_missing_base() {
        let mut th = TestHarness::default()
            .with(human("adult", "An adult", "Someone who just turned 18").with_base(&["father"]));

        let adult = th.entity("adult");
        let mut h = Human::default();
        let errs = h.init(Some(&adult), &mut th);
        assert!(!errs.is_empty());
        for err in &errs {
            assert!(err.to_string().contains("father"), "{err}");
        }
        assert!(h.base().is_empty());
    }

    #[test]
    fn test_human_inherited_from_program() {
        let mut th = TestHarness::default()
            .with(human("teen", "Teenager", "A teenager").with_base(&["father"]))
            .with(
                Entity::new("father", EntityKind::Program, "Teen's father")
                    .with_description("Teen's father who is apparently a robot"),
            );

        let teen = th.entity("teen");
        let mut h = Human::default();
        let errs = h.init(Some(&teen), &mut th);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("father"));
        // The human itself is still usable
        assert!(h.core().is_initialized());
    }

    #[test]
    fn test_human_with_interface() {
        let mut th = TestHarness::default()
            .with(
                human("agent", "Customer Care Agent", "A customer care agent")
                    .with_interface("agent-browser"),
            )
            .with(
                Entity::new("agent-browser", EntityKind::Program, "Agent's web browser")
                    .with_description("Browser used by customer-care agent")
                    .with_roles(&["agent-role"]),
            )
            .with(
                Entity::new("agent-role", EntityKind::Role, "Agent's role")
                    .with_description("Agent's role when browsing the system"),
            );

        let agent = th.entity("agent");
        let mut h = Human::default();
        let errs = h.init(Some(&agent), &mut th);
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(h.user_interface().map(|p| p.id()), Some("agent-browser"));
    }

    #[test]
    fn test_human_with_missing_interface() {
        let mut th = TestHarness::default()
            .with(human("agent", "Agent", "A customer care agent").with_interface("agent-browser"));

        let agent = th.entity("agent");
        let mut h = Human::default();
        let errs = h.init(Some(&agent), &mut th);
        assert!(!errs.is_empty());
        for err in &errs {
            assert!(err.to_string().contains("agent-browser"), "{err}");
        }
        assert!(h.user_interface().is_none());
    }

    // ============== Aggregation Tests ==============

    #[test]
    fn test_adm_pointers_with_directory() {
        let mut th = TestHarness::default();
        let root = human("root", "Root", "Superuser")
            .with_adm(&["oh-no.adm"])
            .with_adm_dir("/root");

        let mut h = Human::default();
        assert!(h.init(Some(&root), &mut th).is_empty());
        assert_eq!(h.decision_model_pointers()["root"], vec!["/root/oh-no.adm"]);
    }

    #[test]
    fn test_adm_pointers_follow_base_and_interface() {
        let mut th = TestHarness::default()
            .with(
                human("teen", "Teenager", "A teenager")
                    .with_base(&["father"])
                    .with_interface("phone")
                    .with_adm(&["teen.adm"]),
            )
            .with(human("father", "Father", "Teen's father").with_adm(&["father.adm"]))
            .with(
                Entity::new("phone", EntityKind::Program, "Phone")
                    .with_description("A phone")
                    .with_adm(&["phone.adm"]),
            );

        let teen = th.entity("teen");
        let mut h = Human::default();
        assert!(h.init(Some(&teen), &mut th).is_empty());

        let adm = h.decision_model_pointers();
        assert_eq!(adm["teen"], vec!["teen.adm"]);
        assert_eq!(adm["teen.base.father"], vec!["father.adm"]);
        assert_eq!(adm["teen.interface.phone"], vec!["phone.adm"]);
    }

    #[test]
    fn test_mitigations_single_key() {
        let mut th = TestHarness::default();
        let user = human("user", "User", "A user").with_mitigations(&["training", "MFA"]);

        let mut h = Human::default();
        assert!(h.init(Some(&user), &mut th).is_empty());

        let mitigations = h.mitigations();
        assert_eq!(mitigations.len(), 1);
        assert_eq!(mitigations["User"], vec!["training", "MFA"]);
        assert!(h.recommendations().is_empty());
    }

    #[test]
    fn test_inherited_mitigations_are_labelled() {
        let mut th = TestHarness::default()
            .with(human("teen", "Teenager", "A teenager").with_base(&["father"]))
            .with(
                human("father", "Father", "Teen's father")
                    .with_mitigations(&["supervision"])
                    .with_recommendations(&["parental controls"]),
            );

        let teen = th.entity("teen");
        let mut h = Human::default();
        assert!(h.init(Some(&teen), &mut th).is_empty());
        h.add_mitigation("curfew");

        let mitigations = h.mitigations();
        assert_eq!(mitigations["Teenager"], vec!["curfew"]);
        assert_eq!(mitigations["Teenager -> Base:Father"], vec!["supervision"]);
        assert_eq!(
            h.recommendations()["Teenager -> Base:Father"],
            vec!["parental controls"]
        );
    }
}
