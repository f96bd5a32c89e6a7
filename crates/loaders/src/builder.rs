//! Builder - Two-phase index/resolve over declarations
//!
//! Indexing records every declaration reachable from a document, pulling
//! `addb:` references out of the store as it goes. Resolution then turns
//! declarations into objects on demand, building each identifier once.

use addb::{Addb, Component, ComponentKind};
use objmodel::{Node, Resolution, Resolver};
use shared::{Declaration, Entity, EntityKind, Flow, ModelError, SecurityModel, StoreConfig};
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// State of one identifier in the object cache
#[derive(Debug, Clone)]
enum Slot {
    /// Construction has started and not finished yet
    InProgress,
    Built(Node),
    /// Construction was rejected; referrers report the broken link
    Failed,
}

/// Owns the declaration table and the object cache for a series of loads
#[derive(Debug, Default)]
pub struct Builder {
    /// ID -> declaration, first registration wins
    declarations: HashMap<String, Declaration>,
    /// ID -> object
    objects: HashMap<String, Slot>,
    store: Addb,
    config: StoreConfig,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set how store references are recognized
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the store consulted for `addb:` references
    pub fn set_store(&mut self, store: Addb) {
        self.store = store;
    }

    pub fn store(&self) -> &Addb {
        &self.store
    }

    /// Indexed declaration for an identifier
    pub fn declaration(&self, id: &str) -> Option<&Declaration> {
        self.declarations.get(id)
    }

    /// Cached object for an identifier
    pub fn object(&self, id: &str) -> Option<&Node> {
        match self.objects.get(id) {
            Some(Slot::Built(node)) => Some(node),
            _ => None,
        }
    }

    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .values()
            .filter(|slot| matches!(slot, Slot::Built(_)))
            .count()
    }

    /// Index every external, entity and flow of a document
    ///
    /// All members are registered before any reference is followed, so
    /// members can refer to each other regardless of order.
    pub fn index_model(&mut self, model: &mut SecurityModel, dir: &str) -> Vec<ModelError> {
        let members: Vec<Declaration> = model
            .externals
            .iter()
            .chain(model.entities.iter())
            .cloned()
            .map(Declaration::from)
            .chain(model.flows.iter().cloned().map(Declaration::from))
            .filter(|d| !d.id().is_empty())
            .collect();

        for declaration in &members {
            self.register(declaration.clone(), dir);
        }
        model.adm_dir = Some(dir.to_string());

        let mut errors = Vec::new();
        for declaration in &members {
            errors.extend(self.index_parts(declaration));
        }

        debug!(
            title = %model.title,
            members = members.len(),
            indexed = self.declarations.len(),
            errors = errors.len(),
            "Indexed security model"
        );
        errors
    }

    /// Index a single entity or flow and everything it references
    pub fn index(&mut self, declaration: impl Into<Declaration>, dir: &str) -> Vec<ModelError> {
        let declaration = declaration.into();
        self.register(declaration.clone(), dir);
        self.index_parts(&declaration)
    }

    /// Look up the declaration for an identifier, fetching it from the store
    /// when it carries the store prefix
    ///
    /// `owner` and `relation` name the declaration and field the reference
    /// was found in; a miss is reported against them.
    pub fn resolve_declaration(
        &mut self,
        owner: &str,
        relation: &'static str,
        id: &str,
    ) -> (Option<&Declaration>, Vec<ModelError>) {
        if self.declarations.contains_key(id) {
            return (self.declarations.get(id), Vec::new());
        }

        if !self.config.is_store_reference(id) {
            warn!(owner, relation, id, "Reference not found in model or ADDB");
            return (
                None,
                vec![ModelError::Unresolved {
                    relation,
                    id: id.to_string(),
                    owner: owner.to_string(),
                }],
            );
        }

        let declaration = match self.store.get_component(id).ok().and_then(translate) {
            Some(declaration) => declaration,
            None => {
                warn!(
                    owner,
                    relation,
                    id,
                    location = %self.store.location().display(),
                    "Reference not found in ADDB"
                );
                return (
                    None,
                    vec![ModelError::NotInStore {
                        relation,
                        id: id.to_string(),
                        owner: owner.to_string(),
                    }],
                );
            }
        };

        debug!(id, kind = %declaration.kind_label(), "Indexed ADDB component");
        // Registered before its own references are followed so that cycles
        // through the store terminate
        self.declarations.insert(id.to_string(), declaration.clone());
        let errors = self.index_parts(&declaration);

        (self.declarations.get(id), errors)
    }

    /// Record an already-built object under an identifier
    ///
    /// Rebinding the same object is a no-op; binding a different one is an
    /// internal error and the first object is kept.
    pub fn bind(&mut self, id: &str, node: Node) -> Result<(), ModelError> {
        if let Some(Slot::Built(existing)) = self.objects.get(id) {
            if Node::same(existing, &node) {
                return Ok(());
            }
            error!(id, "Multiple objects bound to one identifier");
            return Err(ModelError::DuplicateObject { id: id.to_string() });
        }
        self.objects.insert(id.to_string(), Slot::Built(node));
        Ok(())
    }

    fn register(&mut self, mut declaration: Declaration, dir: &str) {
        declaration.annotate_dir(dir);
        let id = declaration.id().to_string();
        if self.declarations.contains_key(&id) {
            debug!(id = %id, "Declaration already indexed, keeping the first");
            return;
        }
        self.declarations.insert(id, declaration);
    }

    /// Follow every reference of a declaration to force its discovery
    fn index_parts(&mut self, declaration: &Declaration) -> Vec<ModelError> {
        let owner = declaration.id();
        let mut errors = Vec::new();
        for (relation, id) in declaration.references() {
            let (_, resolve_errors) = self.resolve_declaration(owner, relation, id);
            errors.extend(resolve_errors);
        }
        errors
    }
}

impl Resolver for Builder {
    /// Return the object for `id`, building and caching it on first use
    fn resolve(&mut self, id: &str) -> Resolution {
        match self.objects.get(id) {
            Some(Slot::Built(node)) => return (Some(node.clone()), Vec::new()),
            Some(Slot::InProgress) => {
                warn!(id, "Cyclic reference");
                return (None, vec![ModelError::CyclicReference { id: id.to_string() }]);
            }
            Some(Slot::Failed) => return (None, Vec::new()),
            None => {}
        }

        let Some(declaration) = self.declarations.get(id).cloned() else {
            return (None, vec![ModelError::NoDeclaration { id: id.to_string() }]);
        };

        self.objects.insert(id.to_string(), Slot::InProgress);
        let (node, mut errors) = Node::build(&declaration, self);

        match &node {
            Some(node) => {
                if let Err(e) = self.bind(id, node.clone()) {
                    errors.push(e);
                }
            }
            None => {
                self.objects.insert(id.to_string(), Slot::Failed);
            }
        }
        (node, errors)
    }
}

/// Convert a store component into a declaration, field for field
///
/// Store ADM pointers are already rooted at their declaring file, so the
/// result is pinned to an empty owning directory.
fn translate(component: &Component) -> Option<Declaration> {
    let kind = match component.kind {
        ComponentKind::Human => EntityKind::Human,
        ComponentKind::Program => EntityKind::Program,
        ComponentKind::System => EntityKind::System,
        ComponentKind::Flow => {
            return Some(Declaration::Flow(Flow {
                id: component.id.clone(),
                name: component.name.clone(),
                description: component.description.clone(),
                protocol: component.protocol.clone(),
                mitigations: component.mitigations.clone(),
                recommendations: component.recommendations.clone(),
                adm: component.adm.clone(),
                adm_dir: Some(String::new()),
                ..Default::default()
            }))
        }
        ComponentKind::Unknown(_) => return None,
    };

    Some(Declaration::Entity(Entity {
        id: component.id.clone(),
        kind: Some(kind),
        name: component.name.clone(),
        description: component.description.clone(),
        base: component.base.clone(),
        mitigations: component.mitigations.clone(),
        recommendations: component.recommendations.clone(),
        adm: component.adm.clone(),
        interface: component.interface.clone(),
        roles: component.roles.clone(),
        repository: component.repository.clone(),
        languages: component.languages.clone(),
        dependencies: component.dependencies.clone(),
        adm_dir: Some(String::new()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use objmodel::ModelObject;
    use std::fs;
    use tempfile::TempDir;

    fn human(id: &str) -> Entity {
        Entity::new(id, EntityKind::Human, id).with_description(format!("The {id} human"))
    }

    fn program(id: &str) -> Entity {
        Entity::new(id, EntityKind::Program, id).with_description(format!("The {id} program"))
    }

    fn store_with(files: &[(&str, &str)]) -> (TempDir, Addb) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();
        (dir, store)
    }

    // ============== Indexing Tests ==============

    #[test]
    fn test_first_registration_wins() {
        let mut builder = Builder::new();
        assert!(builder.index(program("web"), "/first").is_empty());
        assert!(builder
            .index(human("web").with_adm(&["other.adm"]), "/second")
            .is_empty());

        let decl = builder.declaration("web").unwrap();
        assert_eq!(decl.kind_label(), "program");
        assert_eq!(decl.adm_dir(), Some("/first"));
    }

    #[test]
    fn test_index_model_registers_members_before_following_links() {
        let mut model = SecurityModel {
            entities: vec![program("app").with_dependencies(&["lib"]), program("lib")],
            flows: vec![Flow::new("call", "Call").with_description("A call").between("app", "lib")],
            ..Default::default()
        };

        let mut builder = Builder::new();
        let errors = builder.index_model(&mut model, "/models");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(builder.declaration_count(), 3);
        assert_eq!(model.adm_dir.as_deref(), Some("/models"));
        assert_eq!(builder.object_count(), 0);
    }

    #[test]
    fn test_unknown_reference_is_reported_while_indexing() {
        let mut builder = Builder::new();
        let errors = builder.index(program("app").with_languages(&["cobol"]), "");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ModelError::Unresolved { relation: "language", id, owner } if id == "cobol" && owner == "app"
        ));
        assert_eq!(
            errors[0].to_string(),
            "language 'cobol' of 'app' not found in model or ADDB"
        );
    }

    #[test]
    fn test_prefixed_reference_missing_from_store() {
        let mut builder = Builder::new();
        let errors = builder.index(program("app").with_languages(&["addb:cobol"]), "");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ModelError::NotInStore { relation: "language", id, owner } if id == "addb:cobol" && owner == "app"
        ));
    }

    #[test]
    fn test_store_components_are_indexed_transitively() {
        let (_dir, store) = store_with(&[(
            "generic/browser.smspec",
            "id: generic.browser\nname: Browser\ntype: program\ndescription: Any browser\n\
             languages: [addb:generic.js]\nadm: [browser.adm]\n---\n\
             id: generic.js\nname: JavaScript\ntype: program\ndescription: JS\n",
        )]);
        let browser_adm = store.location().join("generic/browser.adm");

        let mut builder = Builder::new();
        builder.set_store(store);
        let errors = builder.index(human("agent").with_interface("addb:generic.browser"), "/models");
        assert!(errors.is_empty(), "{errors:?}");

        let decl = builder.declaration("addb:generic.browser").unwrap();
        assert_eq!(decl.kind_label(), "program");
        // Store declarations never take the document's directory
        assert_eq!(decl.adm_dir(), Some(""));
        assert!(builder.declaration("addb:generic.js").is_some());

        let (node, errors) = builder.resolve("addb:generic.browser");
        assert!(errors.is_empty());
        let browser = node.unwrap();
        assert_eq!(browser.id(), "generic.browser");
        assert_eq!(
            browser.decision_model_pointers()["generic.browser"],
            vec![browser_adm.to_string_lossy().into_owned()]
        );
    }

    #[test]
    fn test_store_cycle_terminates() {
        let (_dir, store) = store_with(&[(
            "loop.smspec",
            "id: a\nname: A\ntype: program\ndescription: a\nbase: [addb:b]\n---\n\
             id: b\nname: B\ntype: program\ndescription: b\nbase: [addb:a]\n",
        )]);

        let mut builder = Builder::new();
        builder.set_store(store);
        let (decl, errors) = builder.resolve_declaration("model", "base", "addb:a");
        assert!(decl.is_some());
        assert!(errors.is_empty());
        assert_eq!(builder.declaration_count(), 2);
    }

    #[test]
    fn test_translate_flow_component() {
        let component = Component {
            id: "generic.https".to_string(),
            name: "HTTPS".to_string(),
            kind: ComponentKind::Flow,
            description: "HTTP over TLS".to_string(),
            protocol: vec!["addb:generic.tls".to_string()],
            adm: vec!["/addb/https.adm".to_string()],
            ..Default::default()
        };

        match translate(&component) {
            Some(Declaration::Flow(flow)) => {
                assert_eq!(flow.id, "generic.https");
                assert_eq!(flow.protocol, vec!["addb:generic.tls"]);
                assert_eq!(flow.adm, vec!["/addb/https.adm"]);
            }
            other => panic!("unexpected translation: {other:?}"),
        }

        let unknown = Component {
            kind: ComponentKind::Unknown("gadget".to_string()),
            ..component
        };
        assert!(translate(&unknown).is_none());
    }

    // ============== Resolution Tests ==============

    #[test]
    fn test_resolve_is_memoized() {
        let mut builder = Builder::new();
        builder.index(program("server"), "");
        builder.index(program("web").with_base(&["server"]), "");
        builder.index(program("api").with_base(&["server"]), "");

        let (web, errors) = builder.resolve("web");
        assert!(errors.is_empty());
        let (api, _) = builder.resolve("api");
        let (server, _) = builder.resolve("server");
        let server = server.unwrap();

        let web_base = Node::Program(web.unwrap().as_program().unwrap().base()[0].clone());
        let api_base = Node::Program(api.unwrap().as_program().unwrap().base()[0].clone());
        assert!(Node::same(&web_base, &server));
        assert!(Node::same(&api_base, &server));

        let (again, _) = builder.resolve("server");
        assert!(Node::same(&again.unwrap(), &server));
        assert_eq!(builder.object_count(), 3);
    }

    #[test]
    fn test_resolve_without_declaration() {
        let mut builder = Builder::new();
        let (node, errors) = builder.resolve("ghost");
        assert!(node.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("ghost"));
    }

    #[test]
    fn test_cyclic_base_is_rejected() {
        let mut builder = Builder::new();
        builder.index(program("a").with_base(&["b"]), "");
        builder.index(program("b").with_base(&["a"]), "");

        let (node, errors) = builder.resolve("a");
        let a = node.unwrap();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelError::CyclicReference { id } if id == "a")));

        // b was built without its link back to a
        let b = a.as_program().unwrap().base()[0].clone();
        assert_eq!(b.id(), "b");
        assert!(b.base().is_empty());
    }

    #[test]
    fn test_failed_object_is_not_rebuilt() {
        let mut builder = Builder::new();
        builder.index(Entity::new("nameless", EntityKind::Program, ""), "");

        let (node, errors) = builder.resolve("nameless");
        assert!(node.is_none());
        assert!(matches!(errors[..], [ModelError::EmptyName { .. }]));

        let (node, errors) = builder.resolve("nameless");
        assert!(node.is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_bind_rejects_second_distinct_object() {
        let mut builder = Builder::new();
        builder.index(program("web"), "");
        let (first, _) = builder.resolve("web");
        let first = first.unwrap();

        assert!(builder.bind("web", first.clone()).is_ok());

        let mut other = objmodel::Program::default();
        other.init(Some(&program("web")), &mut builder);
        let err = builder
            .bind("web", Node::Program(std::rc::Rc::new(other)))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateObject { .. }));
        assert!(Node::same(builder.object("web").unwrap(), &first));
    }

    #[test]
    fn test_adm_directory_applies_to_model_members() {
        let mut builder = Builder::new();
        builder.index(human("root").with_adm(&["oh-no.adm"]), "/root");

        let (node, _) = builder.resolve("root");
        let root = node.unwrap();
        let human = root.as_human().unwrap();
        assert_eq!(human.decision_model_pointers()["root"], vec!["/root/oh-no.adm"]);
    }
}
