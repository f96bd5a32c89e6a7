//! Shared building blocks of the object model
//!
//! Every resolved kind embeds a [`CoreObject`] and implements
//! [`ModelObject`]. Links to other objects are obtained through a
//! [`Resolver`], which the builder (or a test harness) supplies.

use crate::{Flow, Human, Program, Role};
use indexmap::IndexMap;
use shared::{Declaration, EntityKind, ModelError};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Qualified key -> list of strings, as produced by every aggregation
pub type Aggregate = BTreeMap<String, Vec<String>>;

/// Outcome of resolving one identifier: the object (if one could be
/// produced) and every error met on the way
pub type Resolution = (Option<Node>, Vec<ModelError>);

/// Link-resolution callback handed to every object's `init`
pub trait Resolver {
    fn resolve(&mut self, id: &str) -> Resolution;
}

impl<F> Resolver for F
where
    F: FnMut(&str) -> Resolution,
{
    fn resolve(&mut self, id: &str) -> Resolution {
        self(id)
    }
}

/// Identity, ADM pointers, mitigations and recommendations common to all kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreObject {
    id: String,
    name: String,
    description: String,
    adm: Vec<String>,
    mitigations: Vec<String>,
    recommendations: Vec<String>,
    initialized: bool,
}

impl CoreObject {
    /// Set the identity fields, stopping at the first empty one
    pub(crate) fn init_identity(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<(), ModelError> {
        if id.is_empty() {
            return Err(ModelError::EmptyId);
        }
        self.id = id.to_string();

        if name.is_empty() {
            return Err(ModelError::EmptyName { id: self.id.clone() });
        }
        self.name = name.to_string();

        if description.is_empty() {
            return Err(ModelError::EmptyDescription { id: self.id.clone() });
        }
        self.description = description.to_string();

        self.initialized = true;
        Ok(())
    }

    /// Copy the leaf fields shared by entities and flows
    pub(crate) fn init_leaves(
        &mut self,
        adm: &[String],
        adm_dir: Option<&str>,
        mitigations: &[String],
        recommendations: &[String],
    ) {
        self.adm = adm.iter().map(|name| join_pointer(adm_dir, name)).collect();
        self.mitigations = mitigations.to_vec();
        self.recommendations = recommendations.to_vec();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// This object's own ADM pointers
    pub fn adm(&self) -> &[String] {
        &self.adm
    }

    /// This object's own mitigations, without inherited ones
    pub fn own_mitigations(&self) -> &[String] {
        &self.mitigations
    }

    /// This object's own recommendations, without inherited ones
    pub fn own_recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Whether the identity fields were accepted
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `{id: own pointers}`, the seed of every ADM aggregation
    pub(crate) fn pointer_seed(&self) -> Aggregate {
        let mut all = Aggregate::new();
        all.insert(self.id.clone(), self.adm.clone());
        all
    }

    /// Own items filed under the object's name, if there are any
    pub(crate) fn labelled(&self, items: &[String]) -> Aggregate {
        let mut all = Aggregate::new();
        if !items.is_empty() {
            all.insert(self.name.clone(), items.to_vec());
        }
        all
    }
}

/// Read access and typed mutators shared by every resolved kind
pub trait ModelObject {
    fn core(&self) -> &CoreObject;
    fn core_mut(&mut self) -> &mut CoreObject;

    /// Qualified path -> ADM file paths, across this object and its links
    fn decision_model_pointers(&self) -> Aggregate;

    /// Labelled mitigations, across this object and its links
    fn mitigations(&self) -> Aggregate;

    /// Labelled recommendations, across this object and its links
    fn recommendations(&self) -> Aggregate;

    fn id(&self) -> &str {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn description(&self) -> &str {
        self.core().description()
    }

    fn add_decision_model_pointer(&mut self, adm: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().adm.push(adm.into());
    }

    fn add_mitigation(&mut self, mitigation: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().mitigations.push(mitigation.into());
    }

    fn add_recommendation(&mut self, recommendation: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().recommendations.push(recommendation.into());
    }
}

/// Shared handle to a resolved object
///
/// Cloning a `Node` clones the handle, never the object.
#[derive(Debug, Clone)]
pub enum Node {
    Human(Rc<Human>),
    Program(Rc<Program>),
    Role(Rc<Role>),
    Flow(Rc<Flow>),
}

impl Node {
    /// Construct the object a declaration describes
    ///
    /// Yields no object when the declaration's identity fields or kind were
    /// rejected; every other error travels alongside a usable object.
    pub fn build(declaration: &Declaration, resolver: &mut dyn Resolver) -> Resolution {
        let (node, errors) = match declaration {
            Declaration::Entity(entity) => match &entity.kind {
                Some(EntityKind::Human) => {
                    let mut human = Human::default();
                    let errors = human.init(Some(entity), resolver);
                    let node = human.core().is_initialized().then(|| Node::Human(Rc::new(human)));
                    (node, errors)
                }
                Some(EntityKind::Program) | Some(EntityKind::System) => {
                    let mut program = Program::default();
                    let errors = program.init(Some(entity), resolver);
                    let node = program
                        .core()
                        .is_initialized()
                        .then(|| Node::Program(Rc::new(program)));
                    (node, errors)
                }
                Some(EntityKind::Role) => {
                    let mut role = Role::default();
                    let errors = role.init(Some(entity), resolver);
                    let node = role.core().is_initialized().then(|| Node::Role(Rc::new(role)));
                    (node, errors)
                }
                Some(EntityKind::Unknown(_)) | None => {
                    warn!(id = %entity.id, kind = %entity.kind_label(), "Unknown entity kind");
                    (
                        None,
                        vec![ModelError::KindMismatch {
                            expected: "entity",
                            found: entity.kind_label(),
                        }],
                    )
                }
            },
            Declaration::Flow(decl) => {
                let mut flow = Flow::default();
                let errors = flow.init(Some(decl), resolver);
                let node = flow.core().is_initialized().then(|| Node::Flow(Rc::new(flow)));
                (node, errors)
            }
        };

        debug!(
            id = declaration.id(),
            kind = %declaration.kind_label(),
            built = node.is_some(),
            errors = errors.len(),
            "Built object"
        );
        (node, errors)
    }

    fn object(&self) -> &dyn ModelObjectView {
        match self {
            Node::Human(h) => h.as_ref(),
            Node::Program(p) => p.as_ref(),
            Node::Role(r) => r.as_ref(),
            Node::Flow(f) => f.as_ref(),
        }
    }

    pub fn id(&self) -> &str {
        self.object().view_core().id()
    }

    pub fn name(&self) -> &str {
        self.object().view_core().name()
    }

    pub fn description(&self) -> &str {
        self.object().view_core().description()
    }

    /// Kind label used in logs and reports
    pub fn kind_label(&self) -> &'static str {
        match self {
            Node::Human(_) => "human",
            Node::Program(_) => "program",
            Node::Role(_) => "role",
            Node::Flow(_) => "flow",
        }
    }

    pub fn decision_model_pointers(&self) -> Aggregate {
        self.object().pointers()
    }

    pub fn mitigations(&self) -> Aggregate {
        self.object().labelled_mitigations()
    }

    pub fn recommendations(&self) -> Aggregate {
        self.object().labelled_recommendations()
    }

    pub fn as_human(&self) -> Option<&Rc<Human>> {
        match self {
            Node::Human(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_program(&self) -> Option<&Rc<Program>> {
        match self {
            Node::Program(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Rc<Role>> {
        match self {
            Node::Role(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_flow(&self) -> Option<&Rc<Flow>> {
        match self {
            Node::Flow(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_role(&self) -> bool {
        matches!(self, Node::Role(_))
    }

    /// Whether two handles point at the very same object
    pub fn same(a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Human(x), Node::Human(y)) => Rc::ptr_eq(x, y),
            (Node::Program(x), Node::Program(y)) => Rc::ptr_eq(x, y),
            (Node::Role(x), Node::Role(y)) => Rc::ptr_eq(x, y),
            (Node::Flow(x), Node::Flow(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

/// Object-safe slice of [`ModelObject`] used for dispatch through [`Node`]
trait ModelObjectView {
    fn view_core(&self) -> &CoreObject;
    fn pointers(&self) -> Aggregate;
    fn labelled_mitigations(&self) -> Aggregate;
    fn labelled_recommendations(&self) -> Aggregate;
}

impl<T: ModelObject> ModelObjectView for T {
    fn view_core(&self) -> &CoreObject {
        self.core()
    }

    fn pointers(&self) -> Aggregate {
        self.decision_model_pointers()
    }

    fn labelled_mitigations(&self) -> Aggregate {
        self.mitigations()
    }

    fn labelled_recommendations(&self) -> Aggregate {
        self.recommendations()
    }
}

/// Prefix an ADM pointer with its owning directory
///
/// No directory (or an empty one) leaves the pointer untouched.
pub fn join_pointer(dir: Option<&str>, name: &str) -> String {
    match dir {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), name),
        _ => name.to_string(),
    }
}

/// Merge `child` into `target` under `namespace`, appending on collisions
pub(crate) fn merge(target: &mut Aggregate, namespace: &str, child: Aggregate) {
    for (key, values) in child {
        target
            .entry(format!("{namespace}.{key}"))
            .or_default()
            .extend(values);
    }
}

/// Fold a linked object's labelled items into `target`
///
/// Keys read `<owner> -> <Relation>:<child key>`; empty lists are dropped.
pub(crate) fn fold_labelled(target: &mut Aggregate, owner: &str, relation: &str, child: Aggregate) {
    for (key, values) in child {
        if values.is_empty() {
            continue;
        }
        target
            .entry(format!("{owner} -> {relation}:{key}"))
            .or_default()
            .extend(values);
    }
}

/// Resolve one reference and narrow it to the kind the field expects
///
/// A miss or a wrong kind adds a `BadReference` error naming the relation,
/// the identifier and the referring object.
pub(crate) fn link<T>(
    resolver: &mut dyn Resolver,
    relation: &'static str,
    id: &str,
    owner: &str,
    errors: &mut Vec<ModelError>,
    narrow: impl FnOnce(Node) -> Option<T>,
) -> Option<T> {
    let (node, resolve_errors) = resolver.resolve(id);
    errors.extend(resolve_errors);

    let linked = node.and_then(narrow);
    if linked.is_none() {
        warn!(relation, id, owner, "Unresolved reference");
        errors.push(ModelError::BadReference {
            relation,
            id: id.to_string(),
            owner: owner.to_string(),
        });
    }
    linked
}

/// Insert into a map-valued link, rejecting repeats
pub(crate) fn insert_link<T>(
    map: &mut IndexMap<String, T>,
    relation: &'static str,
    id: &str,
    owner: &str,
    value: T,
    errors: &mut Vec<ModelError>,
) {
    if map.contains_key(id) {
        errors.push(ModelError::DuplicateLink {
            relation,
            id: id.to_string(),
            owner: owner.to_string(),
        });
        return;
    }
    map.insert(id.to_string(), value);
}
