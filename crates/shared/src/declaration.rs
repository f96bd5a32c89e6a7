//! Declaration types - the as-written form of a security model
//!
//! Every reference field holds a bare identifier (or an `addb:` prefixed
//! one). Nothing here links to anything; the loaders resolve identifiers
//! into the object model later.

use serde::{Deserialize, Deserializer, Serialize};

/// Kind tag carried by an entity declaration
///
/// Unrecognized tags are kept verbatim; the entity then fails on its own
/// when it is built instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Human,
    Program,
    System,
    Role,
    Unknown(String),
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Human => "human",
            EntityKind::Program => "program",
            EntityKind::System => "system",
            EntityKind::Role => "role",
            EntityKind::Unknown(tag) => tag,
        }
    }

    /// Programs and systems share one object-model representation
    pub fn is_program_like(&self) -> bool {
        matches!(self, EntityKind::Program | EntityKind::System)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EntityKind::Unknown(_))
    }
}

impl From<String> for EntityKind {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "human" => EntityKind::Human,
            "program" => EntityKind::Program,
            "system" => EntityKind::System,
            "role" => EntityKind::Role,
            _ => EntityKind::Unknown(tag),
        }
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human, program, system or role declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Entity {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: Option<EntityKind>,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    /// Identifiers this entity inherits from
    #[serde(default, deserialize_with = "nullable")]
    pub base: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub mitigations: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub recommendations: Vec<String>,

    /// Decision-model (ADM) file pointers
    #[serde(default, deserialize_with = "nullable")]
    pub adm: Vec<String>,

    /// Humans only: the program the human works through
    #[serde(default, deserialize_with = "nullable")]
    pub interface: String,

    /// Programs/systems only
    #[serde(default, deserialize_with = "nullable")]
    pub roles: Vec<String>,

    #[serde(rename = "repo", default, deserialize_with = "nullable")]
    pub repository: String,

    #[serde(default, deserialize_with = "nullable")]
    pub languages: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub dependencies: Vec<String>,

    /// Directory ADM pointers are relative to (set during indexing)
    #[serde(skip)]
    pub adm_dir: Option<String>,
}

impl Entity {
    /// Create a new entity declaration with minimal configuration
    pub fn new(id: impl Into<String>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set base identifiers
    pub fn with_base(mut self, base: &[&str]) -> Self {
        self.base = to_strings(base);
        self
    }

    /// Builder: set interface
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    /// Builder: set roles
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = to_strings(roles);
        self
    }

    /// Builder: set languages
    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = to_strings(languages);
        self
    }

    /// Builder: set dependencies
    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = to_strings(dependencies);
        self
    }

    /// Builder: set ADM pointers
    pub fn with_adm(mut self, adm: &[&str]) -> Self {
        self.adm = to_strings(adm);
        self
    }

    /// Builder: set the ADM directory
    pub fn with_adm_dir(mut self, dir: impl Into<String>) -> Self {
        self.adm_dir = Some(dir.into());
        self
    }

    /// Builder: set mitigations
    pub fn with_mitigations(mut self, mitigations: &[&str]) -> Self {
        self.mitigations = to_strings(mitigations);
        self
    }

    /// Builder: set recommendations
    pub fn with_recommendations(mut self, recommendations: &[&str]) -> Self {
        self.recommendations = to_strings(recommendations);
        self
    }

    /// Builder: set repository
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Every non-empty reference, paired with the relation it appears under
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        let mut refs: Vec<(&'static str, &str)> = Vec::new();
        refs.extend(self.base.iter().map(|id| ("base", id.as_str())));
        refs.push(("interface", self.interface.as_str()));
        refs.extend(self.roles.iter().map(|id| ("role", id.as_str())));
        refs.extend(self.languages.iter().map(|id| ("language", id.as_str())));
        refs.extend(self.dependencies.iter().map(|id| ("dependency", id.as_str())));
        refs.retain(|(_, id)| !id.is_empty());
        refs
    }

    /// Kind tag as text, empty when the declaration has none
    pub fn kind_label(&self) -> String {
        self.kind.as_ref().map(|k| k.to_string()).unwrap_or_default()
    }
}

/// Data flow declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Flow {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    /// Protocol stack, each layer being another flow
    #[serde(default, deserialize_with = "nullable")]
    pub protocol: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub sender: String,

    #[serde(default, deserialize_with = "nullable")]
    pub receiver: String,

    #[serde(default, deserialize_with = "nullable")]
    pub mitigations: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub recommendations: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub adm: Vec<String>,

    #[serde(skip)]
    pub adm_dir: Option<String>,
}

impl Flow {
    /// Create a new flow declaration with minimal configuration
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set sender and receiver
    pub fn between(mut self, sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        self.sender = sender.into();
        self.receiver = receiver.into();
        self
    }

    /// Builder: set protocol stack
    pub fn with_protocol(mut self, protocol: &[&str]) -> Self {
        self.protocol = to_strings(protocol);
        self
    }

    /// Builder: set ADM pointers
    pub fn with_adm(mut self, adm: &[&str]) -> Self {
        self.adm = to_strings(adm);
        self
    }

    /// Builder: set the ADM directory
    pub fn with_adm_dir(mut self, dir: impl Into<String>) -> Self {
        self.adm_dir = Some(dir.into());
        self
    }

    /// Builder: set mitigations
    pub fn with_mitigations(mut self, mitigations: &[&str]) -> Self {
        self.mitigations = to_strings(mitigations);
        self
    }

    /// Builder: set recommendations
    pub fn with_recommendations(mut self, recommendations: &[&str]) -> Self {
        self.recommendations = to_strings(recommendations);
        self
    }

    /// Every non-empty reference, paired with the relation it appears under
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        let mut refs: Vec<(&'static str, &str)> =
            vec![("sender", self.sender.as_str()), ("receiver", self.receiver.as_str())];
        refs.extend(self.protocol.iter().map(|id| ("protocol", id.as_str())));
        refs.retain(|(_, id)| !id.is_empty());
        refs
    }
}

/// Top-level security model document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecurityModel {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,

    #[serde(default, deserialize_with = "nullable")]
    pub design_document: String,

    /// ADDB location used for `addb:` references
    #[serde(rename = "addb", default, deserialize_with = "nullable")]
    pub addb_location: String,

    /// Model-level ADM pointers
    #[serde(default, deserialize_with = "nullable")]
    pub adm: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub externals: Vec<Entity>,

    #[serde(default, deserialize_with = "nullable")]
    pub entities: Vec<Entity>,

    #[serde(default, deserialize_with = "nullable")]
    pub flows: Vec<Flow>,

    #[serde(skip)]
    pub adm_dir: Option<String>,
}

/// An indexed declaration: the value type of the builder's declaration table
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Entity(Entity),
    Flow(Flow),
}

impl Declaration {
    pub fn id(&self) -> &str {
        match self {
            Declaration::Entity(e) => &e.id,
            Declaration::Flow(f) => &f.id,
        }
    }

    pub fn adm_dir(&self) -> Option<&str> {
        match self {
            Declaration::Entity(e) => e.adm_dir.as_deref(),
            Declaration::Flow(f) => f.adm_dir.as_deref(),
        }
    }

    /// Set the owning directory unless one was already fixed
    pub fn annotate_dir(&mut self, dir: &str) {
        let slot = match self {
            Declaration::Entity(e) => &mut e.adm_dir,
            Declaration::Flow(f) => &mut f.adm_dir,
        };
        if slot.is_none() {
            *slot = Some(dir.to_string());
        }
    }

    pub fn references(&self) -> Vec<(&'static str, &str)> {
        match self {
            Declaration::Entity(e) => e.references(),
            Declaration::Flow(f) => f.references(),
        }
    }

    /// Kind label used in logs and error messages
    pub fn kind_label(&self) -> String {
        match self {
            Declaration::Entity(e) => e.kind_label(),
            Declaration::Flow(_) => "flow".to_string(),
        }
    }
}

impl From<Entity> for Declaration {
    fn from(entity: Entity) -> Self {
        Declaration::Entity(entity)
    }
}

impl From<Flow> for Declaration {
    fn from(flow: Flow) -> Self {
        Declaration::Flow(flow)
    }
}

/// Treat an explicit `null` the same as a missing field
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
