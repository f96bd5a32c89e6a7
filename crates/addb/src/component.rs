//! Component records stored in ADDB

use serde::{Deserialize, Serialize};

/// Kind tag of an ADDB component
///
/// Unrecognized tags are kept verbatim so the store can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    Human,
    Program,
    System,
    Flow,
    Unknown(String),
}

impl ComponentKind {
    pub fn is_known(&self) -> bool {
        !matches!(self, ComponentKind::Unknown(_))
    }
}

impl From<String> for ComponentKind {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "human" => ComponentKind::Human,
            "program" => ComponentKind::Program,
            "system" => ComponentKind::System,
            "flow" => ComponentKind::Flow,
            _ => ComponentKind::Unknown(tag),
        }
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        kind.to_string()
    }
}

impl Default for ComponentKind {
    fn default() -> Self {
        ComponentKind::Unknown(String::new())
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Human => f.write_str("human"),
            ComponentKind::Program => f.write_str("program"),
            ComponentKind::System => f.write_str("system"),
            ComponentKind::Flow => f.write_str("flow"),
            ComponentKind::Unknown(tag) => f.write_str(tag),
        }
    }
}

/// Reusable entity or flow declaration kept in ADDB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Component {
    #[serde(deserialize_with = "shared::nullable")]
    pub id: String,

    #[serde(deserialize_with = "shared::nullable")]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ComponentKind,

    #[serde(deserialize_with = "shared::nullable")]
    pub description: String,

    #[serde(deserialize_with = "shared::nullable")]
    pub design_document: String,

    #[serde(deserialize_with = "shared::nullable")]
    pub base: Vec<String>,

    #[serde(deserialize_with = "shared::nullable")]
    pub mitigations: Vec<String>,

    #[serde(deserialize_with = "shared::nullable")]
    pub recommendations: Vec<String>,

    /// ADM pointers, rewritten against the declaring file's directory
    #[serde(deserialize_with = "shared::nullable")]
    pub adm: Vec<String>,

    /// Humans only
    #[serde(deserialize_with = "shared::nullable")]
    pub interface: String,

    /// Programs/systems only
    #[serde(deserialize_with = "shared::nullable")]
    pub roles: Vec<String>,
    #[serde(rename = "repo", deserialize_with = "shared::nullable")]
    pub repository: String,
    #[serde(deserialize_with = "shared::nullable")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "shared::nullable")]
    pub dependencies: Vec<String>,

    /// Flows only
    #[serde(deserialize_with = "shared::nullable")]
    pub protocol: Vec<String>,
}
