//! Error types for ADSM

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening or querying the ADDB component store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid ADDB path or directory not present: '{}'", path.display())]
    LocationNotFound { path: PathBuf },

    #[error("cannot expand '~' in ADDB path: home directory is unavailable")]
    HomeDirUnavailable,

    #[error("unknown component type '{kind}' in '{}'", file.display())]
    UnknownKind { kind: String, file: PathBuf },

    #[error("found multiple entries in ADDB for '{id}'")]
    Duplicate { id: String },

    #[error("cannot find '{id}' in ADDB")]
    NotFound { id: String },

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed component in '{}': {source}", file.display())]
    Yaml {
        file: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised while building or resolving the object model
///
/// Identity errors (`EmptyId`, `EmptyName`, `EmptyDescription`,
/// `NullDeclaration`, `KindMismatch`) stop construction of the entity that
/// raised them. Every other variant is collected and construction goes on.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot convert nil declaration to {kind} specification")]
    NullDeclaration { kind: &'static str },

    #[error("empty IDs are not allowed")]
    EmptyId,

    #[error("empty names are not allowed for '{id}'")]
    EmptyName { id: String },

    #[error("empty description for '{id}'")]
    EmptyDescription { id: String },

    #[error("cannot initialize {expected} with '{found}'")]
    KindMismatch { expected: &'static str, found: String },

    #[error("{relation} '{id}' of '{owner}' not found in model or ADDB")]
    Unresolved {
        relation: &'static str,
        id: String,
        owner: String,
    },

    #[error("{relation} '{id}' of '{owner}' not found in ADDB")]
    NotInStore {
        relation: &'static str,
        id: String,
        owner: String,
    },

    #[error("no declaration found for '{id}' in model or ADDB")]
    NoDeclaration { id: String },

    #[error("error in resolving {relation} '{id}' for '{owner}'")]
    BadReference {
        relation: &'static str,
        id: String,
        owner: String,
    },

    #[error("{relation} '{id}' is already listed for '{owner}'")]
    DuplicateLink {
        relation: &'static str,
        id: String,
        owner: String,
    },

    #[error("invalid repository '{url}' for '{owner}': {source}")]
    InvalidRepository {
        url: String,
        owner: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cyclic reference detected while resolving '{id}'")]
    CyclicReference { id: String },

    #[error("multiple objects with identifier '{id}' found")]
    DuplicateObject { id: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("cannot work with empty content")]
    EmptyContent,

    #[error("malformed document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ModelError {
    /// Whether this error aborts construction of the entity that raised it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModelError::NullDeclaration { .. }
                | ModelError::EmptyId
                | ModelError::EmptyName { .. }
                | ModelError::EmptyDescription { .. }
                | ModelError::KindMismatch { .. }
                | ModelError::EmptyContent
                | ModelError::Parse(_)
        )
    }
}

/// Errors raised while reading configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
