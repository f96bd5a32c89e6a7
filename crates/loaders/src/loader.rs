//! Loader - Text in, resolved objects out
//!
//! Each load parses one document, opens the store it names, indexes the
//! document and builds the requested object. The builder survives between
//! loads so later documents can refer to what earlier ones declared.

use crate::builder::Builder;
use addb::Addb;
use objmodel::{Flow, Human, Node, Program, Resolver, SecurityModel};
use serde::de::DeserializeOwned;
use shared::{Entity, EntityKind, LoaderConfig, ModelError, Result};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// A loaded object with every non-fatal error met while building it
#[derive(Debug)]
pub struct Loaded<T> {
    pub object: T,
    pub errors: Vec<ModelError>,
}

impl<T> Loaded<T> {
    /// Whether the object was built without any error
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Document loader
#[derive(Debug, Default)]
pub struct Loader {
    builder: Builder,
    config: LoaderConfig,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with explicit configuration
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            builder: Builder::new().with_config(config.store.clone()),
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The builder shared by every load
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Load a whole security model document
    ///
    /// ADM pointers of the document's members are taken relative to
    /// `adm_dir`. The store is the one the document names, falling back to
    /// the configured default.
    pub fn load_security_model(&mut self, text: &str, adm_dir: &str) -> Result<Loaded<SecurityModel>> {
        let mut declaration: shared::SecurityModel = parse(text)?;

        let mut errors = Vec::new();
        self.open_store(&declaration.addb_location, &mut errors);
        errors.extend(self.builder.index_model(&mut declaration, adm_dir));

        let mut model = SecurityModel::default();
        errors.extend(model.init(Some(&declaration), &mut self.builder));

        info!(
            title = %model.title(),
            entities = model.entities().len(),
            flows = model.flows().len(),
            errors = errors.len(),
            "Loaded security model"
        );
        Ok(Loaded { object: model, errors })
    }

    /// Load a single human declaration
    ///
    /// The human is built through the builder, so it is the same object any
    /// later document referring to its ID will get.
    pub fn load_human(&mut self, text: &str, adm_dir: &str, store_location: &str) -> Result<Loaded<Rc<Human>>> {
        let entity = parse_entity(text, "human", |k| *k == EntityKind::Human)?;
        let mut errors = Vec::new();
        self.index_entity(entity.clone(), adm_dir, store_location, &mut errors);

        let human = self.build(&entity.id, "human", &mut errors, |node| node.as_human().cloned())?;

        info!(id = %entity.id, errors = errors.len(), "Loaded human");
        Ok(Loaded { object: human, errors })
    }

    /// Load a single program or system declaration
    pub fn load_program(
        &mut self,
        text: &str,
        adm_dir: &str,
        store_location: &str,
    ) -> Result<Loaded<Rc<Program>>> {
        let entity = parse_entity(text, "program", |k| k.is_program_like())?;
        let mut errors = Vec::new();
        self.index_entity(entity.clone(), adm_dir, store_location, &mut errors);

        let program = self.build(&entity.id, "program", &mut errors, |node| node.as_program().cloned())?;

        info!(id = %entity.id, errors = errors.len(), "Loaded program");
        Ok(Loaded { object: program, errors })
    }

    /// Load a single flow declaration
    pub fn load_flow(&mut self, text: &str, adm_dir: &str, store_location: &str) -> Result<Loaded<Rc<Flow>>> {
        let declaration: shared::Flow = parse(text)?;
        if declaration.id.is_empty() {
            return Err(ModelError::EmptyId);
        }

        let mut errors = Vec::new();
        self.open_store(store_location, &mut errors);
        errors.extend(self.builder.index(declaration.clone(), adm_dir));

        let flow = self.build(&declaration.id, "flow", &mut errors, |node| node.as_flow().cloned())?;

        info!(id = %declaration.id, errors = errors.len(), "Loaded flow");
        Ok(Loaded { object: flow, errors })
    }

    fn index_entity(
        &mut self,
        entity: Entity,
        adm_dir: &str,
        store_location: &str,
        errors: &mut Vec<ModelError>,
    ) {
        self.open_store(store_location, errors);
        errors.extend(self.builder.index(entity, adm_dir));
    }

    /// Resolve a top-level object through the builder's cache
    ///
    /// A rejected identity, or an ID already taken by another kind, fails
    /// the load.
    fn build<T>(
        &mut self,
        id: &str,
        expected: &'static str,
        errors: &mut Vec<ModelError>,
        narrow: impl FnOnce(&Node) -> Option<Rc<T>>,
    ) -> Result<Rc<T>> {
        let (node, build_errors) = self.builder.resolve(id);
        let Some(node) = node else {
            return Err(build_errors
                .into_iter()
                .find(ModelError::is_fatal)
                .unwrap_or_else(|| ModelError::Internal(format!("'{id}' could not be built"))));
        };
        errors.extend(build_errors);

        narrow(&node).ok_or_else(|| ModelError::KindMismatch {
            expected,
            found: node.kind_label().to_string(),
        })
    }

    /// Point the builder at the store for this load
    ///
    /// A store that fails to open is reported and replaced by an empty one.
    fn open_store(&mut self, location: &str, errors: &mut Vec<ModelError>) {
        let location = match (location.is_empty(), self.config.default_store.as_deref()) {
            (false, _) => location,
            (true, Some(fallback)) => fallback,
            (true, None) => "",
        };

        if location.is_empty() {
            debug!("No ADDB configured");
            self.builder.set_store(Addb::empty());
            return;
        }

        match Addb::init_with(location, self.config.store.clone()) {
            Ok(store) => self.builder.set_store(store),
            Err(e) => {
                warn!(location, error = %e, "Cannot open ADDB, continuing without it");
                errors.push(e.into());
                self.builder.set_store(Addb::empty());
            }
        }
    }
}

/// Parse one document; empty text is rejected up front
fn parse<T: DeserializeOwned>(text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Err(ModelError::EmptyContent);
    }
    Ok(serde_yaml::from_str(text)?)
}

/// Parse an entity document and check its kind before anything is indexed
fn parse_entity(
    text: &str,
    expected: &'static str,
    accepts: impl Fn(&EntityKind) -> bool,
) -> Result<Entity> {
    let entity: Entity = parse(text)?;
    if !entity.kind.as_ref().map(accepts).unwrap_or(false) {
        return Err(ModelError::KindMismatch {
            expected,
            found: entity.kind_label(),
        });
    }
    if entity.id.is_empty() {
        return Err(ModelError::EmptyId);
    }
    Ok(entity)
}
