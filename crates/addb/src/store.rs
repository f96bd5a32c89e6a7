//! Addb - File-backed catalog of reusable component declarations
//!
//! The whole location is scanned once when the store is opened. Lookups
//! afterwards only touch the in-memory index.

use crate::component::Component;
use serde::Deserialize;
use shared::{StoreConfig, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// ADDB component store
#[derive(Debug, Default)]
pub struct Addb {
    /// Resolved root of the store
    location: PathBuf,
    /// Component ID -> component
    index: HashMap<String, Component>,
    config: StoreConfig,
}

impl Addb {
    /// Open the store at `location` with the default configuration
    pub fn init(location: &str) -> Result<Self, StoreError> {
        Self::init_with(location, StoreConfig::default())
    }

    /// Open the store at `location`
    ///
    /// A leading `~` is expanded to the user's home directory. The location
    /// may be a directory (scanned recursively) or a single declaration file.
    pub fn init_with(location: &str, config: StoreConfig) -> Result<Self, StoreError> {
        let location = expand_home(location)?;
        if !location.exists() {
            return Err(StoreError::LocationNotFound { path: location });
        }

        let mut store = Self {
            location,
            index: HashMap::new(),
            config,
        };
        store.build_index()?;

        info!(
            location = %store.location.display(),
            components = store.index.len(),
            "ADDB initialized"
        );
        Ok(store)
    }

    /// An empty store with no location; every lookup fails
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a component by ID, with or without the `addb:` prefix
    pub fn get_component(&self, id: &str) -> Result<&Component, StoreError> {
        self.index
            .get(self.config.strip_prefix(id))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Check if a component exists
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(self.config.strip_prefix(id))
    }

    /// Root of the store
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of indexed components
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over all indexed components
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.index.values()
    }

    fn build_index(&mut self) -> Result<(), StoreError> {
        let mut files = Vec::new();
        self.collect_files(&self.location.clone(), &[], &mut files)?;

        for file in files {
            let content = std::fs::read_to_string(&file).map_err(|source| StoreError::Io {
                path: file.clone(),
                source,
            })?;

            for mut component in parse_documents(&content, &file)? {
                if !component.kind.is_known() {
                    return Err(StoreError::UnknownKind {
                        kind: component.kind.to_string(),
                        file,
                    });
                }
                if self.index.contains_key(&component.id) {
                    return Err(StoreError::Duplicate { id: component.id });
                }

                // ADM paths are relative to the declaring file
                let dir = file.parent().unwrap_or_else(|| Path::new(""));
                component.adm = component
                    .adm
                    .iter()
                    .map(|adm| dir.join(adm).to_string_lossy().into_owned())
                    .collect();

                debug!(id = %component.id, kind = %component.kind, file = %file.display(), "Indexed component");
                self.index.insert(component.id.clone(), component);
            }
        }

        Ok(())
    }

    /// Collect declaration files under `path`
    ///
    /// `inherited` holds ignore patterns collected from parent directories.
    fn collect_files(
        &self,
        path: &Path,
        inherited: &[glob::Pattern],
        files: &mut Vec<PathBuf>,
    ) -> Result<(), StoreError> {
        if !path.is_dir() {
            files.push(path.to_path_buf());
            return Ok(());
        }

        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut entries = std::fs::read_dir(path)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(io_err)?;
        entries.sort();

        let mut ignore = inherited.to_vec();
        let ignore_file = path.join(&self.config.ignore_file);
        if ignore_file.is_file() {
            let content = std::fs::read_to_string(&ignore_file).map_err(|source| StoreError::Io {
                path: ignore_file.clone(),
                source,
            })?;
            ignore.extend(parse_ignore_list(&content));
        }

        for entry in entries {
            let name = match entry.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            if name == self.config.ignore_file || ignore.iter().any(|p| p.matches(name)) {
                continue;
            }

            if entry.is_dir() {
                if self.config.skip_dirs.iter().any(|d| d == name) {
                    continue;
                }
                // Linked directories may loop back into the store
                if is_symlink(&entry) {
                    debug!(path = %entry.display(), "Skipping symlinked directory");
                    continue;
                }
                self.collect_files(&entry, &ignore, files)?;
            } else if entry.extension().and_then(|e| e.to_str()) == Some(self.config.extension.as_str()) {
                files.push(entry);
            }
        }

        Ok(())
    }
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Parse a stream of YAML documents into components
fn parse_documents(content: &str, file: &Path) -> Result<Vec<Component>, StoreError> {
    let mut components = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let component = Option::<Component>::deserialize(document).map_err(|source| StoreError::Yaml {
            file: file.to_path_buf(),
            source,
        })?;
        // Empty documents (a bare `---`) carry nothing
        if let Some(component) = component {
            components.push(component);
        }
    }
    Ok(components)
}

/// Parse an ignore file into name patterns
fn parse_ignore_list(content: &str) -> Vec<glob::Pattern> {
    content
        .lines()
        .map(|line| line.trim().trim_end_matches('/'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            glob::Pattern::new(line)
                .or_else(|_| glob::Pattern::new(&glob::Pattern::escape(line)))
                .ok()
        })
        .collect()
}

/// Expand a leading `~` and drop trailing slashes
fn expand_home(location: &str) -> Result<PathBuf, StoreError> {
    let trimmed = if location.len() > 1 {
        location.trim_end_matches('/')
    } else {
        location
    };

    match trimmed.strip_prefix('~') {
        Some(rest) => {
            let dirs = directories::BaseDirs::new().ok_or(StoreError::HomeDirUnavailable)?;
            let rest = rest.trim_start_matches('/');
            Ok(dirs.home_dir().join(rest))
        }
        None => Ok(PathBuf::from(trimmed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_store() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "generic/browser.smspec",
            r#"id: generic.browser
name: Generic Web Browser
type: program
description: Any web browser
languages: [addb:generic.javascript]
adm: [browser.adm]
---
id: generic.javascript
name: JavaScript
type: program
description: JavaScript runtime
"#,
        );
        write(
            dir.path(),
            "flows/https.smspec",
            r#"id: generic.https
name: HTTPS
type: flow
description: HTTP on top of TLS
protocol: [addb:generic.tls]
---
id: generic.tls
name: TLS
type: flow
description: Transport layer security
"#,
        );
        write(dir.path(), "README.md", "not a declaration");
        dir
    }

    // ============== Initialization Tests ==============

    #[test]
    fn test_init_indexes_multi_document_files() {
        let dir = sample_store();
        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(store.len(), 4);
        assert!(store.contains("generic.browser"));
        assert!(store.contains("addb:generic.tls"));
        assert_eq!(
            store.get_component("generic.https").unwrap().kind,
            ComponentKind::Flow
        );
    }

    #[test]
    fn test_init_missing_location() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = Addb::init(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::LocationNotFound { .. }));
    }

    #[test]
    fn test_init_single_file() {
        let dir = sample_store();
        let file = dir.path().join("flows/https.smspec");
        let store = Addb::init(file.to_str().unwrap()).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_trailing_slash_is_accepted() {
        let dir = sample_store();
        let location = format!("{}/", dir.path().display());
        let store = Addb::init(&location).unwrap();
        assert_eq!(store.location(), dir.path());
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.smspec", "id: dup\nname: A\ntype: human\ndescription: a\n");
        write(dir.path(), "b/b.smspec", "id: dup\nname: B\ntype: human\ndescription: b\n");

        let err = Addb::init(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref id } if id == "dup"));
    }

    #[test]
    fn test_unknown_kind_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "role.smspec", "id: admin\nname: Admin\ntype: role\ndescription: a\n");

        let err = Addb::init(dir.path().to_str().unwrap()).unwrap_err();
        match err {
            StoreError::UnknownKind { kind, file } => {
                assert_eq!(kind, "role");
                assert!(file.ends_with("role.smspec"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_yaml_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.smspec", "id: [unterminated\n");

        let err = Addb::init(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::Yaml { .. }));
    }

    #[test]
    fn test_empty_documents_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a.smspec",
            "---\nid: a\nname: A\ntype: human\ndescription: a\n---\n",
        );

        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(store.len(), 1);
    }

    // ============== Traversal Tests ==============

    #[test]
    fn test_git_dir_and_ignored_names_are_skipped() {
        let dir = sample_store();
        write(dir.path(), ".git/hidden.smspec", "id: hidden\nname: H\ntype: human\ndescription: h\n");
        write(dir.path(), "old/stale.smspec", "id: stale\nname: S\ntype: human\ndescription: s\n");
        write(dir.path(), "scratch.smspec", "id: scratch\nname: S\ntype: human\ndescription: s\n");
        write(dir.path(), "backup.bak.smspec", "id: backup\nname: B\ntype: human\ndescription: b\n");
        write(dir.path(), ".gitignore", "# local junk\nold/\nscratch.smspec\n*.bak.smspec\n");

        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();
        assert!(!store.contains("hidden"));
        assert!(!store.contains("stale"));
        assert!(!store.contains("scratch"));
        assert!(!store.contains("backup"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_ignore_list_applies_to_subdirectories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "draft.smspec\n");
        write(dir.path(), "nested/draft.smspec", "id: draft\nname: D\ntype: human\ndescription: d\n");
        write(dir.path(), "nested/final.smspec", "id: final\nname: F\ntype: human\ndescription: f\n");

        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();
        assert!(store.contains("final"));
        assert!(!store.contains("draft"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "nested/web.smspec", "id: web\nname: W\ntype: program\ndescription: w\n");
        // A link back to the root would recurse forever if followed
        std::os::unix::fs::symlink(dir.path(), dir.path().join("nested/loop")).unwrap();

        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("web"));
    }

    // ============== Lookup Tests ==============

    #[test]
    fn test_adm_paths_are_relative_to_declaring_file() {
        let dir = sample_store();
        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();

        let browser = store.get_component("addb:generic.browser").unwrap();
        let expected = dir.path().join("generic").join("browser.adm");
        assert_eq!(browser.adm, vec![expected.to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_get_component_not_found() {
        let dir = sample_store();
        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();

        let err = store.get_component("addb:generic.missing").unwrap_err();
        assert!(err.to_string().contains("addb:generic.missing"));
    }

    #[test]
    fn test_lookup_returns_indexed_record() {
        let dir = sample_store();
        let store = Addb::init(dir.path().to_str().unwrap()).unwrap();

        // Removing the file must not matter once indexed
        fs::remove_dir_all(dir.path().join("generic")).unwrap();
        let first = store.get_component("generic.browser").unwrap() as *const Component;
        let second = store.get_component("addb:generic.browser").unwrap() as *const Component;
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_store() {
        let store = Addb::empty();
        assert!(store.is_empty());
        assert!(store.get_component("anything").is_err());
    }

    #[test]
    fn test_expand_home() {
        let plain = expand_home("/tmp/addb/").unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/addb"));

        if let Some(dirs) = directories::BaseDirs::new() {
            assert_eq!(expand_home("~/addb").unwrap(), dirs.home_dir().join("addb"));
        }
    }
}
