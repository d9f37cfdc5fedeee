use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::plugin::error::{DocumentRole, PluginError};

pub const PACKAGE_FILE: &str = "package.json";

/// The three mappings of a package descriptor that plugins touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dependencies,
    DevDependencies,
    Scripts,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Dependencies => "dependencies",
            Section::DevDependencies => "devDependencies",
            Section::Scripts => "scripts",
        }
    }
}

/// A project's `package.json`, kept as an ordered JSON object so keys the
/// plugin system does not own survive a rewrite untouched.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    path: PathBuf,
    root: Map<String, Value>,
}

impl PackageDescriptor {
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(PACKAGE_FILE)
    }

    pub fn exists_in(project_dir: &Path) -> bool {
        Self::path_in(project_dir).is_file()
    }

    pub fn load(project_dir: &Path) -> Result<Self, PluginError> {
        let path = Self::path_in(project_dir);
        if !path.is_file() {
            return Err(PluginError::PackageDescriptorMissing { path });
        }

        let raw = fs::read_to_string(&path).map_err(|err| PluginError::io(&path, err))?;
        Self::parse(path, &raw)
    }

    fn parse(path: PathBuf, raw: &str) -> Result<Self, PluginError> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(source) => {
                return Err(PluginError::Malformed {
                    role: DocumentRole::PackageDescriptor,
                    path,
                    source,
                });
            }
        };

        match value {
            Value::Object(root) => Ok(Self { path, root }),
            _ => Err(PluginError::Malformed {
                role: DocumentRole::PackageDescriptor,
                path,
                source: serde::de::Error::custom("expected a JSON object at the top level"),
            }),
        }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn contains(&self, section: Section, key: &str) -> bool {
        self.section(section)
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    pub fn get(&self, section: Section, key: &str) -> Option<&str> {
        self.section(section)?.get(key)?.as_str()
    }

    pub fn keys(&self, section: Section) -> Vec<String> {
        self.section(section)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Set `key` in `section`, creating the section on first write.
    /// An existing key is overwritten in place.
    pub fn insert(&mut self, section: Section, key: &str, value: impl Into<String>) {
        self.section_mut(section)
            .insert(key.to_string(), Value::String(value.into()));
    }

    /// Delete `key` from `section`. Never creates the section.
    pub fn remove(&mut self, section: Section, key: &str) -> bool {
        match self.root.get_mut(section.key()) {
            Some(Value::Object(map)) => map.shift_remove(key).is_some(),
            _ => false,
        }
    }

    /// Drop `section` if it is an empty mapping. Returns whether it was dropped.
    pub fn prune_if_empty(&mut self, section: Section) -> bool {
        let empty = self.section(section).is_some_and(|map| map.is_empty());
        if empty {
            self.root.shift_remove(section.key());
        }
        empty
    }

    /// Write back with 2-space indentation and a trailing newline.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// original.
    pub fn save(&self) -> Result<(), PluginError> {
        let mut body = serde_json::to_string_pretty(&self.root)
            .map_err(|err| PluginError::io(&self.path, io::Error::other(err)))?;
        body.push('\n');

        write_atomic(&self.path, body.as_bytes()).map_err(|err| PluginError::io(&self.path, err))?;
        tracing::debug!("wrote {}", self.path.display());
        Ok(())
    }

    fn section(&self, section: Section) -> Option<&Map<String, Value>> {
        self.root.get(section.key())?.as_object()
    }

    fn section_mut(&mut self, section: Section) -> &mut Map<String, Value> {
        let slot = self
            .root
            .entry(section.key())
            .or_insert_with(|| Value::Object(Map::new()));

        if !slot.is_object() {
            tracing::warn!(
                "{}: replacing non-object `{}` with an empty mapping",
                self.path.display(),
                section.key()
            );
            *slot = Value::Object(Map::new());
        }

        match slot {
            Value::Object(map) => map,
            _ => unreachable!("section was just replaced with an object"),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }

    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::error::ErrorKind;
    use tempfile::TempDir;

    fn project(raw: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PACKAGE_FILE), raw).unwrap();
        dir
    }

    #[test]
    fn missing_descriptor_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = PackageDescriptor::load(dir.path()).unwrap_err();

        assert!(matches!(err, PluginError::PackageDescriptorMissing { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = project("{ \"name\": ");
        let err = PackageDescriptor::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let dir = project("[1, 2]");
        let err = PackageDescriptor::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn sections_are_created_lazily() {
        let dir = project("{\"name\": \"demo\"}");
        let mut package = PackageDescriptor::load(dir.path()).unwrap();

        assert!(!package.remove(Section::Scripts, "lint"));
        assert!(!package.root().contains_key("scripts"));

        package.insert(Section::Scripts, "lint", "eslint .");
        assert_eq!(package.get(Section::Scripts, "lint"), Some("eslint ."));
    }

    #[test]
    fn save_preserves_unrelated_keys_and_order() {
        let dir = project(
            "{\n  \"name\": \"demo\",\n  \"private\": true,\n  \"dependencies\": {\n    \"a\": \"1\"\n  }\n}\n",
        );
        let mut package = PackageDescriptor::load(dir.path()).unwrap();
        package.insert(Section::Dependencies, "b", "^2.0.0");
        package.save().unwrap();

        let written = fs::read_to_string(dir.path().join(PACKAGE_FILE)).unwrap();
        assert_eq!(
            written,
            "{\n  \"name\": \"demo\",\n  \"private\": true,\n  \"dependencies\": {\n    \"a\": \"1\",\n    \"b\": \"^2.0.0\"\n  }\n}\n"
        );
    }

    #[test]
    fn only_empty_sections_are_pruned() {
        let dir = project(r#"{"name": "demo", "scripts": {}, "dependencies": {"a": "1"}}"#);
        let mut package = PackageDescriptor::load(dir.path()).unwrap();

        assert!(package.prune_if_empty(Section::Scripts));
        assert!(!package.prune_if_empty(Section::Dependencies));
        assert!(!package.prune_if_empty(Section::DevDependencies));

        let keys: Vec<_> = package.root().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "dependencies"]);
    }

    #[test]
    fn non_object_section_is_replaced_on_write() {
        let dir = project("{\"scripts\": [\"oops\"]}");
        let mut package = PackageDescriptor::load(dir.path()).unwrap();

        assert!(!package.contains(Section::Scripts, "oops"));
        package.insert(Section::Scripts, "dev", "vite");
        assert_eq!(package.keys(Section::Scripts), vec!["dev".to_string()]);
    }
}
