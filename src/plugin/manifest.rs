use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::plugin::error::{DocumentRole, PluginError};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CONFIG_DIR: &str = "config";

/// A plugin's directory under the plugins root, named after the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDir {
    pub name: String,
    pub path: PathBuf,
}

impl PluginDir {
    pub fn resolve(plugins_root: &Path, name: &str) -> Result<Self, PluginError> {
        let not_found = || PluginError::PluginNotFound {
            name: name.to_string(),
            root: plugins_root.to_path_buf(),
        };

        // A plugin name is a single path segment.
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(not_found()),
        }

        let path = plugins_root.join(name);
        if !path.is_dir() {
            return Err(not_found());
        }

        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path.join(CONFIG_DIR)
    }

    /// Where the literal contents of a declared config file live.
    pub fn config_source(&self, entry: &str) -> Option<PathBuf> {
        safe_relative(entry).map(|rel| self.config_dir().join(rel))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    #[default]
    Available,
    Planned,
    #[serde(other)]
    Unknown,
}

impl PluginStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PluginStatus::Available => "available",
            PluginStatus::Planned => "planned",
            PluginStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DependencySet {
    #[serde(default)]
    pub dev: Vec<String>,
    #[serde(default)]
    pub prod: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: PluginStatus,
    #[serde(default)]
    pub dependencies: DependencySet,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    /// In manifest order, which is the order they land in `package.json`.
    #[serde(default)]
    pub scripts: IndexMap<String, String>,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl PluginManifest {
    pub fn load(plugin: &PluginDir) -> Result<Self, PluginError> {
        let path = plugin.manifest_path();
        if !path.is_file() {
            return Err(PluginError::ManifestNotFound {
                name: plugin.name.clone(),
                path,
            });
        }

        let raw = fs::read_to_string(&path).map_err(|err| PluginError::io(&path, err))?;
        let mut manifest: PluginManifest =
            serde_json::from_str(&raw).map_err(|source| PluginError::Malformed {
                role: DocumentRole::PluginManifest,
                path: path.clone(),
                source,
            })?;

        manifest.dedupe(&plugin.name);
        Ok(manifest)
    }

    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }

    pub fn is_planned(&self) -> bool {
        self.status == PluginStatus::Planned
    }

    fn dedupe(&mut self, plugin: &str) {
        for (label, list) in [
            ("dev dependency", &mut self.dependencies.dev),
            ("dependency", &mut self.dependencies.prod),
            ("config file", &mut self.config_files),
        ] {
            let mut seen = HashSet::new();
            list.retain(|entry| {
                let fresh = seen.insert(entry.clone());
                if !fresh {
                    tracing::warn!("plugin {plugin}: duplicate {label} `{entry}` ignored");
                }
                fresh
            });
        }
    }
}

/// `entry` as a path that stays inside whatever root it is joined to.
pub fn safe_relative(entry: &str) -> Option<&Path> {
    let path = Path::new(entry);
    let mut has_normal = false;

    for component in path.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            _ => return None,
        }
    }

    has_normal.then_some(path)
}
