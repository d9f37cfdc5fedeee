use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::plugin::manifest::{PluginDir, PluginManifest};
use crate::plugin::merge::MergeRoutine;

/// Marks a plugin as carrying its own install routine.
pub const ROUTINE_FILE: &str = "install.toml";
/// Script routines cannot be run here; a plugin shipping one needs an
/// `install.toml` naming a registered routine instead.
pub const SCRIPT_ROUTINE_FILE: &str = "install.js";

pub struct RoutineContext<'a> {
    pub plugin: &'a PluginDir,
    pub manifest: &'a PluginManifest,
    pub project_dir: &'a Path,
}

/// A plugin-specific installation step run against a target project.
///
/// Routines are expected to merge only what the plugin's manifest declares
/// so that removal can undo them.
pub trait InstallRoutine: fmt::Debug {
    fn apply(&self, ctx: &RoutineContext<'_>) -> anyhow::Result<()>;
}

pub type RoutineFactory = fn(&toml::Table) -> Result<Box<dyn InstallRoutine>, String>;

#[derive(Debug)]
pub enum RoutineSlot {
    Ready(Box<dyn InstallRoutine>),
    Misconfigured(String),
}

#[derive(Debug, Deserialize)]
struct RoutineDescriptor {
    #[serde(default)]
    entry: Option<String>,
    #[serde(flatten)]
    params: toml::Table,
}

/// Lookup table from plugin name to its install routine, built once per
/// invocation from the plugins root.
#[derive(Default)]
pub struct RoutineRegistry {
    kinds: HashMap<&'static str, RoutineFactory>,
    plugins: HashMap<String, RoutineSlot>,
}

impl fmt::Debug for RoutineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.kinds.keys().collect();
        kinds.sort();
        f.debug_struct("RoutineRegistry")
            .field("kinds", &kinds)
            .field("plugins", &self.plugins)
            .finish()
    }
}

impl RoutineRegistry {
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register_kind(MergeRoutine::KIND, MergeRoutine::from_params);
        registry
    }

    /// Built-in kinds plus every `install.toml` found under `plugins_root`.
    pub fn discover(plugins_root: &Path) -> Self {
        let mut registry = Self::with_builtin();
        registry.scan(plugins_root);
        registry
    }

    pub fn register_kind(&mut self, kind: &'static str, factory: RoutineFactory) {
        self.kinds.insert(kind, factory);
    }

    /// Bind a routine object to a plugin directly, replacing any descriptor.
    #[cfg(test)]
    pub fn register(&mut self, plugin: impl Into<String>, routine: Box<dyn InstallRoutine>) {
        self.plugins.insert(plugin.into(), RoutineSlot::Ready(routine));
    }

    pub fn lookup(&self, plugin: &str) -> Option<&RoutineSlot> {
        self.plugins.get(plugin)
    }

    pub fn scan(&mut self, plugins_root: &Path) {
        let entries = match fs::read_dir(plugins_root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("no plugins scanned in {}: {err}", plugins_root.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let descriptor = dir.join(ROUTINE_FILE);
            let script = dir.join(SCRIPT_ROUTINE_FILE);
            let slot = if descriptor.is_file() {
                self.resolve_descriptor(&descriptor)
            } else if script.is_file() {
                RoutineSlot::Misconfigured(format!(
                    "{} is a script routine; add an {ROUTINE_FILE} naming a registered routine",
                    script.display()
                ))
            } else {
                continue;
            };
            if let RoutineSlot::Misconfigured(reason) = &slot {
                tracing::warn!("plugin {name}: {reason}");
            }
            self.plugins.insert(name, slot);
        }
    }

    fn resolve_descriptor(&self, path: &Path) -> RoutineSlot {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => return RoutineSlot::Misconfigured(format!("{}: {err}", path.display())),
        };

        let descriptor: RoutineDescriptor = match toml::from_str(&raw) {
            Ok(descriptor) => descriptor,
            Err(err) => return RoutineSlot::Misconfigured(format!("{}: {err}", path.display())),
        };

        let Some(kind) = descriptor.entry else {
            return RoutineSlot::Misconfigured(format!("{} has no `entry`", path.display()));
        };

        let Some(factory) = self.kinds.get(kind.as_str()) else {
            return RoutineSlot::Misconfigured(format!(
                "{} names unknown routine `{kind}`",
                path.display()
            ));
        };

        match factory(&descriptor.params) {
            Ok(routine) => RoutineSlot::Ready(routine),
            Err(reason) => RoutineSlot::Misconfigured(format!("{}: {reason}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plugin_with_descriptor(root: &Path, name: &str, descriptor: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ROUTINE_FILE), descriptor).unwrap();
    }

    #[test]
    fn discovers_builtin_routine() {
        let root = TempDir::new().unwrap();
        plugin_with_descriptor(root.path(), "adp", "entry = \"manifest-merge\"\n");
        fs::create_dir_all(root.path().join("plain")).unwrap();

        let registry = RoutineRegistry::discover(root.path());

        assert!(matches!(registry.lookup("adp"), Some(RoutineSlot::Ready(_))));
        assert!(registry.lookup("plain").is_none());
    }

    #[test]
    fn descriptor_problems_are_misconfigured() {
        let root = TempDir::new().unwrap();
        plugin_with_descriptor(root.path(), "no-entry", "dev_spec = \"1\"\n");
        plugin_with_descriptor(root.path(), "unknown", "entry = \"node-script\"\n");
        plugin_with_descriptor(root.path(), "broken", "entry = [\n");
        plugin_with_descriptor(
            root.path(),
            "bad-params",
            "entry = \"manifest-merge\"\npeer_as_dev = \"svelte\"\n",
        );

        let registry = RoutineRegistry::discover(root.path());

        for name in ["no-entry", "unknown", "broken", "bad-params"] {
            assert!(
                matches!(registry.lookup(name), Some(RoutineSlot::Misconfigured(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn script_routine_without_descriptor_is_misconfigured() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("legacy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCRIPT_ROUTINE_FILE), "module.exports = () => {}\n").unwrap();
        plugin_with_descriptor(root.path(), "both", "entry = \"manifest-merge\"\n");
        fs::write(root.path().join("both").join(SCRIPT_ROUTINE_FILE), "").unwrap();

        let registry = RoutineRegistry::discover(root.path());

        match registry.lookup("legacy") {
            Some(RoutineSlot::Misconfigured(reason)) => assert!(reason.contains(ROUTINE_FILE)),
            other => panic!("unexpected slot: {other:?}"),
        }
        assert!(matches!(registry.lookup("both"), Some(RoutineSlot::Ready(_))));
    }

    #[test]
    fn missing_root_yields_empty_registry() {
        let root = TempDir::new().unwrap();
        let registry = RoutineRegistry::discover(&root.path().join("absent"));
        assert!(registry.lookup("anything").is_none());
    }
}
