use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::model::package::{PACKAGE_FILE, PackageDescriptor, Section};
use crate::plugin::error::PluginError;
use crate::plugin::installer::{InstallOutcome, PluginInstaller};
use crate::plugin::manifest::{PluginDir, PluginManifest, PluginStatus, safe_relative};
use crate::plugin::remover::{PluginRemover, RemoveReport};
use crate::plugin::routine::{RoutineRegistry, RoutineSlot};

#[derive(Debug, Clone)]
pub struct PluginSummary {
    pub name: String,
    pub status: PluginStatus,
    pub manifest: Option<PluginManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    NotYetAvailable,
    RawCopyFallback,
    Misconfigured(String),
    Ready,
}

#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub manifest: PluginManifest,
    pub config_sources: Vec<ConfigSource>,
    pub readiness: Readiness,
}

/// Differences between what an install writes and what the manifest declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub planned: bool,
    pub undeclared_dev: Vec<String>,
    pub undeclared_prod: Vec<String>,
    pub undeclared_scripts: Vec<String>,
    pub undeclared_files: Vec<String>,
    pub missing_config_sources: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.undeclared_dev.is_empty()
            && self.undeclared_prod.is_empty()
            && self.undeclared_scripts.is_empty()
            && self.undeclared_files.is_empty()
            && self.missing_config_sources.is_empty()
    }
}

#[derive(Debug)]
pub struct PluginManager {
    plugins_root: PathBuf,
    installer: PluginInstaller,
    remover: PluginRemover,
}

impl PluginManager {
    pub fn new(plugins_root: PathBuf) -> Self {
        let routines = RoutineRegistry::discover(&plugins_root);
        Self::with_routines(plugins_root, routines)
    }

    pub fn with_routines(plugins_root: PathBuf, routines: RoutineRegistry) -> Self {
        Self {
            installer: PluginInstaller::new(plugins_root.clone(), routines),
            remover: PluginRemover::new(plugins_root.clone()),
            plugins_root,
        }
    }

    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    pub fn install(&self, name: &str, project_dir: &Path) -> Result<InstallOutcome, PluginError> {
        self.installer.install(name, project_dir)
    }

    pub fn remove(&self, name: &str, project_dir: &Path) -> Result<RemoveReport, PluginError> {
        self.remover.remove(name, project_dir)
    }

    /// Every plugin directory, sorted by name. Unreadable manifests list as
    /// `unknown` instead of failing the listing.
    pub fn list(&self) -> Vec<PluginSummary> {
        let entries = match fs::read_dir(&self.plugins_root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("cannot read {}: {err}", self.plugins_root.display());
                return Vec::new();
            }
        };

        let mut rows: Vec<PluginSummary> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .map(|name| self.summarize(name))
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    pub fn info(&self, name: &str) -> Result<PluginInfo, PluginError> {
        let plugin = PluginDir::resolve(&self.plugins_root, name)?;
        let manifest = PluginManifest::load(&plugin)?;

        let config_sources = manifest
            .config_files
            .iter()
            .map(|entry| ConfigSource {
                path: entry.clone(),
                present: plugin
                    .config_source(entry)
                    .is_some_and(|source| source.exists()),
            })
            .collect();

        let readiness = if manifest.is_planned() {
            Readiness::NotYetAvailable
        } else {
            match self.installer.routines().lookup(name) {
                Some(RoutineSlot::Ready(_)) => Readiness::Ready,
                Some(RoutineSlot::Misconfigured(reason)) => Readiness::Misconfigured(reason.clone()),
                None => Readiness::RawCopyFallback,
            }
        };

        Ok(PluginInfo {
            name: plugin.name,
            manifest,
            config_sources,
            readiness,
        })
    }

    /// Dry-run the install against an empty scratch project and report
    /// anything written that the manifest does not declare.
    pub fn lint(&self, name: &str) -> Result<LintReport, PluginError> {
        let plugin = PluginDir::resolve(&self.plugins_root, name)?;
        let manifest = PluginManifest::load(&plugin)?;

        let mut report = LintReport {
            planned: manifest.is_planned(),
            missing_config_sources: manifest
                .config_files
                .iter()
                .filter(|entry| {
                    !plugin
                        .config_source(entry)
                        .is_some_and(|source| source.exists())
                })
                .cloned()
                .collect(),
            ..LintReport::default()
        };

        if report.planned {
            return Ok(report);
        }

        let scratch =
            tempfile::tempdir().map_err(|err| PluginError::io(std::env::temp_dir(), err))?;
        let package_path = scratch.path().join(PACKAGE_FILE);
        fs::write(&package_path, "{}\n").map_err(|err| PluginError::io(&package_path, err))?;

        self.installer.install(name, scratch.path())?;
        let package = PackageDescriptor::load(scratch.path())?;

        report.undeclared_dev = undeclared(&package, Section::DevDependencies, |key| {
            manifest.dependencies.dev.iter().any(|dep| dep == key)
        });
        report.undeclared_prod = undeclared(&package, Section::Dependencies, |key| {
            manifest.dependencies.prod.iter().any(|dep| dep == key)
        });
        report.undeclared_scripts = undeclared(&package, Section::Scripts, |key| {
            manifest.scripts.contains_key(key)
        });

        let declared_roots: HashSet<String> = manifest
            .config_files
            .iter()
            .filter_map(|entry| first_segment(entry))
            .collect();
        let written = fs::read_dir(scratch.path()).map_err(|err| PluginError::io(scratch.path(), err))?;
        let mut undeclared_files: Vec<String> = written
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|file| file != PACKAGE_FILE && !declared_roots.contains(file))
            .collect();
        undeclared_files.sort();
        report.undeclared_files = undeclared_files;

        Ok(report)
    }

    fn summarize(&self, name: String) -> PluginSummary {
        let manifest = PluginDir::resolve(&self.plugins_root, &name)
            .and_then(|plugin| PluginManifest::load(&plugin));

        match manifest {
            Ok(manifest) => PluginSummary {
                name,
                status: manifest.status,
                manifest: Some(manifest),
            },
            Err(err) => {
                tracing::warn!("plugin {name}: {err}");
                PluginSummary {
                    name,
                    status: PluginStatus::Unknown,
                    manifest: None,
                }
            }
        }
    }
}

fn undeclared(
    package: &PackageDescriptor,
    section: Section,
    declared: impl Fn(&str) -> bool,
) -> Vec<String> {
    package
        .keys(section)
        .into_iter()
        .filter(|key| !declared(key.as_str()))
        .collect()
}

fn first_segment(entry: &str) -> Option<String> {
    safe_relative(entry)?
        .components()
        .find_map(|component| match component {
            Component::Normal(segment) => segment.to_str().map(str::to_string),
            _ => None,
        })
}
