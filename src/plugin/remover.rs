use std::fs;
use std::path::{Path, PathBuf};

use crate::model::package::{PackageDescriptor, Section};
use crate::plugin::error::PluginError;
use crate::plugin::manifest::{PluginDir, PluginManifest, safe_relative};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// What a removal changed. Descriptor and file counts are independent: a
/// plugin that was never merged can still leave config files behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    pub removed_dev: Vec<String>,
    pub removed_prod: Vec<String>,
    pub removed_scripts: Vec<String>,
    pub removed_files: Vec<String>,
    pub failed_files: Vec<FileFailure>,
    /// How many config files the manifest declares.
    pub declared_files: usize,
    pub descriptor_written: bool,
}

impl RemoveReport {
    pub fn removed_deps(&self) -> usize {
        self.removed_dev.len() + self.removed_prod.len()
    }

    pub fn removed_script_count(&self) -> usize {
        self.removed_scripts.len()
    }

    pub fn removed_file_count(&self) -> usize {
        self.removed_files.len()
    }

    pub fn descriptor_changed(&self) -> bool {
        self.removed_deps() + self.removed_script_count() > 0
    }
}

/// Undoes a plugin's manifest-declared merge. It only looks at what the
/// manifest declares, not at what an install routine actually wrote.
#[derive(Debug, Clone)]
pub struct PluginRemover {
    plugins_root: PathBuf,
}

impl PluginRemover {
    pub fn new(plugins_root: PathBuf) -> Self {
        Self { plugins_root }
    }

    pub fn remove(&self, name: &str, project_dir: &Path) -> Result<RemoveReport, PluginError> {
        let plugin = PluginDir::resolve(&self.plugins_root, name)?;
        let manifest = PluginManifest::load(&plugin)?;
        let mut package = PackageDescriptor::load(project_dir)?;

        tracing::info!("removing plugin {name} from {}", project_dir.display());
        let mut report = RemoveReport::default();

        for dep in &manifest.dependencies.dev {
            if package.remove(Section::DevDependencies, dep) {
                tracing::debug!("removed dev dependency {dep}");
                report.removed_dev.push(dep.clone());
            }
        }

        for dep in &manifest.dependencies.prod {
            if package.remove(Section::Dependencies, dep) {
                tracing::debug!("removed dependency {dep}");
                report.removed_prod.push(dep.clone());
            }
        }

        for script in manifest.scripts.keys() {
            if package.remove(Section::Scripts, script) {
                tracing::debug!("removed script {script}");
                report.removed_scripts.push(script.clone());
            }
        }

        // Sections this removal emptied go away with their last key.
        for (section, removed) in [
            (Section::DevDependencies, &report.removed_dev),
            (Section::Dependencies, &report.removed_prod),
            (Section::Scripts, &report.removed_scripts),
        ] {
            if !removed.is_empty() && package.prune_if_empty(section) {
                tracing::debug!("dropped empty `{}`", section.key());
            }
        }

        if report.descriptor_changed() {
            package.save()?;
            report.descriptor_written = true;
        }

        report.declared_files = manifest.config_files.len();
        for entry in &manifest.config_files {
            remove_config_file(project_dir, entry, &mut report);
        }

        Ok(report)
    }
}

fn remove_config_file(project_dir: &Path, entry: &str, report: &mut RemoveReport) {
    let Some(relative) = safe_relative(entry) else {
        tracing::warn!("refusing to remove `{entry}`: outside the project root");
        report.failed_files.push(FileFailure {
            path: entry.to_string(),
            reason: "path escapes the project root".to_string(),
        });
        return;
    };

    let path = project_dir.join(relative);
    let Ok(metadata) = fs::symlink_metadata(&path) else {
        return;
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };

    match result {
        Ok(()) => {
            tracing::debug!("removed {}", path.display());
            report.removed_files.push(entry.to_string());
        }
        Err(err) => {
            tracing::warn!("failed to remove {}: {err}", path.display());
            report.failed_files.push(FileFailure {
                path: entry.to_string(),
                reason: err.to_string(),
            });
        }
    }
}
