use std::path::{Path, PathBuf};

use crate::model::package::PackageDescriptor;
use crate::plugin::error::PluginError;
use crate::plugin::manifest::{PluginDir, PluginManifest};
use crate::plugin::routine::{RoutineContext, RoutineRegistry, RoutineSlot};
use crate::template::{Bindings, materialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    /// The plugin's registered routine merged it in.
    Routine,
    /// No routine: the plugin directory was copied into the project.
    RawCopy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    PlannedNotAvailable { notes: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstallMethod),
    Skipped(SkipReason),
}

#[derive(Debug)]
pub struct PluginInstaller {
    plugins_root: PathBuf,
    routines: RoutineRegistry,
}

impl PluginInstaller {
    pub fn new(plugins_root: PathBuf, routines: RoutineRegistry) -> Self {
        Self {
            plugins_root,
            routines,
        }
    }

    pub fn routines(&self) -> &RoutineRegistry {
        &self.routines
    }

    pub fn install(&self, name: &str, project_dir: &Path) -> Result<InstallOutcome, PluginError> {
        let plugin = PluginDir::resolve(&self.plugins_root, name)?;
        let manifest = PluginManifest::load(&plugin)?;

        if manifest.is_planned() {
            tracing::info!("plugin {name} is planned; not installing");
            return Ok(InstallOutcome::Skipped(SkipReason::PlannedNotAvailable {
                notes: manifest.notes.clone(),
            }));
        }

        if !PackageDescriptor::exists_in(project_dir) {
            return Err(PluginError::PackageDescriptorMissing {
                path: PackageDescriptor::path_in(project_dir),
            });
        }

        match self.routines.lookup(name) {
            Some(RoutineSlot::Ready(routine)) => {
                tracing::info!("installing plugin {name} into {}", project_dir.display());
                let ctx = RoutineContext {
                    plugin: &plugin,
                    manifest: &manifest,
                    project_dir,
                };
                routine
                    .apply(&ctx)
                    .map_err(|err| PluginError::InstallRoutineFailed {
                        plugin: name.to_string(),
                        message: format!("{err:#}"),
                        trace: format!("{err:?}"),
                    })?;
                Ok(InstallOutcome::Installed(InstallMethod::Routine))
            }
            Some(RoutineSlot::Misconfigured(reason)) => Err(PluginError::NoInstallRoutine {
                plugin: name.to_string(),
                reason: reason.clone(),
            }),
            None => {
                tracing::info!(
                    "plugin {name} has no install routine; copying {} into {}",
                    plugin.path.display(),
                    project_dir.display()
                );
                materialize(&plugin.path, project_dir, &Bindings::new())?;
                Ok(InstallOutcome::Installed(InstallMethod::RawCopy))
            }
        }
    }
}
