//! The built-in `manifest-merge` install routine.
//!
//! Merges a plugin's declared dependencies and scripts into the target
//! `package.json` and copies its declared config files from `config/`.
//! Parameters come from the plugin's `install.toml`:
//!
//! ```toml
//! entry = "manifest-merge"
//! dev_spec = "github:plures/adp"   # default "^{{VERSION}}"
//! prod_spec = "^{{VERSION}}"
//! peer_as_dev = ["svelte"]
//! config_files = [".adp-config.json"] # defaults to the manifest's configFiles
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::model::package::{PackageDescriptor, Section};
use crate::plugin::manifest::{PluginManifest, safe_relative};
use crate::plugin::routine::{InstallRoutine, RoutineContext};
use crate::template::{Bindings, materialize, substitute};

const DEFAULT_SPEC: &str = "^{{VERSION}}";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeParams {
    #[serde(default = "default_spec")]
    pub dev_spec: String,
    #[serde(default = "default_spec")]
    pub prod_spec: String,
    #[serde(default)]
    pub peer_as_dev: Vec<String>,
    #[serde(default)]
    pub config_files: Option<Vec<String>>,
}

fn default_spec() -> String {
    DEFAULT_SPEC.to_string()
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            dev_spec: default_spec(),
            prod_spec: default_spec(),
            peer_as_dev: Vec::new(),
            config_files: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeRoutine {
    params: MergeParams,
}

impl MergeRoutine {
    pub const KIND: &'static str = "manifest-merge";

    pub fn new(params: MergeParams) -> Self {
        Self { params }
    }

    pub fn from_params(params: &toml::Table) -> Result<Box<dyn InstallRoutine>, String> {
        let params: MergeParams = toml::Value::Table(params.clone())
            .try_into()
            .map_err(|err: toml::de::Error| err.to_string())?;
        Ok(Box::new(Self::new(params)))
    }

    fn render_spec(
        template: &str,
        manifest: &PluginManifest,
        plugin: &str,
    ) -> anyhow::Result<String> {
        let mut bindings = Bindings::new();
        bindings.insert("NAME".to_string(), manifest.display_name(plugin).to_string());
        if let Some(version) = &manifest.version {
            bindings.insert("VERSION".to_string(), version.clone());
        } else if template.contains("{{VERSION}}") {
            bail!("manifest declares no version for dependency spec `{template}`");
        }

        Ok(substitute(template, &bindings))
    }

    fn copy_config(ctx: &RoutineContext<'_>, entry: &str) -> anyhow::Result<()> {
        let Some(relative) = safe_relative(entry) else {
            tracing::warn!("plugin {}: refusing config path `{entry}`", ctx.plugin.name);
            return Ok(());
        };

        let source = ctx.plugin.config_dir().join(relative);
        if !source.exists() {
            tracing::debug!("plugin {}: no config source for {entry}", ctx.plugin.name);
            return Ok(());
        }

        let dest = ctx.project_dir.join(relative);
        if source.is_dir() {
            materialize(&source, &dest, &Bindings::new())?;
        } else {
            copy_file(&source, &dest)?;
        }
        tracing::debug!("plugin {}: copied {entry}", ctx.plugin.name);
        Ok(())
    }
}

impl InstallRoutine for MergeRoutine {
    fn apply(&self, ctx: &RoutineContext<'_>) -> anyhow::Result<()> {
        let manifest = ctx.manifest;
        let plugin = ctx.plugin.name.as_str();
        let mut package = PackageDescriptor::load(ctx.project_dir)?;

        if !manifest.dependencies.dev.is_empty() {
            let spec = Self::render_spec(&self.params.dev_spec, manifest, plugin)?;
            for dep in &manifest.dependencies.dev {
                package.insert(Section::DevDependencies, dep, spec.clone());
            }
        }

        if !manifest.dependencies.prod.is_empty() {
            let spec = Self::render_spec(&self.params.prod_spec, manifest, plugin)?;
            for dep in &manifest.dependencies.prod {
                package.insert(Section::Dependencies, dep, spec.clone());
            }
        }

        for peer in &self.params.peer_as_dev {
            let Some(range) = manifest.peer_dependencies.get(peer) else {
                tracing::warn!("plugin {plugin}: peer dependency `{peer}` is not declared");
                continue;
            };
            if !package.contains(Section::DevDependencies, peer)
                && !package.contains(Section::Dependencies, peer)
            {
                package.insert(Section::DevDependencies, peer, range.clone());
            }
        }

        for (name, command) in &manifest.scripts {
            package.insert(Section::Scripts, name, command.clone());
        }

        package.save()?;

        let config_files = self
            .params
            .config_files
            .as_ref()
            .unwrap_or(&manifest.config_files);
        for entry in config_files {
            Self::copy_config(ctx, entry)?;
        }

        Ok(())
    }
}

fn copy_file(source: &Path, dest: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::copy(source, dest)
        .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
    Ok(())
}
