use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    pub plugins_root: String,
    pub template_root: String,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapConfig {
    pub seed_gitignore: bool,
    pub gitignore: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

/// Filesystem roots the core components are built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub plugins_root: PathBuf,
    pub template_root: PathBuf,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config → explicit file.
    ///
    /// Later layers only override the keys they set.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut table = Self::defaults()?;

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                merge_tables(&mut table, read_table(&user_path)?);
            }
        }

        if let Some(path) = explicit {
            merge_tables(&mut table, read_table(path)?);
        }

        let config: AppConfig = toml::Value::Table(table)
            .try_into()
            .context("invalid scaffold configuration")?;
        Ok(config)
    }

    fn defaults() -> Result<toml::Table> {
        let defaults = include_str!("../../config/default.toml");
        Ok(toml::from_str(defaults)?)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "scaffold")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve the plugins and template roots.
    ///
    /// Precedence: explicit override, then the configured path, then the
    /// directory next to the installed binary.
    pub fn resolve_paths(
        &self,
        plugins_override: Option<PathBuf>,
        template_override: Option<PathBuf>,
    ) -> Result<ResolvedPaths> {
        let plugins_root = match plugins_override {
            Some(path) => path,
            None => resolve_configured(&self.paths.plugins_root, "plugins")?,
        };
        let template_root = match template_override {
            Some(path) => path,
            None => resolve_configured(&self.paths.template_root, "template")?,
        };

        Ok(ResolvedPaths {
            plugins_root,
            template_root,
        })
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn resolve_configured(configured: &str, default_dir: &str) -> Result<PathBuf> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return expand_tilde(configured);
    }

    Ok(install_base()?.join(default_dir))
}

fn install_base() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the scaffold executable")?;
    let exe_dir = exe
        .parent()
        .ok_or_else(|| anyhow!("executable {} has no parent directory", exe.display()))?;

    Ok(exe_dir.parent().unwrap_or(exe_dir).to_path_buf())
}

fn expand_tilde(path: &str) -> Result<PathBuf> {
    if !path.starts_with('~') {
        return Ok(PathBuf::from(path));
    }

    let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1)))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
