use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::template::TemplateError;

pub const TEMPLATE_CONFIG_DIR: &str = "config";
pub const TEMPLATE_MANIFEST_FILE: &str = "manifest.json";
pub const PLACEHOLDERS_FILE: &str = "placeholders.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateManifest {
    #[serde(default)]
    pub plugins: PluginSelection,
}

/// Plugins installed into every new project, and the ones offered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginSelection {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

/// How one placeholder value is collected at bootstrap.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceholderSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceholderFile {
    #[serde(default)]
    placeholders: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    pub manifest: TemplateManifest,
    /// In file order.
    pub placeholders: Vec<(String, PlaceholderSpec)>,
}

impl TemplateConfig {
    /// Read `config/manifest.json` and `config/placeholders.json` from the
    /// template. Either file may be absent.
    pub fn load(template_root: &Path) -> Result<Self, TemplateError> {
        if !template_root.is_dir() {
            return Err(TemplateError::SourceMissing {
                path: template_root.to_path_buf(),
            });
        }

        let config_dir = template_root.join(TEMPLATE_CONFIG_DIR);
        let manifest: TemplateManifest =
            read_optional(&config_dir.join(TEMPLATE_MANIFEST_FILE))?.unwrap_or_default();

        let placeholders_path = config_dir.join(PLACEHOLDERS_FILE);
        let placeholders = match read_optional::<PlaceholderFile>(&placeholders_path)? {
            Some(file) => file
                .placeholders
                .into_iter()
                .map(|(key, value)| {
                    serde_json::from_value::<PlaceholderSpec>(value)
                        .map(|spec| (key, spec))
                        .map_err(|source| TemplateError::Malformed {
                            path: placeholders_path.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            manifest,
            placeholders,
        })
    }
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, TemplateError> {
    if !path.is_file() {
        tracing::debug!("template config {} not present", path.display());
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|err| TemplateError::io(path, err))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| TemplateError::Malformed {
            path: PathBuf::from(path),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_plugins_and_ordered_placeholders() {
        let root = TempDir::new().unwrap();
        let config = root.path().join(TEMPLATE_CONFIG_DIR);
        fs::create_dir_all(&config).unwrap();
        fs::write(
            config.join(TEMPLATE_MANIFEST_FILE),
            r#"{"plugins": {"required": ["core"], "optional": ["praxis", "adp"]}}"#,
        )
        .unwrap();
        fs::write(
            config.join(PLACEHOLDERS_FILE),
            r#"{"placeholders": {
                "PROJECT_NAME": {"description": "Project name", "required": true},
                "AUTHOR": {"description": "Author", "default": "Anonymous"},
                "EMAIL": {"description": "Email", "validation": "^[^@]+@[^@]+$"}
            }}"#,
        )
        .unwrap();

        let loaded = TemplateConfig::load(root.path()).unwrap();

        assert_eq!(loaded.manifest.plugins.required, vec!["core"]);
        assert_eq!(loaded.manifest.plugins.optional, vec!["praxis", "adp"]);
        let keys: Vec<_> = loaded.placeholders.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["PROJECT_NAME", "AUTHOR", "EMAIL"]);
        assert!(loaded.placeholders[0].1.required);
        assert_eq!(loaded.placeholders[1].1.default.as_deref(), Some("Anonymous"));
    }

    #[test]
    fn absent_config_files_mean_empty_config() {
        let root = TempDir::new().unwrap();
        let loaded = TemplateConfig::load(root.path()).unwrap();

        assert!(loaded.placeholders.is_empty());
        assert!(loaded.manifest.plugins.required.is_empty());
    }

    #[test]
    fn missing_template_root_fails() {
        let root = TempDir::new().unwrap();
        let err = TemplateConfig::load(&root.path().join("missing")).unwrap_err();
        assert!(matches!(err, TemplateError::SourceMissing { .. }));
    }

    #[test]
    fn invalid_placeholders_are_malformed() {
        let root = TempDir::new().unwrap();
        let config = root.path().join(TEMPLATE_CONFIG_DIR);
        fs::create_dir_all(&config).unwrap();
        fs::write(config.join(PLACEHOLDERS_FILE), "{ nope").unwrap();

        let err = TemplateConfig::load(root.path()).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { .. }));
    }
}
