use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::Datelike;
use regex::Regex;
use thiserror::Error;

use crate::model::project::{PROJECT_NAME, project_bindings};
use crate::plugin::{InstallMethod, InstallOutcome, PluginError, PluginManager, SkipReason};
use crate::template::{Bindings, PlaceholderSpec, TemplateConfig, TemplateError, materialize};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("'{name}' is not a valid project directory name")]
    InvalidProjectName { name: String },

    #[error("{key} is required")]
    MissingValue { key: String },

    #[error("invalid format for {key}: expected to match `{pattern}`")]
    InvalidValue { key: String, pattern: String },

    #[error("placeholder {key} has an invalid validation pattern: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("directory {} already exists", path.display())]
    DestinationExists { path: PathBuf },

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of placeholder answers and plugin choices.
pub trait Prompter {
    /// Raw answer for `key`; an empty string means "take the default".
    fn ask(
        &mut self,
        key: &str,
        spec: &PlaceholderSpec,
        default: Option<&str>,
    ) -> Result<String, BootstrapError>;

    fn choose_plugins(&mut self, optional: &[String]) -> Result<Vec<String>, BootstrapError>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(
        &mut self,
        key: &str,
        spec: &PlaceholderSpec,
        default: Option<&str>,
    ) -> Result<String, BootstrapError> {
        let label = if spec.description.is_empty() {
            key
        } else {
            spec.description.as_str()
        };
        let prompt = match default {
            Some(default) => format!("{label} [{default}]"),
            None => label.to_string(),
        };

        let answer: String = dialoguer::Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }

    fn choose_plugins(&mut self, optional: &[String]) -> Result<Vec<String>, BootstrapError> {
        if optional.is_empty() {
            return Ok(Vec::new());
        }

        let picked = dialoguer::MultiSelect::new()
            .with_prompt("Select plugins to include (space to toggle, enter to confirm)")
            .items(optional)
            .interact()?;
        Ok(picked.into_iter().map(|index| optional[index].clone()).collect())
    }
}

/// Answers supplied up front, for `--no-input` runs.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: HashMap<String, String>,
    plugins: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: HashMap<String, String>, plugins: Vec<String>) -> Self {
        Self { answers, plugins }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(
        &mut self,
        key: &str,
        _spec: &PlaceholderSpec,
        _default: Option<&str>,
    ) -> Result<String, BootstrapError> {
        Ok(self.answers.get(key).cloned().unwrap_or_default())
    }

    fn choose_plugins(&mut self, optional: &[String]) -> Result<Vec<String>, BootstrapError> {
        Ok(self
            .plugins
            .iter()
            .filter(|plugin| {
                let offered = optional.contains(plugin);
                if !offered {
                    tracing::warn!("plugin {plugin} is not offered by this template");
                }
                offered
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Installed(InstallMethod),
    Planned { notes: Option<String> },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStep {
    pub name: String,
    pub result: StepResult,
}

#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub project_dir: PathBuf,
    pub bindings: Bindings,
    pub plugins: Vec<PluginStep>,
    pub seeded_gitignore: bool,
}

pub struct Bootstrap<'a> {
    template_root: PathBuf,
    plugins: &'a PluginManager,
    gitignore: Option<String>,
    year: i32,
}

impl<'a> Bootstrap<'a> {
    pub fn new(template_root: PathBuf, plugins: &'a PluginManager) -> Self {
        Self {
            template_root,
            plugins,
            gitignore: None,
            year: chrono::Local::now().year(),
        }
    }

    /// Written to `.gitignore` when the template does not provide one.
    pub fn with_gitignore(mut self, body: impl Into<String>) -> Self {
        self.gitignore = Some(body.into());
        self
    }

    #[cfg(test)]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Create `<dest_parent>/<project_name>` from the template.
    pub fn run(
        &self,
        project_name: &str,
        dest_parent: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<BootstrapReport, BootstrapError> {
        if !is_single_segment(project_name) {
            return Err(BootstrapError::InvalidProjectName {
                name: project_name.to_string(),
            });
        }

        let config = TemplateConfig::load(&self.template_root)?;
        let answers = collect_answers(&config, project_name, prompter)?;

        let mut selected = config.manifest.plugins.required.clone();
        for plugin in prompter.choose_plugins(&config.manifest.plugins.optional)? {
            if !selected.contains(&plugin) {
                selected.push(plugin);
            }
        }

        let bindings = project_bindings(&answers, self.year);

        let project_dir = dest_parent.join(project_name);
        if project_dir.exists() {
            return Err(BootstrapError::DestinationExists { path: project_dir });
        }

        tracing::info!("creating project {}", project_dir.display());
        fs::create_dir_all(&project_dir).map_err(|source| BootstrapError::Io {
            path: project_dir.clone(),
            source,
        })?;

        materialize(&self.template_root, &project_dir, &bindings)?;

        let mut steps = Vec::with_capacity(selected.len());
        for name in selected {
            let result = match self.plugins.install(&name, &project_dir) {
                Ok(InstallOutcome::Installed(method)) => StepResult::Installed(method),
                Ok(InstallOutcome::Skipped(SkipReason::PlannedNotAvailable { notes })) => {
                    StepResult::Planned { notes }
                }
                Err(PluginError::PluginNotFound { .. }) => {
                    tracing::warn!("plugin {name} not found; skipping");
                    StepResult::NotFound
                }
                Err(err) => return Err(err.into()),
            };
            steps.push(PluginStep { name, result });
        }

        let seeded_gitignore = self.seed_gitignore(&project_dir)?;

        Ok(BootstrapReport {
            project_dir,
            bindings,
            plugins: steps,
            seeded_gitignore,
        })
    }

    fn seed_gitignore(&self, project_dir: &Path) -> Result<bool, BootstrapError> {
        let Some(body) = &self.gitignore else {
            return Ok(false);
        };

        let path = project_dir.join(".gitignore");
        if path.exists() {
            return Ok(false);
        }

        fs::write(&path, body).map_err(|source| BootstrapError::Io { path, source })?;
        Ok(true)
    }
}

fn collect_answers(
    config: &TemplateConfig,
    project_name: &str,
    prompter: &mut dyn Prompter,
) -> Result<Bindings, BootstrapError> {
    let mut answers = Bindings::new();

    for (key, spec) in &config.placeholders {
        let default = spec
            .default
            .clone()
            .or_else(|| (key == PROJECT_NAME).then(|| project_name.to_string()));

        let mut answer = prompter.ask(key, spec, default.as_deref())?;
        if answer.is_empty() {
            if let Some(default) = default {
                answer = default;
            }
        }

        if answer.is_empty() && spec.required {
            return Err(BootstrapError::MissingValue { key: key.clone() });
        }

        if let Some(pattern) = spec.validation.as_deref() {
            if !answer.is_empty() {
                let regex = Regex::new(pattern).map_err(|source| BootstrapError::InvalidPattern {
                    key: key.clone(),
                    source,
                })?;
                if !regex.is_match(&answer) {
                    return Err(BootstrapError::InvalidValue {
                        key: key.clone(),
                        pattern: pattern.to_string(),
                    });
                }
            }
        }

        answers.insert(key.clone(), answer);
    }

    answers
        .entry(PROJECT_NAME.to_string())
        .or_insert_with(|| project_name.to_string());

    Ok(answers)
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::package::{PACKAGE_FILE, PackageDescriptor, Section};
    use crate::plugin::manifest::MANIFEST_FILE;
    use crate::plugin::routine::ROUTINE_FILE;
    use tempfile::TempDir;

    struct Workspace {
        template: TempDir,
        plugins: TempDir,
        out: TempDir,
    }

    fn workspace() -> Workspace {
        let template = TempDir::new().unwrap();
        let root = template.path();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(
            root.join("config/manifest.json"),
            r#"{"plugins": {"required": ["core"], "optional": ["praxis", "later", "ghost"]}}"#,
        )
        .unwrap();
        fs::write(
            root.join("config/placeholders.json"),
            r#"{"placeholders": {
                "PROJECT_NAME": {"description": "Project name", "required": true},
                "AUTHOR": {"description": "Author", "default": "Anonymous"},
                "EMAIL": {"description": "Contact email", "validation": "^[^@\\s]+@[^@\\s]+$"}
            }}"#,
        )
        .unwrap();
        fs::write(
            root.join(PACKAGE_FILE),
            "{\n  \"name\": \"{{PROJECT_NAME_SLUG}}\",\n  \"scripts\": {}\n}\n",
        )
        .unwrap();
        fs::write(
            root.join("src/main.js"),
            "export const {{PROJECT_NAME_CAMEL}} = '{{PROJECT_NAME}}'; // (c) {{YEAR}} {{AUTHOR}}\n",
        )
        .unwrap();

        let plugins = TempDir::new().unwrap();
        for (name, manifest, routine) in [
            ("core", r#"{"scripts": {"fmt": "prettier -w ."}}"#, true),
            (
                "praxis",
                r#"{"version": "2.0.0", "dependencies": {"dev": [], "prod": ["@plures/praxis"]}}"#,
                true,
            ),
            ("later", r#"{"status": "planned", "notes": "Soon"}"#, false),
        ] {
            let dir = plugins.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
            if routine {
                fs::write(dir.join(ROUTINE_FILE), "entry = \"manifest-merge\"\n").unwrap();
            }
        }

        Workspace {
            template,
            plugins,
            out: TempDir::new().unwrap(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn creates_project_with_bindings_and_plugins() {
        let ws = workspace();
        let manager = PluginManager::new(ws.plugins.path().to_path_buf());
        let mut prompter = ScriptedPrompter::new(
            answers(&[("PROJECT_NAME", "My Cool App"), ("EMAIL", "jo@example.com")]),
            vec!["praxis".to_string(), "later".to_string(), "ghost".to_string()],
        );

        let report = Bootstrap::new(ws.template.path().to_path_buf(), &manager)
            .with_year(2026)
            .with_gitignore("node_modules/\n")
            .run("my-cool-app", ws.out.path(), &mut prompter)
            .unwrap();

        let project = ws.out.path().join("my-cool-app");
        assert_eq!(report.project_dir, project);
        assert_eq!(
            fs::read_to_string(project.join("src/main.js")).unwrap(),
            "export const myCoolApp = 'My Cool App'; // (c) 2026 Anonymous\n"
        );
        assert!(!project.join(".git").exists());
        assert!(report.seeded_gitignore);
        assert_eq!(
            fs::read_to_string(project.join(".gitignore")).unwrap(),
            "node_modules/\n"
        );

        let package = PackageDescriptor::load(&project).unwrap();
        assert_eq!(package.root()["name"], "my-cool-app");
        assert_eq!(package.get(Section::Scripts, "fmt"), Some("prettier -w ."));
        assert_eq!(package.get(Section::Dependencies, "@plures/praxis"), Some("^2.0.0"));

        let results: Vec<_> = report
            .plugins
            .iter()
            .map(|step| (step.name.as_str(), step.result.clone()))
            .collect();
        assert_eq!(
            results,
            vec![
                ("core", StepResult::Installed(InstallMethod::Routine)),
                ("praxis", StepResult::Installed(InstallMethod::Routine)),
                (
                    "later",
                    StepResult::Planned {
                        notes: Some("Soon".to_string())
                    }
                ),
                ("ghost", StepResult::NotFound),
            ]
        );
    }

    #[test]
    fn project_name_defaults_to_directory_name() {
        let ws = workspace();
        let manager = PluginManager::new(ws.plugins.path().to_path_buf());
        let mut prompter = ScriptedPrompter::default();

        let report = Bootstrap::new(ws.template.path().to_path_buf(), &manager)
            .run("acme", ws.out.path(), &mut prompter)
            .unwrap();

        assert_eq!(report.bindings["PROJECT_NAME"], "acme");
        assert_eq!(report.bindings["EMAIL"], "");
        assert!(!report.seeded_gitignore);
    }

    #[test]
    fn existing_destination_is_refused() {
        let ws = workspace();
        fs::create_dir_all(ws.out.path().join("taken")).unwrap();
        let manager = PluginManager::new(ws.plugins.path().to_path_buf());

        let err = Bootstrap::new(ws.template.path().to_path_buf(), &manager)
            .run("taken", ws.out.path(), &mut ScriptedPrompter::default())
            .unwrap_err();

        assert!(matches!(err, BootstrapError::DestinationExists { .. }));
    }

    #[test]
    fn invalid_answer_is_rejected_before_writing() {
        let ws = workspace();
        let manager = PluginManager::new(ws.plugins.path().to_path_buf());
        let mut prompter =
            ScriptedPrompter::new(answers(&[("EMAIL", "not an email")]), Vec::new());

        let err = Bootstrap::new(ws.template.path().to_path_buf(), &manager)
            .run("acme", ws.out.path(), &mut prompter)
            .unwrap_err();

        assert!(matches!(err, BootstrapError::InvalidValue { ref key, .. } if key == "EMAIL"));
        assert!(!ws.out.path().join("acme").exists());
    }

    #[test]
    fn required_value_without_default_fails() {
        let config = TemplateConfig {
            placeholders: vec![(
                "LICENSE".to_string(),
                PlaceholderSpec {
                    required: true,
                    ..PlaceholderSpec::default()
                },
            )],
            ..TemplateConfig::default()
        };

        let err = collect_answers(&config, "acme", &mut ScriptedPrompter::default()).unwrap_err();

        assert!(matches!(err, BootstrapError::MissingValue { ref key } if key == "LICENSE"));
    }

    #[test]
    fn broken_validation_pattern_is_reported() {
        let config = TemplateConfig {
            placeholders: vec![(
                "CODE".to_string(),
                PlaceholderSpec {
                    validation: Some("(".to_string()),
                    ..PlaceholderSpec::default()
                },
            )],
            ..TemplateConfig::default()
        };
        let mut prompter = ScriptedPrompter::new(answers(&[("CODE", "x")]), Vec::new());

        let err = collect_answers(&config, "acme", &mut prompter).unwrap_err();

        assert!(matches!(err, BootstrapError::InvalidPattern { .. }));
    }

    #[test]
    fn project_name_must_be_one_segment() {
        let ws = workspace();
        let manager = PluginManager::new(ws.plugins.path().to_path_buf());

        for name in ["", "..", "a/b", "/abs"] {
            let err = Bootstrap::new(ws.template.path().to_path_buf(), &manager)
                .run(name, ws.out.path(), &mut ScriptedPrompter::default())
                .unwrap_err();
            assert!(matches!(err, BootstrapError::InvalidProjectName { .. }), "{name}");
        }
    }
}
