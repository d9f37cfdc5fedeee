use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::bootstrap::{
    Bootstrap, BootstrapError, Prompter, ScriptedPrompter, StepResult, TerminalPrompter,
};
use crate::commands::{heading, hint, info, success, warn};
use crate::model::config::{AppConfig, ResolvedPaths};
use crate::plugin::{InstallMethod, PluginManager};
use crate::template::PlaceholderSpec;

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Directory name of the new project
    pub project_name: String,

    /// Parent directory to create the project in (defaults to the current directory)
    #[arg(long)]
    pub into: Option<PathBuf>,

    /// Answer a placeholder up front (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_binding)]
    pub set: Vec<(String, String)>,

    /// Include an optional plugin (repeatable)
    #[arg(long = "plugin", value_name = "NAME")]
    pub plugins: Vec<String>,

    /// Never prompt; unanswered placeholders take their defaults
    #[arg(long)]
    pub no_input: bool,
}

fn parse_binding(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn execute(args: NewArgs, paths: &ResolvedPaths, config: &AppConfig) -> Result<()> {
    heading("Bootstrap New Project");

    let dest_parent = match args.into {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };

    let manager = PluginManager::new(paths.plugins_root.clone());
    let mut bootstrap = Bootstrap::new(paths.template_root.clone(), &manager);
    if config.bootstrap.seed_gitignore {
        bootstrap = bootstrap.with_gitignore(config.bootstrap.gitignore.clone());
    }

    let answers: HashMap<String, String> = args.set.into_iter().collect();
    let mut scripted = ScriptedPrompter::new(answers, args.plugins);

    info(&format!("Creating project: {}...", args.project_name));
    let report = if args.no_input {
        bootstrap.run(&args.project_name, &dest_parent, &mut scripted)
    } else {
        let mut prompter = PresetPrompter {
            preset: scripted,
            terminal: TerminalPrompter,
        };
        bootstrap.run(&args.project_name, &dest_parent, &mut prompter)
    }
    .context("Bootstrap failed")?;

    for (key, value) in &report.bindings {
        tracing::debug!("{key} = {value}");
    }

    for step in &report.plugins {
        match &step.result {
            StepResult::Installed(InstallMethod::Routine) => {
                success(&format!("Installed plugin: {}", step.name));
            }
            StepResult::Installed(InstallMethod::RawCopy) => {
                info(&format!(
                    "Plugin {} has no install routine, copied its files",
                    step.name
                ));
            }
            StepResult::Planned { notes } => warn(&format!(
                "Plugin {} is planned but not yet available: {}",
                step.name,
                notes.as_deref().unwrap_or("coming in a future release")
            )),
            StepResult::NotFound => info(&format!("Plugin {} not found, skipped", step.name)),
        }
    }

    if report.seeded_gitignore {
        info("Created .gitignore");
    }

    success(&format!("Project {} created successfully!", args.project_name));
    heading("Next Steps");
    hint(&format!("  cd {}", report.project_dir.display()));
    hint("  npm install");
    hint("  npm run dev");
    Ok(())
}

/// Uses `--set` / `--plugin` answers where given and asks for the rest.
struct PresetPrompter {
    preset: ScriptedPrompter,
    terminal: TerminalPrompter,
}

impl Prompter for PresetPrompter {
    fn ask(
        &mut self,
        key: &str,
        spec: &PlaceholderSpec,
        default: Option<&str>,
    ) -> Result<String, BootstrapError> {
        let preset = self.preset.ask(key, spec, default)?;
        if !preset.is_empty() {
            return Ok(preset);
        }
        self.terminal.ask(key, spec, default)
    }

    fn choose_plugins(&mut self, optional: &[String]) -> Result<Vec<String>, BootstrapError> {
        let preset = self.preset.choose_plugins(optional)?;
        if !preset.is_empty() {
            return Ok(preset);
        }
        self.terminal.choose_plugins(optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bindings() {
        assert_eq!(
            parse_binding("AUTHOR=Jo Doe").unwrap(),
            ("AUTHOR".to_string(), "Jo Doe".to_string())
        );
        assert_eq!(
            parse_binding("URL=https://x.dev/?a=b").unwrap(),
            ("URL".to_string(), "https://x.dev/?a=b".to_string())
        );
        assert!(parse_binding("novalue").is_err());
        assert!(parse_binding("=x").is_err());
    }
}
