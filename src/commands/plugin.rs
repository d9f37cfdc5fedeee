use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::commands::{heading, hint, info, success, warn};
use crate::model::config::ResolvedPaths;
use crate::plugin::manager::{PluginInfo, Readiness};
use crate::plugin::manifest::PluginStatus;
use crate::plugin::{
    ErrorKind, InstallMethod, InstallOutcome, PluginError, PluginManager, SkipReason,
};

#[derive(Args, Debug)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,
}

#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// List available plugins
    List,
    /// Show details about a plugin
    Info { name: String },
    /// Add a plugin to a project
    Add {
        name: String,
        /// Project root (defaults to the current directory)
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Remove a plugin from a project
    Remove {
        name: String,
        /// Project root (defaults to the current directory)
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Check that a plugin's install only writes what its manifest declares
    Lint { name: String },
}

pub fn execute(args: PluginArgs, paths: &ResolvedPaths) -> Result<()> {
    let manager = PluginManager::new(paths.plugins_root.clone());

    match args.command {
        PluginCommands::List => list(&manager),
        PluginCommands::Info { name } => show_info(&manager, &name),
        PluginCommands::Add { name, project } => add(&manager, &name, project_dir(project)?),
        PluginCommands::Remove { name, project } => remove(&manager, &name, project_dir(project)?),
        PluginCommands::Lint { name } => lint(&manager, &name),
    }
}

fn project_dir(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("cannot determine the current directory"),
    }
}

fn status_label(status: PluginStatus) -> colored::ColoredString {
    match status {
        PluginStatus::Available => status.label().green(),
        PluginStatus::Planned => status.label().yellow(),
        PluginStatus::Unknown => status.label().normal(),
    }
}

fn list(manager: &PluginManager) -> Result<()> {
    if !manager.plugins_root().is_dir() {
        info(&format!(
            "No plugins directory found at {}",
            manager.plugins_root().display()
        ));
        return Ok(());
    }

    heading("Available Plugins");
    for (index, row) in manager.list().iter().enumerate() {
        println!("\n{}. {}", index + 1, row.name.bold());
        if let Some(manifest) = &row.manifest {
            if let Some(description) = &manifest.description {
                println!("   {description}");
            }
        }
        println!("   Status: {}", status_label(row.status));
        if let Some(manifest) = &row.manifest {
            if let Some(version) = &manifest.version {
                println!("   Version: {version}");
            }
            if let Some(notes) = &manifest.notes {
                println!("   {}", format!("Note: {notes}").yellow());
            }
        }
    }
    println!();
    Ok(())
}

fn show_info(manager: &PluginManager, name: &str) -> Result<()> {
    let PluginInfo {
        name,
        manifest,
        config_sources,
        readiness,
    } = manager.info(name).inspect_err(|err| recovery_hint(err))?;

    heading(&format!("Plugin: {name}"));

    println!("\n{}", "Basic Information".bold());
    println!("  Name:        {}", manifest.display_name(&name));
    println!("  Version:     {}", manifest.version.as_deref().unwrap_or("N/A"));
    println!("  Author:      {}", manifest.author.as_deref().unwrap_or("N/A"));

    if let Some(description) = &manifest.description {
        println!("\n{}", "Description".bold());
        println!("  {description}");
    }

    println!("\n{}", "Status".bold());
    println!("  {}", status_label(manifest.status));
    if let Some(notes) = &manifest.notes {
        println!("  {}", format!("Note: {notes}").yellow());
    }

    println!("\n{}", "Dependencies".bold());
    print_list("Development Dependencies", &manifest.dependencies.dev);
    print_list("Production Dependencies", &manifest.dependencies.prod);
    if !manifest.peer_dependencies.is_empty() {
        println!("  {}", "Peer Dependencies:".cyan());
        for (dep, range) in &manifest.peer_dependencies {
            println!("    - {}", format!("{dep}@{range}").dimmed());
        }
    }

    println!("\n{}", "Configuration Files".bold());
    if config_sources.is_empty() {
        println!("  {}", "No configuration files".dimmed());
    } else {
        println!("  {}", "The following files will be added to your project:".cyan());
        for source in &config_sources {
            if source.present {
                println!("    {}", format!("✓ {}", source.path).green());
            } else {
                println!("    {}", format!("✗ {}", source.path).red());
            }
        }
    }

    println!("\n{}", "Scripts".bold());
    if manifest.scripts.is_empty() {
        println!("  {}", "No scripts".dimmed());
    } else {
        println!("  {}", "The following scripts will be added to package.json:".cyan());
        for (script, command) in &manifest.scripts {
            println!("    {}", format!("{script}:").green());
            println!("      {}", command.dimmed());
        }
    }

    let features: Vec<String> = manifest
        .features
        .iter()
        .filter(|(_, enabled)| **enabled)
        .map(|(feature, _)| split_camel(feature))
        .collect();
    if !features.is_empty() {
        println!("\n{}", "Features".bold());
        for feature in features {
            println!("  {}", format!("✓ {feature}").green());
        }
    }

    println!("\n{}", "Installation".bold());
    match readiness {
        Readiness::NotYetAvailable => {
            println!("  {}", "⚠ This plugin is not yet available".yellow());
            println!(
                "  {}",
                manifest.notes.as_deref().unwrap_or("Coming soon").yellow()
            );
        }
        Readiness::RawCopyFallback => {
            println!("  {}", "⚠ This plugin has no install routine".yellow());
            println!("  {}", "Its files will be copied into the project as-is".dimmed());
        }
        Readiness::Misconfigured(reason) => {
            println!("  {}", "⚠ The install routine is misconfigured".yellow());
            println!("  {}", reason.dimmed());
        }
        Readiness::Ready => {
            println!("  {}", "✓ Ready to install".green());
            hint(&format!("  Run: scaffold plugin add {name}"));
        }
    }
    println!();
    Ok(())
}

fn add(manager: &PluginManager, name: &str, project: PathBuf) -> Result<()> {
    info(&format!("Installing plugin: {name}..."));

    match manager.install(name, &project) {
        Ok(InstallOutcome::Installed(method)) => {
            success(&format!("Plugin '{name}' installed successfully"));
            if method == InstallMethod::RawCopy {
                info("No install routine: plugin files were copied without touching package.json");
            }
            info("Run \"npm install\" to install dependencies");
            hint(&format!("\nTo see what was installed, run: scaffold plugin info {name}"));
            Ok(())
        }
        Ok(InstallOutcome::Skipped(SkipReason::PlannedNotAvailable { notes })) => {
            warn(&format!("Plugin '{name}' is planned but not yet available"));
            warn(&format!(
                "   {}",
                notes.as_deref().unwrap_or("This plugin will be available in a future release")
            ));
            hint(&format!("\nRun 'scaffold plugin info {name}' for more details"));
            Ok(())
        }
        Err(err) => {
            recovery_hint(&err);
            if let PluginError::InstallRoutineFailed { trace, .. } = &err {
                warn("\nTrace:");
                warn(trace);
            }
            Err(err).context(format!("Failed to install plugin '{name}'"))
        }
    }
}

fn remove(manager: &PluginManager, name: &str, project: PathBuf) -> Result<()> {
    info(&format!("Removing plugin: {name}..."));

    let report = manager
        .remove(name, &project)
        .inspect_err(|err| recovery_hint(err))
        .with_context(|| format!("Failed to remove plugin '{name}'"))?;

    for dep in &report.removed_dev {
        info(&format!("Removed dev dependency: {dep}"));
    }
    for dep in &report.removed_prod {
        info(&format!("Removed dependency: {dep}"));
    }
    for script in &report.removed_scripts {
        info(&format!("Removed script: {script}"));
    }

    if report.descriptor_written {
        success("Updated package.json");
    } else {
        warn("No changes made to package.json (plugin may not have been installed)");
    }

    for file in &report.removed_files {
        info(&format!("Removed config file: {file}"));
    }
    for failure in &report.failed_files {
        warn(&format!("Failed to remove {}: {}", failure.path, failure.reason));
    }
    if report.removed_file_count() > 0 {
        success(&format!(
            "Removed {} configuration file(s)",
            report.removed_file_count()
        ));
    } else if report.declared_files > 0 {
        info("No configuration files found to remove");
    }

    println!();
    success(&format!("Plugin '{name}' removed successfully"));
    if report.descriptor_written {
        info("Run \"npm install\" to update installed packages");
    }
    Ok(())
}

fn lint(manager: &PluginManager, name: &str) -> Result<()> {
    let report = manager
        .lint(name)
        .inspect_err(|err| recovery_hint(err))
        .with_context(|| format!("Failed to lint plugin '{name}'"))?;

    heading(&format!("Lint: {name}"));
    if report.planned {
        warn("Plugin is planned; install was not dry-run");
    }

    for (label, items) in [
        ("Undeclared dev dependency", &report.undeclared_dev),
        ("Undeclared dependency", &report.undeclared_prod),
        ("Undeclared script", &report.undeclared_scripts),
        ("Undeclared file", &report.undeclared_files),
        ("Config file without source", &report.missing_config_sources),
    ] {
        for item in items {
            warn(&format!("{label}: {item}"));
        }
    }

    if report.is_clean() {
        success("Install writes only what the manifest declares");
    } else {
        hint("Removal only undoes manifest-declared keys and files; declare the items above.");
    }
    Ok(())
}

fn recovery_hint(err: &PluginError) {
    tracing::debug!(kind = ?err.kind(), "{err}");
    match (err.kind(), err) {
        (ErrorKind::NotFound, PluginError::PackageDescriptorMissing { .. }) => {
            warn("Make sure you are running this command from the project root");
        }
        (ErrorKind::NotFound, _) => {
            hint("\nRun 'scaffold plugin list' to see available plugins");
        }
        (ErrorKind::NoInstallRoutine, _) => {
            warn("Manual installation may be required");
        }
        (ErrorKind::InstallRoutineFailed, PluginError::InstallRoutineFailed { plugin, .. }) => {
            hint(&format!(
                "\nTry running: scaffold plugin info {plugin} to verify plugin structure"
            ));
        }
        _ => {}
    }
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("  {}", format!("{label}: None").dimmed());
        return;
    }

    println!("  {}", format!("{label}:").cyan());
    for item in items {
        println!("    - {}", item.dimmed());
    }
}

/// `codeGeneration` → `code Generation`.
fn split_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() && !out.is_empty() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}
