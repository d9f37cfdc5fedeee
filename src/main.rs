mod bootstrap;
mod commands;
mod model;
mod plugin;
mod template;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use commands::new::NewArgs;
use commands::plugin::PluginArgs;
use model::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "scaffold")]
#[command(about = "Bootstrap projects from a template and manage their plugins", long_about = None)]
#[command(version)]
struct Cli {
    /// Extra config file layered over the defaults and user config
    #[arg(long, global = true, env = "SCAFFOLD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per plugin
    #[arg(long, global = true, env = "SCAFFOLD_PLUGINS_ROOT")]
    plugins_root: Option<PathBuf>,

    /// Template directory new projects are created from
    #[arg(long, global = true, env = "SCAFFOLD_TEMPLATE_ROOT")]
    template_root: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new project from the template
    New(NewArgs),
    /// Manage plugins of an existing project
    Plugin(PluginArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let _guard = init_logging(&config, cli.verbose);

    tracing::info!("scaffold starting");

    let paths = config.resolve_paths(cli.plugins_root, cli.template_root)?;
    tracing::debug!(
        plugins_root = %paths.plugins_root.display(),
        template_root = %paths.template_root.display(),
        "resolved roots"
    );

    let result = match cli.command {
        Commands::New(args) => commands::new::execute(args, &paths, &config),
        Commands::Plugin(args) => commands::plugin::execute(args, &paths),
    };
    if let Err(err) = &result {
        tracing::error!("{err:?}");
    }
    result
}

/// Logs go to a daily file in the data dir, never to stdout.
fn init_logging(config: &AppConfig, verbose: bool) -> Option<WorkerGuard> {
    let log_dir = directories::ProjectDirs::from("", "", "scaffold")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("scaffold"));
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        commands::warn(&format!(
            "Logging disabled, cannot create {}: {err}",
            log_dir.display()
        ));
        return None;
    }

    let filter = if verbose {
        EnvFilter::new("scaffold=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, "scaffold.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let installed = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init();
    if installed.is_err() {
        return None;
    }
    Some(guard)
}
