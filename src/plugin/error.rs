use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

/// Which JSON document a parse failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    PluginManifest,
    PackageDescriptor,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentRole::PluginManifest => f.write_str("plugin manifest"),
            DocumentRole::PackageDescriptor => f.write_str("package descriptor"),
        }
    }
}

/// Coarse failure classes shared by install, remove, info and lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Malformed,
    NoInstallRoutine,
    InstallRoutineFailed,
    Io,
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{name}' not found in {}", root.display())]
    PluginNotFound { name: String, root: PathBuf },

    #[error("plugin '{name}' has no manifest.json ({})", path.display())]
    ManifestNotFound { name: String, path: PathBuf },

    #[error("{role} {} is not valid: {source}", path.display())]
    Malformed {
        role: DocumentRole,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("package.json not found at {}", path.display())]
    PackageDescriptorMissing { path: PathBuf },

    #[error("plugin '{plugin}' has an unusable install routine: {reason}")]
    NoInstallRoutine { plugin: String, reason: String },

    #[error("plugin '{plugin}' install routine failed: {message}")]
    InstallRoutineFailed {
        plugin: String,
        message: String,
        trace: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Copy(#[from] TemplateError),
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::PluginNotFound { .. }
            | PluginError::ManifestNotFound { .. }
            | PluginError::PackageDescriptorMissing { .. } => ErrorKind::NotFound,
            PluginError::Malformed { .. } => ErrorKind::Malformed,
            PluginError::NoInstallRoutine { .. } => ErrorKind::NoInstallRoutine,
            PluginError::InstallRoutineFailed { .. } => ErrorKind::InstallRoutineFailed,
            PluginError::Io { .. } | PluginError::Copy(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PluginError::Io {
            path: path.into(),
            source,
        }
    }
}
