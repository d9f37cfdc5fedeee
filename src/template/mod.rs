pub mod config;
pub mod materialize;
pub mod placeholder;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use config::{PlaceholderSpec, TemplateConfig};
pub use materialize::materialize;
pub use placeholder::{Bindings, substitute};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template source {} does not exist", path.display())]
    SourceMissing { path: PathBuf },

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template config {} is not valid: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }
}
