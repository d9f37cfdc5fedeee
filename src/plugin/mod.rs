pub mod error;
pub mod installer;
pub mod manager;
pub mod manifest;
pub mod merge;
pub mod remover;
pub mod routine;

pub use error::{ErrorKind, PluginError};
pub use installer::{InstallMethod, InstallOutcome, SkipReason};
pub use manager::PluginManager;
