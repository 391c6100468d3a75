//! The terv version-manager engine: configuration, requested-version
//! resolution, predicate evaluation, the install lock and the
//! install/uninstall lifecycle.

pub mod config;
pub mod lastuse;
pub mod lockfile;
pub mod semantic;

mod manager;

pub use config::{AUTO_INSTALL_ENV_NAME, Config};
pub use lockfile::LockGuard;
pub use manager::{ToolDescription, VersionFile, VersionManager};
