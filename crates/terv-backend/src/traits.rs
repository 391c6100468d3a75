use std::path::Path;

use crate::error::ManagerError;

/// Source of releases for one managed tool.
///
/// `install_release` owns atomicity: on success `target_path` is a fully
/// populated directory, on failure `target_path` must not exist at all. The
/// engine relies on that contract and never cleans up after a failed
/// install, so implementations must stage into a sibling directory and move
/// the result into place in one step.
pub trait ReleaseRetriever {
    /// Download and materialize `version` into `target_path`.
    ///
    /// # Errors
    /// Returns an error when the release cannot be located, downloaded or
    /// written; `target_path` is left absent in that case.
    fn install_release(&self, version: &str, target_path: &Path) -> Result<(), ManagerError>;

    /// List every remotely available version, canonicalized (no `v` prefix)
    /// and unsorted.
    ///
    /// # Errors
    /// Returns an error when the remote catalog cannot be reached or its
    /// response cannot be understood.
    fn list_releases(&self) -> Result<Vec<String>, ManagerError>;
}
