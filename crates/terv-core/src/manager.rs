use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use terv_backend::{
    DatedVersion, ManagerError, ReleaseRetriever, canonical, sort_versions,
};

use crate::config::{AUTO_INSTALL_ENV_NAME, Config};
use crate::lastuse;
use crate::lockfile::LockGuard;
use crate::semantic::{self, PredicateInfo, flat, iac::ExtDescription};

/// A version file the resolver scans in the working directory, with the
/// parser that knows how to read it.
#[derive(Clone, Copy)]
pub struct VersionFile {
    pub name: &'static str,
    pub parser: fn(&Path, &Config) -> Result<String, ManagerError>,
}

/// Static description of one managed tool.
pub struct ToolDescription {
    pub folder_name: String,
    pub version_env_name: String,
    pub default_version_env_name: String,
    pub constraint_env_name: String,
    pub version_files: Vec<VersionFile>,
    pub iac_exts: Vec<ExtDescription>,
}

/// The version-manager engine for one tool. Immutable after construction;
/// all mutation happens on the install directory, under the install lock.
pub struct VersionManager<'a> {
    conf: &'a Config,
    pub folder_name: String,
    pub version_env_name: String,
    default_version_env_name: String,
    constraint_env_name: String,
    pub version_files: Vec<VersionFile>,
    iac_exts: Vec<ExtDescription>,
    retriever: Box<dyn ReleaseRetriever>,
}

impl<'a> VersionManager<'a> {
    pub fn new(
        conf: &'a Config,
        tool: ToolDescription,
        retriever: Box<dyn ReleaseRetriever>,
    ) -> Self {
        Self {
            conf,
            folder_name: tool.folder_name,
            version_env_name: tool.version_env_name,
            default_version_env_name: tool.default_version_env_name,
            constraint_env_name: tool.constraint_env_name,
            version_files: tool.version_files,
            iac_exts: tool.iac_exts,
            retriever,
        }
    }

    pub(crate) fn conf(&self) -> &Config {
        self.conf
    }

    pub(crate) fn iac_exts(&self) -> &[ExtDescription] {
        &self.iac_exts
    }

    /// Resolve the requested version from the environment and version files,
    /// then evaluate it, installing when allowed. Records the use of the
    /// resulting version.
    ///
    /// # Errors
    /// Fails when resolution, evaluation or installation fails.
    pub fn detect(&self, proxy_call: bool) -> Result<String, ManagerError> {
        let requested = match self.resolve(semantic::LATEST_ALLOWED_KEY) {
            Ok(requested) => requested,
            Err(err) => {
                self.conf.displayer.flush(proxy_call);
                return Err(err);
            }
        };

        let version = self.evaluate(&requested, proxy_call)?;
        if let Ok(install_path) = self.install_path() {
            let version_path = install_path.join(&version);
            if version_path.exists() {
                lastuse::write_now(&version_path);
            }
        }

        Ok(version)
    }

    /// Evaluate a requested version: a concrete version is canonicalized and
    /// installed as needed, anything else is expanded to a predicate and
    /// matched against local versions first (unless `force_remote`), then
    /// against the remote catalog.
    ///
    /// # Errors
    /// `NoCompatibleLocally` (carrying the version) when auto-install is
    /// disabled, `NoCompatible` when nothing matches remotely, plus
    /// constraint, filesystem and catalog failures.
    pub fn evaluate(&self, requested: &str, proxy_call: bool) -> Result<String, ManagerError> {
        if let Some(cleaned) = canonical(requested) {
            if self.conf.no_install {
                let check = self.check_version_installation(None, &cleaned);
                let (_, installed) = self.flush_on_err(proxy_call, check)?;
                if !installed {
                    return Err(self.auto_install_disabled_msg(&cleaned));
                }
                self.conf.displayer.flush(proxy_call);

                return Ok(cleaned);
            }

            self.install_specific_version(&cleaned, proxy_call)?;

            return Ok(cleaned);
        }

        let parsed = semantic::parse_predicate(requested, self);
        let predicate_info = self.flush_on_err(proxy_call, parsed)?;

        let install_path = self.flush_on_err(proxy_call, self.install_path())?;

        if !self.conf.force_remote {
            let listed = self.inner_list_local(&install_path, predicate_info.reverse_order);
            let versions = self.flush_on_err(proxy_call, listed)?;
            if let Some(version) = predicate_info.select(&versions) {
                self.conf
                    .displayer
                    .display(format!("Found compatible version installed locally : {version}"));
                self.conf.displayer.flush(proxy_call);

                return Ok(version.clone());
            }

            self.conf
                .displayer
                .display("No compatible version found locally, search a remote one...");
        }

        self.search_install_remote(&predicate_info, self.conf.no_install, proxy_call)
    }

    /// Install the requested version, or the newest remote version matching
    /// it when it is a constraint or strategy (auto-install configuration is
    /// ignored here: an explicit install always installs).
    ///
    /// # Errors
    /// Fails when parsing, the catalog or the retriever fails.
    pub fn install(&self, requested: &str) -> Result<(), ManagerError> {
        if let Some(cleaned) = canonical(requested) {
            return self.install_specific_version(&cleaned, false);
        }

        let predicate_info = semantic::parse_predicate(requested, self)?;
        self.search_install_remote(&predicate_info, false, false)
            .map(|_| ())
    }

    /// Install directory of this tool, created on first use.
    ///
    /// # Errors
    /// Fails when the directory cannot be created.
    pub fn install_path(&self) -> Result<PathBuf, ManagerError> {
        let dir_path = self.conf.root_path.join(&self.folder_name);
        fs::create_dir_all(&dir_path)?;

        Ok(dir_path)
    }

    /// Installed versions decorated with their last-use dates.
    ///
    /// # Errors
    /// Fails when the install directory cannot be enumerated.
    pub fn list_local(&self, reverse_order: bool) -> Result<Vec<DatedVersion>, ManagerError> {
        let install_path = self.install_path()?;
        let versions = self.inner_list_local(&install_path, reverse_order)?;

        Ok(versions
            .into_iter()
            .map(|version| DatedVersion {
                use_date: lastuse::read(&install_path.join(&version)),
                version,
            })
            .collect())
    }

    /// Remotely available versions, sorted.
    ///
    /// # Errors
    /// Fails when the retriever cannot list releases.
    pub fn list_remote(&self, reverse_order: bool) -> Result<Vec<String>, ManagerError> {
        let mut versions = self.retriever.list_releases()?;
        sort_versions(&mut versions, reverse_order);

        Ok(versions)
    }

    /// Installed version set for display and completion purposes: never
    /// fails, degrades to a warning and an empty set.
    #[must_use]
    pub fn local_set(&self) -> HashSet<String> {
        let install_path = match self.install_path() {
            Ok(install_path) => install_path,
            Err(err) => {
                log::warn!("could not create the installation directory: {err}");
                return HashSet::new();
            }
        };

        let entries = match fs::read_dir(&install_path) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    log::debug!("no installed versions yet: {err}");
                } else {
                    log::warn!("could not read installed versions: {err}");
                }
                return HashSet::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }

    /// Default constraint: environment first, root `constraint` file second.
    #[must_use]
    pub fn read_default_constraint(&self) -> String {
        let constraint = env_value(&self.constraint_env_name);
        if !constraint.is_empty() {
            return constraint;
        }

        flat::retrieve(&self.root_constraint_file_path(), self.conf, false).unwrap_or_default()
    }

    /// # Errors
    /// Fails when the constraint file cannot be removed.
    pub fn reset_constraint(&self) -> Result<(), ManagerError> {
        remove_file(&self.root_constraint_file_path(), self.conf)
    }

    /// # Errors
    /// Fails when the version file cannot be removed.
    pub fn reset_version(&self) -> Result<(), ManagerError> {
        remove_file(&self.root_version_file_path(), self.conf)
    }

    /// Search the requested version through the source chain: version
    /// environment variable, version files, default-version environment
    /// variable, root `version` file, then `default_strategy`.
    ///
    /// # Errors
    /// Fails when a consulted version file cannot be read.
    pub fn resolve(&self, default_strategy: &str) -> Result<String, ManagerError> {
        let version = env_value(&self.version_env_name);
        if !version.is_empty() {
            return Ok(semantic::display_detection_info(
                &self.conf.displayer,
                version,
                &self.version_env_name,
            ));
        }

        let version = self.resolve_with_version_files()?;
        if !version.is_empty() {
            return Ok(version);
        }

        let version = env_value(&self.default_version_env_name);
        if !version.is_empty() {
            return Ok(semantic::display_detection_info(
                &self.conf.displayer,
                version,
                &self.default_version_env_name,
            ));
        }

        let version = flat::retrieve_version(&self.root_version_file_path(), self.conf)?;
        if !version.is_empty() {
            return Ok(version);
        }

        self.conf.displayer.display(format!(
            "No version files found for {}, fallback to {default_strategy} strategy",
            self.folder_name
        ));

        Ok(default_strategy.to_string())
    }

    /// Search the requested version in the declared version files only.
    ///
    /// # Errors
    /// Fails when a version file cannot be read.
    pub fn resolve_with_version_files(&self) -> Result<String, ManagerError> {
        for file in &self.version_files {
            let version = (file.parser)(&self.conf.working_dir.join(file.name), self.conf)?;
            if !version.is_empty() {
                return Ok(version);
            }
        }

        Ok(String::new())
    }

    #[must_use]
    pub fn root_constraint_file_path(&self) -> PathBuf {
        self.conf
            .root_path
            .join(&self.folder_name)
            .join("constraint")
    }

    #[must_use]
    pub fn root_version_file_path(&self) -> PathBuf {
        self.conf.root_path.join(&self.folder_name).join("version")
    }

    /// Persist the default constraint, rejecting expressions that do not
    /// parse.
    ///
    /// # Errors
    /// `InvalidConstraint` on an unparseable expression, or a filesystem
    /// error on write.
    pub fn set_constraint(&self, constraint: &str) -> Result<(), ManagerError> {
        semantic::parse_requirement(constraint)?;
        self.install_path()?;

        write_file(&self.root_constraint_file_path(), constraint, self.conf)
    }

    /// Remove one concrete version, or expand the request to a selection and
    /// ask for confirmation. Holds the install lock throughout.
    ///
    /// # Errors
    /// Fails when the lock cannot be acquired, the selection cannot be
    /// expanded, or the inventory cannot be listed.
    pub fn uninstall(&self, requested: &str) -> Result<(), ManagerError> {
        let install_path = self.install_path()?;
        let _lock = LockGuard::acquire(&install_path, &self.conf.displayer)?;

        if let Some(cleaned) = canonical(requested) {
            self.uninstall_specific_version(&install_path, &cleaned);

            return Ok(());
        }

        let versions = self.inner_list_local(&install_path, true)?;
        let selected = semantic::select_versions_to_uninstall(requested, &versions)?;
        if selected.is_empty() {
            self.conf
                .displayer
                .display(format!("No matching {} versions", self.folder_name));

            return Ok(());
        }

        self.conf.displayer.display(format!(
            "Selected {} versions for uninstallation :",
            self.folder_name
        ));
        self.conf.displayer.display(selected.join(", "));
        self.conf.displayer.display("Uninstall ? [y/N]");

        if !read_confirmation(std::io::stdin().lock()) {
            return Ok(());
        }

        for version in &selected {
            self.uninstall_specific_version(&install_path, version);
        }

        Ok(())
    }

    /// Remove the given versions unconditionally, under one lock
    /// acquisition.
    ///
    /// # Errors
    /// Fails when the lock cannot be acquired; per-version removal failures
    /// are displayed but do not abort the batch.
    pub fn uninstall_multiple(&self, versions: &[String]) -> Result<(), ManagerError> {
        let install_path = self.install_path()?;
        let _lock = LockGuard::acquire(&install_path, &self.conf.displayer)?;

        for version in versions {
            self.uninstall_specific_version(&install_path, version);
        }

        Ok(())
    }

    /// Evaluate the requested version and pin the result, either in the
    /// working directory's version file or in the root `version` file.
    /// `NoCompatibleLocally` is reported but the version is still written.
    ///
    /// # Errors
    /// Fails when evaluation fails fatally or the file cannot be written.
    pub fn use_version(&self, requested: &str, working_dir: bool) -> Result<(), ManagerError> {
        let detected = match self.evaluate(requested, false) {
            Ok(version) => version,
            Err(ManagerError::NoCompatibleLocally { version }) => {
                self.conf.displayer.display(
                    ManagerError::NoCompatibleLocally {
                        version: version.clone(),
                    }
                    .to_string(),
                );
                version
            }
            Err(err) => return Err(err),
        };

        let target_path = match self.version_files.first() {
            Some(file) if working_dir => self.conf.working_dir.join(file.name),
            _ => self.root_version_file_path(),
        };

        write_file(&target_path, &detected, self.conf)
    }

    fn already_installed_msg(&self, version: &str, proxy_call: bool) {
        self.conf
            .displayer
            .display(format!("{} {version} already installed", self.folder_name));
        self.conf.displayer.flush(proxy_call);
    }

    fn auto_install_disabled_msg(&self, version: &str) -> ManagerError {
        let cmd_name = self.folder_name.to_lowercase();
        // A missing installation is always reported normally.
        self.conf.displayer.flush(false);
        self.conf.displayer.display(format!(
            "Auto-install is disabled. To install {} version {version}, you can set the \
             environment variable {AUTO_INSTALL_ENV_NAME}=true, or run 'terv {cmd_name} \
             install {version}'",
            self.folder_name
        ));

        ManagerError::NoCompatibleLocally {
            version: version.to_string(),
        }
    }

    fn check_version_installation(
        &self,
        install_path: Option<PathBuf>,
        version: &str,
    ) -> Result<(PathBuf, bool), ManagerError> {
        let install_path = match install_path {
            Some(install_path) => install_path,
            None => self.install_path()?,
        };

        match fs::metadata(install_path.join(version)) {
            Ok(_) => Ok((install_path, true)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok((install_path, false)),
            Err(err) => Err(err.into()),
        }
    }

    fn flush_on_err<T>(
        &self,
        proxy_call: bool,
        result: Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        if result.is_err() {
            self.conf.displayer.flush(proxy_call);
        }

        result
    }

    fn inner_list_local(
        &self,
        install_path: &Path,
        reverse_order: bool,
    ) -> Result<Vec<String>, ManagerError> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(install_path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        sort_versions(&mut versions, reverse_order);

        Ok(versions)
    }

    fn install_specific_version(
        &self,
        version: &str,
        proxy_call: bool,
    ) -> Result<(), ManagerError> {
        if version.is_empty() {
            self.conf.displayer.flush(proxy_call);

            return Err(ManagerError::EmptyVersion);
        }

        // First check without the lock: the common already-installed case
        // must not contend.
        let (install_path, installed) = self.check_version_installation(None, version)?;
        if installed {
            self.already_installed_msg(version, proxy_call);

            return Ok(());
        }

        let _lock = LockGuard::acquire(&install_path, &self.conf.displayer)?;

        // Second check with the lock held, to absorb a concurrent install.
        let (_, installed) =
            self.check_version_installation(Some(install_path.clone()), version)?;
        if installed {
            self.already_installed_msg(version, proxy_call);

            return Ok(());
        }

        // An actual installation is always reported normally.
        self.conf.displayer.flush(false);
        self.conf
            .displayer
            .display(format!("Installing {} {version}", self.folder_name));

        self.retriever
            .install_release(version, &install_path.join(version))?;
        self.conf.displayer.display(format!(
            "Installation of {} {version} successful",
            self.folder_name
        ));

        Ok(())
    }

    fn search_install_remote(
        &self,
        predicate_info: &PredicateInfo,
        no_install: bool,
        proxy_call: bool,
    ) -> Result<String, ManagerError> {
        let listed = self.list_remote(predicate_info.reverse_order);
        let versions = self.flush_on_err(proxy_call, listed)?;

        if let Some(version) = predicate_info.select(&versions) {
            self.conf
                .displayer
                .display(format!("Found compatible version remotely : {version}"));
            if no_install {
                return Err(self.auto_install_disabled_msg(version));
            }

            self.install_specific_version(version, proxy_call)?;

            return Ok(version.clone());
        }

        self.conf.displayer.flush(proxy_call);

        Err(ManagerError::NoCompatible)
    }

    fn uninstall_specific_version(&self, install_path: &Path, version: &str) {
        if version.is_empty() {
            self.conf
                .displayer
                .display(ManagerError::EmptyVersion.to_string());

            return;
        }

        let target_path = install_path.join(version);
        match fs::remove_dir_all(&target_path) {
            Ok(()) => self.conf.displayer.display(format!(
                "Uninstallation of {} {version} successful (directory {} removed)",
                self.folder_name,
                target_path.display()
            )),
            Err(err) => self.conf.displayer.display(format!(
                "Uninstallation of {} {version} failed with error : {err}",
                self.folder_name
            )),
        }
    }
}

fn env_value(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

fn read_confirmation(mut reader: impl Read) -> bool {
    let mut buffer = [0u8; 1];
    // A failed or empty read keeps the zero byte, which reads as "No".
    let _ = reader.read(&mut buffer);

    matches!(buffer[0], b'y' | b'Y')
}

fn remove_file(file_path: &Path, conf: &Config) -> Result<(), ManagerError> {
    if let Err(err) = fs::remove_file(file_path) {
        if err.kind() != ErrorKind::NotFound {
            return Err(err.into());
        }
    }
    conf.displayer
        .display(format!("Removed {}", file_path.display()));

    Ok(())
}

fn write_file(file_path: &Path, content: &str, conf: &Config) -> Result<(), ManagerError> {
    fs::write(file_path, content)?;
    conf.displayer
        .display(format!("Written {content} in {}", file_path.display()));

    Ok(())
}
