use terv_backend::ManagerError;
use terv_core::semantic::flat;
use terv_core::semantic::iac::ExtDescription;
use terv_core::{Config, ToolDescription, VersionFile, VersionManager};
use terv_github::{AssetKind, GithubRetriever};

/// Everything needed to manage one tool: engine description plus the
/// release-catalog coordinates of its GitHub project.
pub struct ToolDefinition {
    pub folder_name: &'static str,
    pub version_env_name: &'static str,
    pub default_version_env_name: &'static str,
    pub constraint_env_name: &'static str,
    pub release_url: &'static str,
    pub asset_template: &'static str,
    pub asset_kind: AssetKind,
    pub binary_name: &'static str,
    pub version_files: &'static [VersionFile],
    pub iac_exts: &'static [ExtDescription],
}

pub const OPENTOFU: ToolDefinition = ToolDefinition {
    folder_name: "OpenTofu",
    version_env_name: "TERV_TOFU_VERSION",
    default_version_env_name: "TERV_TOFU_DEFAULT_VERSION",
    constraint_env_name: "TERV_TOFU_DEFAULT_CONSTRAINT",
    release_url: "https://api.github.com/repos/opentofu/opentofu/releases",
    asset_template: "tofu_{version}_{os}_{arch}.tar.gz",
    asset_kind: AssetKind::TarGz,
    binary_name: "tofu",
    version_files: &[
        VersionFile {
            name: ".opentofu-version",
            parser: flat::retrieve_version,
        },
        VersionFile {
            name: ".terraform-version",
            parser: flat::retrieve_version,
        },
    ],
    iac_exts: &[
        ExtDescription { ext: ".tofu" },
        ExtDescription { ext: ".tf" },
    ],
};

pub const TERRAGRUNT: ToolDefinition = ToolDefinition {
    folder_name: "Terragrunt",
    version_env_name: "TERV_TG_VERSION",
    default_version_env_name: "TERV_TG_DEFAULT_VERSION",
    constraint_env_name: "TERV_TG_DEFAULT_CONSTRAINT",
    release_url: "https://api.github.com/repos/gruntwork-io/terragrunt/releases",
    asset_template: "terragrunt_{os}_{arch}",
    asset_kind: AssetKind::Executable,
    binary_name: "terragrunt",
    version_files: &[VersionFile {
        name: ".terragrunt-version",
        parser: flat::retrieve_version,
    }],
    iac_exts: &[ExtDescription { ext: ".hcl" }],
};

impl ToolDefinition {
    /// Build the engine for this tool against the given configuration.
    ///
    /// # Errors
    /// Fails when the release retriever cannot be constructed.
    pub fn manager<'a>(&self, conf: &'a Config) -> Result<VersionManager<'a>, ManagerError> {
        let retriever = GithubRetriever::new(
            self.release_url,
            conf.github_token.clone(),
            self.asset_template,
            self.asset_kind,
            self.binary_name,
        )?;

        Ok(VersionManager::new(
            conf,
            ToolDescription {
                folder_name: self.folder_name.to_string(),
                version_env_name: self.version_env_name.to_string(),
                default_version_env_name: self.default_version_env_name.to_string(),
                constraint_env_name: self.constraint_env_name.to_string(),
                version_files: self.version_files.to_vec(),
                iac_exts: self.iac_exts.to_vec(),
            },
            Box::new(retriever),
        ))
    }
}
