use flate2::read::GzDecoder;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use terv_backend::{ManagerError, ReleaseRetriever};

use crate::client::ReleaseClient;
use crate::error::GithubError;

/// How a tool's release asset must be materialized on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The asset is the tool binary itself.
    Executable,
    /// The asset is a gzipped tarball containing the tool files.
    TarGz,
}

/// `ReleaseRetriever` for a tool published through GitHub releases.
///
/// Installs are staged into a temporary sibling directory and moved into
/// place with a single rename, honoring the retriever atomicity contract:
/// a failed install leaves no target directory behind.
pub struct GithubRetriever {
    client: ReleaseClient,
    release_url: String,
    token: String,
    asset_template: String,
    asset_kind: AssetKind,
    binary_name: String,
}

impl GithubRetriever {
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(
        release_url: impl Into<String>,
        token: impl Into<String>,
        asset_template: impl Into<String>,
        asset_kind: AssetKind,
        binary_name: impl Into<String>,
    ) -> Result<Self, ManagerError> {
        let client = ReleaseClient::new().map_err(ManagerError::from)?;

        Ok(Self {
            client,
            release_url: release_url.into(),
            token: token.into(),
            asset_template: asset_template.into(),
            asset_kind,
            binary_name: binary_name.into(),
        })
    }

    fn asset_name(&self, version: &str) -> String {
        self.asset_template
            .replace("{version}", version)
            .replace("{os}", asset_os())
            .replace("{arch}", asset_arch())
    }

    fn asset_url(&self, version: &str, asset_name: &str) -> Result<String, ManagerError> {
        let searched = vec![asset_name.to_string()];
        let tag = format!("v{version}");
        let urls = match self
            .client
            .download_asset_urls(&tag, &searched, &self.release_url, &self.token)
        {
            Ok(urls) => urls,
            // Some projects tag releases without the `v` prefix.
            Err(GithubError::HttpStatus { status }) if status.as_u16() == 404 => self
                .client
                .download_asset_urls(version, &searched, &self.release_url, &self.token)
                .map_err(ManagerError::from)?,
            Err(err) => return Err(err.into()),
        };

        urls.get(asset_name)
            .cloned()
            .ok_or(ManagerError::AssetNotFound { tag })
    }

    fn stage_asset(&self, data: &[u8], staging_path: &Path) -> Result<(), ManagerError> {
        match self.asset_kind {
            AssetKind::Executable => {
                let binary_path = staging_path.join(&self.binary_name);
                fs::write(&binary_path, data)?;
                make_executable(&binary_path)?;
            }
            AssetKind::TarGz => {
                let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(data)));
                archive.unpack(staging_path)?;
            }
        }

        Ok(())
    }
}

impl ReleaseRetriever for GithubRetriever {
    fn install_release(&self, version: &str, target_path: &Path) -> Result<(), ManagerError> {
        let asset_name = self.asset_name(version);
        let url = self.asset_url(version, &asset_name)?;
        log::debug!("downloading {asset_name} from {url}");
        let data = self.client.download(&url).map_err(ManagerError::from)?;

        let parent = target_path.parent().ok_or_else(|| {
            std::io::Error::other(format!(
                "install target {} has no parent directory",
                target_path.display()
            ))
        })?;
        fs::create_dir_all(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".terv-install-")
            .tempdir_in(parent)?;
        self.stage_asset(&data, staging.path())?;

        // Single rename so the target directory never exists half populated.
        fs::rename(staging.path(), target_path)?;

        Ok(())
    }

    fn list_releases(&self) -> Result<Vec<String>, ManagerError> {
        self.client
            .list_releases(&self.release_url, &self.token)
            .map_err(ManagerError::from)
    }
}

fn asset_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}

fn asset_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        arch => arch,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use mockito::Server;
    use tempfile::TempDir;

    fn retriever_for(server: &Server, kind: AssetKind) -> GithubRetriever {
        GithubRetriever::new(
            format!("{}/releases", server.url()),
            "",
            "tool_{version}_{os}_{arch}",
            kind,
            "tool",
        )
        .expect("retriever should build")
    }

    fn mock_release_with_asset(server: &mut Server, tag: &str, asset_name: &str) {
        let assets_url = format!("{}/assets", server.url());
        let download_url = format!("{}/download/{asset_name}", server.url());
        server
            .mock("GET", format!("/releases/tags/{tag}").as_str())
            .with_body(format!(
                r#"{{"tag_name": "{tag}", "assets_url": "{assets_url}"}}"#
            ))
            .create();
        server
            .mock("GET", "/assets?page=1")
            .with_body(format!(
                r#"[{{"name": "{asset_name}", "browser_download_url": "{download_url}"}}]"#
            ))
            .create();
    }

    #[test]
    fn asset_name_expands_template_placeholders() {
        let server = Server::new();
        let retriever = retriever_for(&server, AssetKind::Executable);

        let name = retriever.asset_name("1.6.2");

        assert!(name.starts_with("tool_1.6.2_"));
        assert!(!name.contains('{'));
    }

    #[test]
    fn install_release_places_executable_asset_atomically() {
        let mut server = Server::new();
        let retriever = retriever_for(&server, AssetKind::Executable);
        let asset_name = retriever.asset_name("1.6.2");
        mock_release_with_asset(&mut server, "v1.6.2", &asset_name);
        server
            .mock("GET", format!("/download/{asset_name}").as_str())
            .with_body(b"#!/bin/sh\necho tool\n")
            .create();

        let root = TempDir::new().expect("temp dir should be created");
        let target = root.path().join("1.6.2");
        retriever
            .install_release("1.6.2", &target)
            .expect("install should succeed");

        assert!(target.join("tool").is_file());
        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .expect("install root should be readable")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name() != "1.6.2")
            .collect();
        assert!(leftovers.is_empty(), "no staging leftovers expected");
    }

    #[test]
    fn install_release_unpacks_tarball_assets() {
        let mut server = Server::new();
        let retriever = retriever_for(&server, AssetKind::TarGz);
        let asset_name = retriever.asset_name("1.6.2");
        mock_release_with_asset(&mut server, "v1.6.2", &asset_name);

        let mut tarball = Vec::new();
        {
            let encoder = GzEncoder::new(&mut tarball, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_size(5);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "tool", &b"tool\n"[..])
                .expect("tar entry should append");
            builder
                .into_inner()
                .expect("tar should finish")
                .finish()
                .expect("gzip should finish");
        }
        server
            .mock("GET", format!("/download/{asset_name}").as_str())
            .with_body(tarball)
            .create();

        let root = TempDir::new().expect("temp dir should be created");
        let target = root.path().join("1.6.2");
        retriever
            .install_release("1.6.2", &target)
            .expect("install should succeed");

        assert!(target.join("tool").is_file());
    }

    #[test]
    fn install_release_falls_back_to_unprefixed_tag() {
        let mut server = Server::new();
        let retriever = retriever_for(&server, AssetKind::Executable);
        let asset_name = retriever.asset_name("1.6.2");
        server
            .mock("GET", "/releases/tags/v1.6.2")
            .with_status(404)
            .create();
        mock_release_with_asset(&mut server, "1.6.2", &asset_name);
        server
            .mock("GET", format!("/download/{asset_name}").as_str())
            .with_body(b"tool")
            .create();

        let root = TempDir::new().expect("temp dir should be created");
        let target = root.path().join("1.6.2");
        retriever
            .install_release("1.6.2", &target)
            .expect("install should succeed");

        assert!(target.join("tool").is_file());
    }

    #[test]
    fn failed_download_leaves_no_target_directory() {
        let mut server = Server::new();
        let retriever = retriever_for(&server, AssetKind::Executable);
        let asset_name = retriever.asset_name("1.6.2");
        mock_release_with_asset(&mut server, "v1.6.2", &asset_name);
        server
            .mock("GET", format!("/download/{asset_name}").as_str())
            .with_status(500)
            .create();

        let root = TempDir::new().expect("temp dir should be created");
        let target = root.path().join("1.6.2");
        let result = retriever.install_release("1.6.2", &target);

        assert!(result.is_err());
        assert!(!target.exists());
    }
}
