use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};

use crate::error::GithubError;

const PAGE_QUERY: &str = "?page=";

/// One release object, narrowed to the two fields the client reads.
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    assets_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: Option<String>,
    browser_download_url: Option<String>,
}

/// Outcome of scanning one page of a paginated listing.
enum PageOutcome {
    Done,
    More,
}

/// Client for a GitHub-style releases API. No caching, no retry: transport
/// and status failures surface directly, shape violations surface as
/// `BadResponse`.
pub struct ReleaseClient {
    http: reqwest::blocking::Client,
}

impl ReleaseClient {
    /// # Errors
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, GithubError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("terv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GithubError::Request)?;

        Ok(Self { http })
    }

    /// List every release tag across all pages, canonicalized.
    ///
    /// # Errors
    /// Fails on transport errors, non-2xx statuses and malformed release
    /// objects.
    pub fn list_releases(
        &self,
        release_url: &str,
        token: &str,
    ) -> Result<Vec<String>, GithubError> {
        let mut releases = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!("{release_url}{PAGE_QUERY}{page}");
            let page_releases: Vec<Release> = self.get_json(&url, token)?;
            if page_releases.is_empty() {
                return Ok(releases);
            }

            for release in page_releases {
                releases.push(canonical_tag(&release.tag_name)?);
            }
            page += 1;
        }
    }

    /// Tag of the latest release, canonicalized.
    ///
    /// # Errors
    /// Fails on transport errors, non-2xx statuses and a missing tag name.
    pub fn latest_release(&self, release_url: &str, token: &str) -> Result<String, GithubError> {
        let release: Release = self.get_json(&join_url(release_url, "latest"), token)?;

        canonical_tag(&release.tag_name)
    }

    /// Find the download URLs of `searched_names` within the release tagged
    /// `tag`, paging through its asset listing and stopping as soon as every
    /// searched name has been seen.
    ///
    /// # Errors
    /// `AssetNotFound` when the asset pages run out before the searched set
    /// is complete, `BadResponse` on malformed release or asset objects.
    pub fn download_asset_urls(
        &self,
        tag: &str,
        searched_names: &[String],
        release_url: &str,
        token: &str,
    ) -> Result<HashMap<String, String>, GithubError> {
        let release: Release =
            self.get_json(&join_url(release_url, &format!("tags/{tag}")), token)?;
        let assets_url = release
            .assets_url
            .filter(|url| !url.is_empty())
            .ok_or(GithubError::BadResponse {
                context: "release assets_url",
            })?;

        let mut remaining: HashSet<&str> =
            searched_names.iter().map(String::as_str).collect();
        let mut assets = HashMap::with_capacity(searched_names.len());
        if remaining.is_empty() {
            return Ok(assets);
        }

        let mut page = 1u32;
        loop {
            let url = format!("{assets_url}{PAGE_QUERY}{page}");
            let page_assets: Vec<Asset> = self.get_json(&url, token)?;
            if page_assets.is_empty() {
                return Err(GithubError::AssetNotFound {
                    tag: tag.to_string(),
                });
            }

            match scan_assets(page_assets, &mut remaining, &mut assets)? {
                PageOutcome::Done => return Ok(assets),
                PageOutcome::More => page += 1,
            }
        }
    }

    /// Download the raw content behind an asset URL.
    ///
    /// # Errors
    /// Fails on transport errors and non-2xx statuses.
    pub fn download(&self, url: &str) -> Result<Vec<u8>, GithubError> {
        let response = self.http.get(url).send().map_err(GithubError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::HttpStatus { status });
        }

        let bytes = response.bytes().map_err(GithubError::Request)?;

        Ok(bytes.to_vec())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, GithubError> {
        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if !token.is_empty() {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().map_err(GithubError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::HttpStatus { status });
        }

        response.json().map_err(|err| {
            log::debug!("undecodable release catalog response from {url}: {err}");
            GithubError::BadResponse {
                context: "decodable response body",
            }
        })
    }
}

fn scan_assets(
    page_assets: Vec<Asset>,
    remaining: &mut HashSet<&str>,
    assets: &mut HashMap<String, String>,
) -> Result<PageOutcome, GithubError> {
    for asset in page_assets {
        let name = asset.name.ok_or(GithubError::BadResponse {
            context: "asset name",
        })?;
        if !remaining.contains(name.as_str()) {
            continue;
        }

        let download_url = asset
            .browser_download_url
            .ok_or(GithubError::BadResponse {
                context: "asset browser_download_url",
            })?;
        remaining.remove(name.as_str());
        assets.insert(name, download_url);

        if remaining.is_empty() {
            return Ok(PageOutcome::Done);
        }
    }

    Ok(PageOutcome::More)
}

fn canonical_tag(tag_name: &str) -> Result<String, GithubError> {
    if tag_name.is_empty() {
        return Err(GithubError::BadResponse {
            context: "release tag_name",
        });
    }

    Ok(tag_name
        .strip_prefix('v')
        .unwrap_or(tag_name)
        .to_string())
}

fn join_url(base: &str, segment: &str) -> String {
    format!("{}/{segment}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn list_releases_walks_pages_and_canonicalizes_tags() {
        let mut server = Server::new();
        let first = server
            .mock("GET", "/releases?page=1")
            .match_header("accept", "application/vnd.github+json")
            .match_header("x-github-api-version", "2022-11-28")
            .with_body(r#"[{"tag_name": "v1.6.0"}, {"tag_name": "1.5.7"}]"#)
            .create();
        let second = server
            .mock("GET", "/releases?page=2")
            .with_body(r#"[{"tag_name": "v1.5.0"}]"#)
            .create();
        let last = server.mock("GET", "/releases?page=3").with_body("[]").create();

        let client = ReleaseClient::new().expect("client should build");
        let releases = client
            .list_releases(&format!("{}/releases", server.url()), "")
            .expect("listing should succeed");

        first.assert();
        second.assert();
        last.assert();
        assert_eq!(releases, ["1.6.0", "1.5.7", "1.5.0"]);
    }

    #[test]
    fn list_releases_rejects_missing_tag_name() {
        let mut server = Server::new();
        server
            .mock("GET", "/releases?page=1")
            .with_body(r#"[{"assets_url": "whatever"}]"#)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        let result = client.list_releases(&format!("{}/releases", server.url()), "");

        assert!(matches!(
            result,
            Err(GithubError::BadResponse {
                context: "release tag_name"
            })
        ));
    }

    #[test]
    fn list_releases_surfaces_http_status() {
        let mut server = Server::new();
        server
            .mock("GET", "/releases?page=1")
            .with_status(403)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        let result = client.list_releases(&format!("{}/releases", server.url()), "");

        assert!(
            matches!(result, Err(GithubError::HttpStatus { status }) if status.as_u16() == 403)
        );
    }

    #[test]
    fn latest_release_strips_v_prefix() {
        let mut server = Server::new();
        server
            .mock("GET", "/releases/latest")
            .with_body(r#"{"tag_name": "v1.7.1"}"#)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        let latest = client
            .latest_release(&format!("{}/releases", server.url()), "")
            .expect("latest lookup should succeed");

        assert_eq!(latest, "1.7.1");
    }

    #[test]
    fn bearer_token_is_sent_only_when_non_empty() {
        let mut server = Server::new();
        let with_auth = server
            .mock("GET", "/releases/latest")
            .match_header("authorization", "Bearer s3cret")
            .with_body(r#"{"tag_name": "v1.0.0"}"#)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        client
            .latest_release(&format!("{}/releases", server.url()), "s3cret")
            .expect("authorized lookup should succeed");
        with_auth.assert();

        let without_auth = server
            .mock("GET", "/releases/latest")
            .match_header("authorization", Matcher::Missing)
            .with_body(r#"{"tag_name": "v1.0.0"}"#)
            .create();

        client
            .latest_release(&format!("{}/releases", server.url()), "")
            .expect("anonymous lookup should succeed");
        without_auth.assert();
    }

    #[test]
    fn download_asset_urls_stops_once_all_names_are_found() {
        let mut server = Server::new();
        let assets_url = format!("{}/assets", server.url());
        server
            .mock("GET", "/releases/tags/v1.6.2")
            .with_body(format!(r#"{{"tag_name": "v1.6.2", "assets_url": "{assets_url}"}}"#))
            .create();
        server
            .mock("GET", "/assets?page=1")
            .with_body(
                r#"[
                    {"name": "checksums.txt", "browser_download_url": "https://dl/checksums.txt"},
                    {"name": "tool_1.6.2_linux_amd64.tar.gz", "browser_download_url": "https://dl/tool.tar.gz"}
                ]"#,
            )
            .create();
        let unfetched_page = server.mock("GET", "/assets?page=2").expect(0).create();

        let client = ReleaseClient::new().expect("client should build");
        let urls = client
            .download_asset_urls(
                "v1.6.2",
                &["tool_1.6.2_linux_amd64.tar.gz".to_string()],
                &format!("{}/releases", server.url()),
                "",
            )
            .expect("asset lookup should succeed");

        unfetched_page.assert();
        assert_eq!(urls.len(), 1);
        assert_eq!(
            urls["tool_1.6.2_linux_amd64.tar.gz"],
            "https://dl/tool.tar.gz"
        );
    }

    #[test]
    fn download_asset_urls_crosses_pages_when_needed() {
        let mut server = Server::new();
        let assets_url = format!("{}/assets", server.url());
        server
            .mock("GET", "/releases/tags/v1.6.2")
            .with_body(format!(r#"{{"tag_name": "v1.6.2", "assets_url": "{assets_url}"}}"#))
            .create();
        server
            .mock("GET", "/assets?page=1")
            .with_body(r#"[{"name": "other.zip", "browser_download_url": "https://dl/other.zip"}]"#)
            .create();
        server
            .mock("GET", "/assets?page=2")
            .with_body(r#"[{"name": "wanted.tar.gz", "browser_download_url": "https://dl/wanted.tar.gz"}]"#)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        let urls = client
            .download_asset_urls(
                "v1.6.2",
                &["wanted.tar.gz".to_string()],
                &format!("{}/releases", server.url()),
                "",
            )
            .expect("asset lookup should succeed");

        assert_eq!(urls["wanted.tar.gz"], "https://dl/wanted.tar.gz");
    }

    #[test]
    fn download_asset_urls_fails_when_pages_run_out() {
        let mut server = Server::new();
        let assets_url = format!("{}/assets", server.url());
        server
            .mock("GET", "/releases/tags/v1.6.2")
            .with_body(format!(r#"{{"tag_name": "v1.6.2", "assets_url": "{assets_url}"}}"#))
            .create();
        server
            .mock("GET", "/assets?page=1")
            .with_body(r#"[{"name": "other.zip", "browser_download_url": "https://dl/other.zip"}]"#)
            .create();
        server.mock("GET", "/assets?page=2").with_body("[]").create();

        let client = ReleaseClient::new().expect("client should build");
        let result = client.download_asset_urls(
            "v1.6.2",
            &["missing.tar.gz".to_string()],
            &format!("{}/releases", server.url()),
            "",
        );

        assert!(matches!(result, Err(GithubError::AssetNotFound { tag }) if tag == "v1.6.2"));
    }

    #[test]
    fn download_asset_urls_rejects_matched_asset_without_url() {
        let mut server = Server::new();
        let assets_url = format!("{}/assets", server.url());
        server
            .mock("GET", "/releases/tags/v1.6.2")
            .with_body(format!(r#"{{"tag_name": "v1.6.2", "assets_url": "{assets_url}"}}"#))
            .create();
        server
            .mock("GET", "/assets?page=1")
            .with_body(r#"[{"name": "wanted.tar.gz"}]"#)
            .create();

        let client = ReleaseClient::new().expect("client should build");
        let result = client.download_asset_urls(
            "v1.6.2",
            &["wanted.tar.gz".to_string()],
            &format!("{}/releases", server.url()),
            "",
        );

        assert!(matches!(
            result,
            Err(GithubError::BadResponse {
                context: "asset browser_download_url"
            })
        ));
    }
}
