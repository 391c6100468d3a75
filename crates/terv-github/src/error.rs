use terv_backend::ManagerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("release catalog request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("release catalog request failed with HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },

    #[error("unexpected release catalog response: missing {context}")]
    BadResponse { context: &'static str },

    #[error("no matching asset found in release {tag}")]
    AssetNotFound { tag: String },
}

impl From<GithubError> for ManagerError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Request(source) => {
                ManagerError::network("release catalog request", source.to_string())
            }
            GithubError::HttpStatus { status } => {
                ManagerError::network("release catalog request", format!("HTTP {status}"))
            }
            GithubError::BadResponse { context } => ManagerError::BadResponse { context },
            GithubError::AssetNotFound { tag } => ManagerError::AssetNotFound { tag },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_response_maps_to_manager_bad_response() {
        let mapped = ManagerError::from(GithubError::BadResponse {
            context: "release tag_name",
        });
        assert!(matches!(
            mapped,
            ManagerError::BadResponse {
                context: "release tag_name"
            }
        ));
    }

    #[test]
    fn asset_not_found_keeps_the_tag() {
        let mapped = ManagerError::from(GithubError::AssetNotFound {
            tag: "v1.6.2".to_string(),
        });
        assert!(matches!(mapped, ManagerError::AssetNotFound { tag } if tag == "v1.6.2"));
    }
}
