//! Release catalog client for GitHub-style releases APIs, and the retriever
//! that installs releases from them.

mod client;
mod error;
mod retriever;

pub use client::ReleaseClient;
pub use error::GithubError;
pub use retriever::{AssetKind, GithubRetriever};
