//! Shared vocabulary for the terv version manager: version string handling,
//! the release retriever seam, the shared error type and the buffering
//! display sink.

mod display;
mod error;
mod traits;
mod types;

pub use display::Displayer;
pub use error::ManagerError;
pub use traits::ReleaseRetriever;
pub use types::{DatedVersion, canonical, cmp_versions, is_stable, parse_loose, sort_versions};
