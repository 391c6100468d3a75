use chrono::{DateTime, Utc};
use semver::Version;
use std::cmp::Ordering;

/// An installed version decorated with the last time its binary was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedVersion {
    pub use_date: Option<DateTime<Utc>>,
    pub version: String,
}

/// Parse a version string, tolerating a leading `v`, surrounding whitespace
/// and missing minor/patch components (`1.6` reads as `1.6.0`).
#[must_use]
pub fn parse_loose(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);

    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let (core, suffix) = split_core_and_suffix(version);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
    let patch = parts.next().and_then(|part| part.parse::<u64>().ok());

    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, None) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
        (None, Some(_)) => return None,
    };

    Version::parse(&normalized).ok()
}

fn split_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    (&version[..suffix_idx], &version[suffix_idx..])
}

/// Canonical rendering of a concrete version: no `v` prefix, all three
/// numeric components present. Returns `None` when the input is not a
/// parseable version (a constraint expression or a strategy keyword).
#[must_use]
pub fn canonical(version: &str) -> Option<String> {
    parse_loose(version).map(|parsed| parsed.to_string())
}

/// `true` when the version parses and carries no pre-release component.
#[must_use]
pub fn is_stable(version: &str) -> bool {
    parse_loose(version).is_some_and(|parsed| parsed.pre.is_empty())
}

/// Order two version strings by loose semver value, falling back to a plain
/// string comparison when either side does not parse.
#[must_use]
pub fn cmp_versions(a: &str, b: &str) -> Ordering {
    match (parse_loose(a), parse_loose(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Sort a version list ascending, or descending when `reverse_order` is set.
pub fn sort_versions(versions: &mut [String], reverse_order: bool) {
    versions.sort_by(|a, b| {
        let ordering = cmp_versions(a, b);
        if reverse_order {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
