use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const LAST_USE_FILE_NAME: &str = ".last-use";

/// Read the last-use timestamp sidecar of an installed version directory.
/// Absence and unreadable content are both non-fatal.
#[must_use]
pub fn read(version_path: &Path) -> Option<DateTime<Utc>> {
    let sidecar = version_path.join(LAST_USE_FILE_NAME);
    let content = match fs::read_to_string(&sidecar) {
        Ok(content) => content,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                log::warn!("could not read {}: {err}", sidecar.display());
            }
            return None;
        }
    };

    match DateTime::parse_from_rfc3339(content.trim()) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(err) => {
            log::warn!("unreadable timestamp in {}: {err}", sidecar.display());
            None
        }
    }
}

/// Record that the version under `version_path` was just used. Failures are
/// logged, never propagated: last-use tracking must not break tool runs.
pub fn write_now(version_path: &Path) {
    let sidecar = version_path.join(LAST_USE_FILE_NAME);
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    if let Err(err) = fs::write(&sidecar, now) {
        log::warn!("could not write {}: {err}", sidecar.display());
    }
}
