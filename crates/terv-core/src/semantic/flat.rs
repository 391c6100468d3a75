use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use terv_backend::ManagerError;

use crate::config::Config;

/// Read a flat version file: one line holding a version or constraint.
/// An absent file reads as the empty string, which callers treat as "not
/// present". A detection line is displayed when a value is found.
///
/// # Errors
/// Fails when the file exists but cannot be read.
pub fn retrieve_version(path: &Path, conf: &Config) -> Result<String, ManagerError> {
    retrieve(path, conf, true)
}

/// Same as [`retrieve_version`], with the detection line optional (constraint
/// lookups read silently).
///
/// # Errors
/// Fails when the file exists but cannot be read.
pub fn retrieve(path: &Path, conf: &Config, display_found: bool) -> Result<String, ManagerError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(String::new()),
        Err(err) => return Err(err.into()),
    };

    let value = content.trim().to_string();
    if display_found && !value.is_empty() {
        conf.displayer
            .display(format!("Resolved version from {} : {value}", path.display()));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use terv_backend::Displayer;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            root_path: dir.path().to_path_buf(),
            working_dir: dir.path().to_path_buf(),
            no_install: false,
            force_remote: false,
            github_token: String::new(),
            displayer: Displayer::direct(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().expect("temp dir should be created");
        let conf = test_config(&dir);

        let value = retrieve_version(&dir.path().join("version"), &conf)
            .expect("missing file should not error");

        assert!(value.is_empty());
    }

    #[test]
    fn file_content_is_trimmed() {
        let dir = TempDir::new().expect("temp dir should be created");
        let conf = test_config(&dir);
        let path = dir.path().join("version");
        fs::write(&path, "  1.6.2\n").expect("version file should be written");

        let value = retrieve_version(&path, &conf).expect("file should be read");

        assert_eq!(value, "1.6.2");
    }
}
