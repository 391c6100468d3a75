use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use terv_backend::ManagerError;

use crate::config::Config;

/// One IaC source-file family to scan for embedded version constraints.
#[derive(Debug, Clone, Copy)]
pub struct ExtDescription {
    pub ext: &'static str,
}

/// Collect every `required_version` constraint declared by matching IaC
/// files in the working directory. Order is not significant: the aggregated
/// constraints are conjunctive.
///
/// # Errors
/// Fails when a matching file exists but cannot be read.
pub fn gather_constraints(
    exts: &[ExtDescription],
    conf: &Config,
) -> Result<Vec<String>, ManagerError> {
    let mut constraints = Vec::new();
    if exts.is_empty() {
        return Ok(constraints);
    }

    let entries = match fs::read_dir(&conf.working_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(constraints),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !matches_extension(&path, exts) {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        for constraint in extract_required_versions(&content) {
            conf.displayer.display(format!(
                "Found version constraint {constraint} in {}",
                path.display()
            ));
            constraints.push(constraint);
        }
    }

    Ok(constraints)
}

fn matches_extension(path: &Path, exts: &[ExtDescription]) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    exts.iter().any(|ext| name.ends_with(ext.ext))
}

fn extract_required_versions(content: &str) -> Vec<String> {
    let mut found = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("required_version") else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let Some(quoted) = rest.trim_start().strip_prefix('"') else {
            continue;
        };
        if let Some((value, _)) = quoted.split_once('"') {
            found.push(value.to_string());
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use terv_backend::Displayer;

    const TF_EXTS: [ExtDescription; 2] =
        [ExtDescription { ext: ".tf" }, ExtDescription { ext: ".tofu" }];

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
    fn extract_required_versions_reads_quoted_values() {
        let content = r#"
terraform {
  required_version = ">= 1.5, < 2.0"

  required_providers {
    aws = ">= 5.0"
  }
}
"#;

        assert_eq!(extract_required_versions(content), [">= 1.5, < 2.0"]);
    }

    #[test]
    fn gather_constraints_scans_matching_files_only() {
        let dir = TempDir::new().expect("temp dir should be created");
        let conf = test_config(&dir);
        fs::write(
            dir.path().join("versions.tf"),
            "terraform {\n  required_version = \">= 1.5\"\n}\n",
        )
        .expect("tf file should be written");
        fs::write(
            dir.path().join("notes.txt"),
            "required_version = \"ignored\"\n",
        )
        .expect("txt file should be written");

        let constraints =
            gather_constraints(&TF_EXTS, &conf).expect("constraint scan should succeed");

        assert_eq!(constraints, [">= 1.5"]);
    }

    #[test]
    fn gather_constraints_is_empty_without_iac_files() {
        let dir = TempDir::new().expect("temp dir should be created");
        let conf = test_config(&dir);

        let constraints =
            gather_constraints(&TF_EXTS, &conf).expect("constraint scan should succeed");

        assert!(constraints.is_empty());
    }
}
