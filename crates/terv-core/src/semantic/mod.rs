//! Requested-version semantics: strategy keywords, constraint expressions
//! and the predicates they expand to.

pub mod flat;
pub mod iac;

use semver::VersionReq;

use terv_backend::{Displayer, ManagerError, is_stable, parse_loose};

use crate::manager::VersionManager;

pub const LATEST_KEY: &str = "latest";
pub const LATEST_STABLE_KEY: &str = "latest-stable";
pub const LATEST_PRE_KEY: &str = "latest-pre";
pub const LATEST_ALLOWED_KEY: &str = "latest-allowed";
pub const MIN_REQUIRED_KEY: &str = "min-required";

/// A decision function over version strings plus the scan direction of the
/// list it should be applied to (`reverse_order` means newest first).
pub struct PredicateInfo {
    predicate: Box<dyn Fn(&str) -> bool>,
    pub reverse_order: bool,
}

impl PredicateInfo {
    #[must_use]
    pub fn matches(&self, version: &str) -> bool {
        (self.predicate)(version)
    }

    /// First element of an already-ordered list satisfying the predicate.
    #[must_use]
    pub fn select<'a>(&self, versions: &'a [String]) -> Option<&'a String> {
        versions.iter().find(|version| self.matches(version))
    }
}

/// Expand a strategy keyword or constraint expression into a predicate.
///
/// `latest-allowed` and `min-required` aggregate the constraints declared in
/// the working directory's IaC files, falling back to the manager's default
/// constraint, and to a stable-only match when nothing constrains the tool.
///
/// # Errors
/// Fails when a constraint expression does not parse, or when IaC files
/// cannot be read.
pub fn parse_predicate(
    requested: &str,
    manager: &VersionManager,
) -> Result<PredicateInfo, ManagerError> {
    match requested {
        LATEST_KEY | LATEST_STABLE_KEY => Ok(stable_predicate(true)),
        LATEST_PRE_KEY => Ok(PredicateInfo {
            predicate: Box::new(|version| parse_loose(version).is_some()),
            reverse_order: true,
        }),
        LATEST_ALLOWED_KEY => constrained_predicate(manager, true),
        MIN_REQUIRED_KEY => constrained_predicate(manager, false),
        expression => {
            let requirement = parse_requirement(expression)?;
            Ok(PredicateInfo {
                predicate: requirement_predicate(vec![requirement]),
                reverse_order: true,
            })
        }
    }
}

/// Parse one constraint expression, tolerating the HCL pessimistic operator
/// (`~>` reads as `~`).
///
/// # Errors
/// Fails with `InvalidConstraint` when the expression is not a valid
/// requirement.
pub fn parse_requirement(constraint: &str) -> Result<VersionReq, ManagerError> {
    let normalized = constraint.replace("~>", "~");

    VersionReq::parse(&normalized).map_err(|err| ManagerError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: err.to_string(),
    })
}

/// Expand an uninstall target into the subset of `versions` to remove:
/// `all` selects everything, anything else is read as a constraint
/// expression.
///
/// # Errors
/// Fails when the target is neither `all` nor a parseable constraint.
pub fn select_versions_to_uninstall(
    requested: &str,
    versions: &[String],
) -> Result<Vec<String>, ManagerError> {
    if requested == "all" {
        return Ok(versions.to_vec());
    }

    let requirement = parse_requirement(requested)?;
    let predicate = requirement_predicate(vec![requirement]);

    Ok(versions
        .iter()
        .filter(|version| predicate(version))
        .cloned()
        .collect())
}

/// Display where a requested version was detected, passing the value through.
pub fn display_detection_info(displayer: &Displayer, version: String, source: &str) -> String {
    displayer.display(format!("Resolved version from {source} : {version}"));

    version
}

fn constrained_predicate(
    manager: &VersionManager,
    reverse_order: bool,
) -> Result<PredicateInfo, ManagerError> {
    let mut constraints = iac::gather_constraints(manager.iac_exts(), manager.conf())?;
    if constraints.is_empty() {
        let default_constraint = manager.read_default_constraint();
        if !default_constraint.is_empty() {
            constraints.push(default_constraint);
        }
    }

    if constraints.is_empty() {
        return Ok(stable_predicate(reverse_order));
    }

    let requirements = constraints
        .iter()
        .map(|constraint| parse_requirement(constraint))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PredicateInfo {
        predicate: requirement_predicate(requirements),
        reverse_order,
    })
}

fn stable_predicate(reverse_order: bool) -> PredicateInfo {
    PredicateInfo {
        predicate: Box::new(is_stable),
        reverse_order,
    }
}

fn requirement_predicate(requirements: Vec<VersionReq>) -> Box<dyn Fn(&str) -> bool> {
    Box::new(move |version| {
        parse_loose(version)
            .is_some_and(|parsed| requirements.iter().all(|requirement| requirement.matches(&parsed)))
    })
}
