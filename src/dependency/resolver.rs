//! Dependency resolution from the buildpack catalogue

use crate::dependency::Dependency;
use crate::error::{BuildpackError, BuildpackResult};
use semver::{Version, VersionReq};
use tracing::{debug, warn};

/// Picks a dependency by id, version constraint and stack
pub struct DependencyResolver<'a> {
    dependencies: &'a [Dependency],
    stack: Option<String>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(dependencies: &'a [Dependency], stack: Option<String>) -> Self {
        Self {
            dependencies,
            stack: stack.filter(|s| !s.is_empty()),
        }
    }

    /// Resolve the highest version of `id` satisfying `constraint`.
    ///
    /// An empty constraint or `*` matches any version. A bare version
    /// (`20.10.0`) matches exactly that version.
    pub fn resolve(&self, id: &str, constraint: &str) -> BuildpackResult<Dependency> {
        let req = parse_constraint(constraint)?;

        let mut candidates: Vec<(Version, &Dependency)> = self
            .dependencies
            .iter()
            .filter(|d| d.id == id)
            .filter(|d| match &self.stack {
                Some(stack) => d.supports_stack(stack),
                None => true,
            })
            .filter_map(|d| match parse_version(&d.version) {
                Some(v) => Some((v, d)),
                None => {
                    warn!("Ignoring {} with unparseable version {}", d.id, d.version);
                    None
                }
            })
            .filter(|(v, _)| req.matches(v))
            .collect();

        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        match candidates.first() {
            Some((version, dep)) => {
                debug!("Resolved {} {} to {}", id, constraint, version);
                Ok((*dep).clone())
            }
            None => Err(BuildpackError::DependencyNotFound {
                id: id.to_string(),
                version: constraint.to_string(),
                stack: self.stack.clone().unwrap_or_else(|| "*".to_string()),
            }),
        }
    }
}

fn parse_constraint(constraint: &str) -> BuildpackResult<VersionReq> {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" {
        return Ok(VersionReq::STAR);
    }

    if let Ok(exact) = Version::parse(constraint) {
        return Ok(VersionReq {
            comparators: vec![semver::Comparator {
                op: semver::Op::Exact,
                major: exact.major,
                minor: Some(exact.minor),
                patch: Some(exact.patch),
                pre: exact.pre,
            }],
        });
    }

    VersionReq::parse(constraint).map_err(|e| BuildpackError::InvalidVersion {
        constraint: constraint.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a catalogue version, padding `20` / `20.10` to full semver
fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(version) {
        return Some(v);
    }

    let parts = version.split('.').count();
    let padded = match parts {
        1 => format!("{version}.0.0"),
        2 => format!("{version}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}
