//! Canonical package identity: a name paired with a semantic version.

use crate::{PackageError, Result};
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;

/// A package identity: `name@version`.
///
/// Ordered by name (lexicographic), then by semver precedence. The string
/// form round-trips through [`PackageId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse a `name@version` string.
    pub fn parse(s: &str) -> Result<Self> {
        let (name, version) = s
            .split_once('@')
            .ok_or_else(|| PackageError::MalformedPackageId(s.to_string()))?;

        if !is_valid_name(name) {
            return Err(PackageError::MalformedPackageId(s.to_string()));
        }
        // A second '@' is never valid.
        if version.contains('@') {
            return Err(PackageError::MalformedPackageId(s.to_string()));
        }

        let version = Version::parse(version).map_err(|error| PackageError::MalformedVersion {
            input: s.to_string(),
            error,
        })?;

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for PackageId {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Package names are non-empty ASCII identifiers starting alphanumeric.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// A requirement on a package: a name and the version range it must satisfy.
///
/// The range grammar is whatever [`semver::VersionReq`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub req: VersionReq,
}

impl Dependency {
    pub fn new(name: impl Into<String>, req: VersionReq) -> Self {
        Self {
            name: name.into(),
            req,
        }
    }

    /// Parse the requirement string from a manifest entry.
    pub fn from_entry(name: &str, req: &str) -> Result<Self> {
        let parsed = VersionReq::parse(req).map_err(|error| PackageError::MalformedRequirement {
            name: name.to_string(),
            input: req.to_string(),
            error,
        })?;
        Ok(Self::new(name, parsed))
    }

    /// Whether a package satisfies this requirement.
    pub fn matches(&self, pkg: &PackageId) -> bool {
        pkg.name == self.name && self.req.matches(&pkg.version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple() {
        let id = PackageId::parse("foo@1.2.3").unwrap();
        assert_eq!(id.name, "foo");
        assert_eq!(id.version, Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let id = PackageId::parse("foo@1.2.3-beta.1+build5").unwrap();
        assert_eq!(id.version.pre.as_str(), "beta.1");
        assert_eq!(id.version.build.as_str(), "build5");
    }

    #[test]
    fn test_round_trip() {
        for s in ["foo@1.2.3", "my-lib@0.1.0", "a.b_c@2.0.0-rc.1"] {
            let id = PackageId::parse(s).unwrap();
            assert_eq!(PackageId::parse(&id.to_string()).unwrap(), id);
            assert_eq!(id.to_string(), s);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in ["", "foo", "@1.2.3", "foo@", "foo@bar@1.0.0", "-foo@1.0.0", "foo@1.2"] {
            assert!(PackageId::parse(s).is_err(), "should reject {:?}", s);
        }
    }

    #[test]
    fn test_ordering_trichotomy() {
        let ids = [
            PackageId::parse("a@1.0.0").unwrap(),
            PackageId::parse("a@2.0.0").unwrap(),
            PackageId::parse("b@1.0.0").unwrap(),
        ];
        for x in &ids {
            for y in &ids {
                let lt = x < y;
                let gt = y < x;
                let eq = x == y;
                assert_eq!(
                    1,
                    usize::from(lt) + usize::from(gt) + usize::from(eq),
                    "exactly one of <, >, == must hold for {} vs {}",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_ordering_name_before_version() {
        let a2 = PackageId::parse("a@2.0.0").unwrap();
        let b1 = PackageId::parse("b@1.0.0").unwrap();
        assert!(a2 < b1);
    }

    #[test]
    fn test_semver_precedence_in_order() {
        let pre = PackageId::parse("a@1.0.0-alpha").unwrap();
        let rel = PackageId::parse("a@1.0.0").unwrap();
        assert!(pre < rel);
    }

    #[test]
    fn test_dependency_matches() {
        let dep = Dependency::from_entry("foo", "^1.0").unwrap();
        assert!(dep.matches(&PackageId::parse("foo@1.4.0").unwrap()));
        assert!(!dep.matches(&PackageId::parse("foo@2.0.0").unwrap()));
        assert!(!dep.matches(&PackageId::parse("bar@1.4.0").unwrap()));
    }

    #[test]
    fn test_dependency_bad_requirement() {
        assert!(Dependency::from_entry("foo", "not a req").is_err());
    }
}
