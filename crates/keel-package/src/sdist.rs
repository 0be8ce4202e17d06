//! Source distributions: one versioned package laid out on disk.
//!
//! An sdist is a directory named after its package id (`foo@1.2.3`)
//! containing a `keel.toml` manifest and the package's source tree.

use crate::package_id::{Dependency, PackageId};
use crate::{PackageError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILENAME: &str = "keel.toml";

/// Raw manifest shape as it appears in `keel.toml`.
#[derive(Debug, Clone, Deserialize)]
struct RawManifest {
    package: RawPackage,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPackage {
    name: String,
    version: semver::Version,
}

/// Parsed package manifest: the package identity and its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdistManifest {
    pub pkg_id: PackageId,
    pub dependencies: Vec<Dependency>,
}

impl SdistManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let raw: RawManifest =
            toml::from_str(content).map_err(|e| PackageError::bad_manifest(origin, e))?;

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        for (name, req) in &raw.dependencies {
            dependencies.push(Dependency::from_entry(name, req)?);
        }

        Ok(Self {
            pkg_id: PackageId::new(raw.package.name, raw.package.version),
            dependencies,
        })
    }

    /// Load a manifest from a `keel.toml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PackageError::MissingManifest(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        Self::parse(&content, path)
    }
}

/// A source distribution loaded from disk. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDist {
    pub manifest: SdistManifest,
    pub path: PathBuf,
}

impl SourceDist {
    /// Open the directory at `path` as a source distribution.
    ///
    /// The directory's basename must equal the manifest's package id; a
    /// mismatch means the tree was renamed or corrupted and the sdist is
    /// rejected rather than indexed under the wrong identity.
    pub fn from_directory(path: &Path) -> Result<Self> {
        let manifest = SdistManifest::from_file(&path.join(MANIFEST_FILENAME))?;

        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if dir_name != manifest.pkg_id.to_string() {
            return Err(PackageError::SdistLayout {
                dir_name,
                pkg_id: manifest.pkg_id.to_string(),
            });
        }

        Ok(Self {
            manifest,
            path: path.to_path_buf(),
        })
    }

    pub fn pkg_id(&self) -> &PackageId {
        &self.manifest.pkg_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write_sdist(root: &Path, dir_name: &str, manifest: &str) -> PathBuf {
        let dir = root.join(dir_name);
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join(MANIFEST_FILENAME), manifest).unwrap();
        fs::write(dir.join("src/lib.cpp"), "int answer() { return 42; }\n").unwrap();
        dir
    }

    #[test]
    fn test_load_valid_sdist() {
        let temp = tempfile::tempdir().unwrap();
        let dir = write_sdist(
            temp.path(),
            "foo@1.2.3",
            r#"
[package]
name = "foo"
version = "1.2.3"

[dependencies]
bar = "^2.0"
"#,
        );

        let sd = SourceDist::from_directory(&dir).unwrap();
        assert_eq!(sd.pkg_id(), &PackageId::parse("foo@1.2.3").unwrap());
        assert_eq!(sd.manifest.dependencies.len(), 1);
        assert_eq!(sd.manifest.dependencies[0].name, "bar");
    }

    #[test]
    fn test_missing_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("foo@1.0.0");
        fs::create_dir_all(&dir).unwrap();

        let err = SourceDist::from_directory(&dir).unwrap_err();
        assert!(matches!(err, PackageError::MissingManifest(_)));
    }

    #[test]
    fn test_layout_mismatch() {
        let temp = tempfile::tempdir().unwrap();
        let dir = write_sdist(
            temp.path(),
            "wrong-name@9.9.9",
            r#"
[package]
name = "foo"
version = "1.2.3"
"#,
        );

        let err = SourceDist::from_directory(&dir).unwrap_err();
        assert!(matches!(err, PackageError::SdistLayout { .. }));
    }

    #[test]
    fn test_bad_manifest_toml() {
        let temp = tempfile::tempdir().unwrap();
        let dir = write_sdist(temp.path(), "foo@1.0.0", "this is not toml [");

        let err = SourceDist::from_directory(&dir).unwrap_err();
        assert!(matches!(err, PackageError::BadManifest { .. }));
    }

    #[test]
    fn test_bad_dependency_requirement() {
        let temp = tempfile::tempdir().unwrap();
        let dir = write_sdist(
            temp.path(),
            "foo@1.0.0",
            r#"
[package]
name = "foo"
version = "1.0.0"

[dependencies]
bar = "!!nonsense!!"
"#,
        );

        let err = SourceDist::from_directory(&dir).unwrap_err();
        assert!(matches!(err, PackageError::MalformedRequirement { .. }));
    }
}
