//! keel package management
//!
//! Package identity (`name@version`), on-disk source distributions, the
//! filesystem-backed local repository, and the dependency solver that picks
//! one version per package across the local repository and a catalog.

pub mod package_id;
pub mod repository;
pub mod sdist;
pub mod solver;

pub use package_id::{Dependency, PackageId};
pub use repository::{IfExists, RepoMode, Repository};
pub use sdist::{SdistManifest, SourceDist};
pub use solver::{solve, MergedProvider, PackageProvider, StaticProvider};

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Malformed package id '{0}': expected 'name@version'")]
    MalformedPackageId(String),

    #[error("Invalid version in '{input}': {error}")]
    MalformedVersion { input: String, error: semver::Error },

    #[error("Invalid version requirement '{input}' for dependency '{name}': {error}")]
    MalformedRequirement {
        name: String,
        input: String,
        error: semver::Error,
    },

    #[error("No package manifest found at {}", .0.display())]
    MissingManifest(std::path::PathBuf),

    #[error("Failed to parse package manifest at {}: {error}", .path.display())]
    BadManifest { path: std::path::PathBuf, error: String },

    #[error(
        "Source distribution directory '{dir_name}' does not match its manifest identity '{pkg_id}'"
    )]
    SdistLayout { dir_name: String, pkg_id: String },

    #[error("Source distribution '{0}' is already present in the local repository")]
    SdistExists(String),

    #[error("No solution for package '{name}': requirements [{}] admit none of the candidates [{}]",
        .constraints.join(", "),
        .candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))]
    NoSolution {
        name: String,
        constraints: Vec<String>,
        candidates: Vec<PackageId>,
    },

    #[error("I/O error at {}: {error}", .path.display())]
    IoAt {
        path: std::path::PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<std::path::PathBuf>, error: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            error,
        }
    }

    /// Create a manifest parse error
    pub fn bad_manifest(path: impl Into<std::path::PathBuf>, error: impl ToString) -> Self {
        Self::BadManifest {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
