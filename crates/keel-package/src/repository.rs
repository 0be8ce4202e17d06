//! The local repository: a filesystem-backed set of source distributions.
//!
//! Layout under the repository root:
//!
//! ```text
//! <root>/
//!   .keel-repo.lock      advisory lock file
//!   .tmp-import/         staging area during imports (pruned on open)
//!   <name>@<version>/    one directory per sdist
//! ```
//!
//! One handle per process per root. Write handles hold an exclusive
//! cross-process lock for their whole lifetime; readers share the lock.

use crate::package_id::{Dependency, PackageId};
use crate::sdist::SourceDist;
use crate::solver::{self, MergedProvider, PackageProvider};
use crate::{PackageError, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const LOCK_FILENAME: &str = ".keel-repo.lock";
const TMP_IMPORT_DIRNAME: &str = ".tmp-import";

/// Repository access mode, fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoMode {
    Read,
    Write,
}

/// What to do when an imported sdist already exists in the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    Error,
    Ignore,
    Replace,
}

/// An open handle on a local repository.
pub struct Repository {
    root: PathBuf,
    mode: RepoMode,
    sdists: BTreeMap<PackageId, SourceDist>,
    // Held for the lifetime of the handle; the lock releases on drop.
    _lock: File,
}

impl Repository {
    /// The conventional repository location under a user data directory.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("repo")
    }

    /// Open (or, in write mode, create) the repository at `root`.
    pub fn open(root: impl Into<PathBuf>, mode: RepoMode) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            if mode == RepoMode::Write {
                fs::create_dir_all(&root).map_err(|e| PackageError::io(&root, e))?;
            } else {
                return Err(PackageError::io(
                    &root,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "repository directory does not exist",
                    ),
                ));
            }
        }

        let lock = Self::acquire_lock(&root, mode)?;

        if mode == RepoMode::Write {
            // A crashed import may have left a partial staging directory.
            let tmp = root.join(TMP_IMPORT_DIRNAME);
            if tmp.exists() {
                warn!(path = %tmp.display(), "Removing stale import staging directory");
                if let Err(e) = fs::remove_dir_all(&tmp) {
                    // A failed prune never blocks opening; the next import
                    // retries the removal and surfaces a real error.
                    warn!(path = %tmp.display(), "Could not remove staging directory: {e}");
                }
            }
        }

        let sdists = Self::load_sdists(&root)?;
        Ok(Self {
            root,
            mode,
            sdists,
            _lock: lock,
        })
    }

    /// Take the advisory lock, warning once if another process holds it.
    fn acquire_lock(root: &Path, mode: RepoMode) -> Result<File> {
        let lock_path = root.join(LOCK_FILENAME);
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| PackageError::io(&lock_path, e))?;

        let try_lock = || match mode {
            RepoMode::Write => lock.try_lock_exclusive(),
            RepoMode::Read => fs2::FileExt::try_lock_shared(&lock),
        };
        if try_lock().is_err() {
            warn!(
                path = %root.display(),
                "Repository is locked by another process; waiting for it to be released"
            );
            match mode {
                RepoMode::Write => lock.lock_exclusive(),
                RepoMode::Read => lock.lock_shared(),
            }
            .map_err(|e| PackageError::io(&lock_path, e))?;
        }
        Ok(lock)
    }

    /// Load every non-dotfile subdirectory as an sdist, skipping (with a
    /// logged error) entries that fail to parse.
    fn load_sdists(root: &Path) -> Result<BTreeMap<PackageId, SourceDist>> {
        let mut sdists = BTreeMap::new();
        let entries = fs::read_dir(root).map_err(|e| PackageError::io(root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PackageError::io(root, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }
            match SourceDist::from_directory(&path) {
                Ok(sd) => {
                    sdists.insert(sd.pkg_id().clone(), sd);
                }
                Err(e) => {
                    error!(
                        path = %path.display(),
                        "Failed to load source distribution: {e}"
                    );
                }
            }
        }
        Ok(sdists)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> RepoMode {
        self.mode
    }

    /// Look up an sdist by exact package id.
    pub fn find(&self, pkg: &PackageId) -> Option<&SourceDist> {
        self.sdists.get(pkg)
    }

    /// All loaded sdists in package-id order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceDist> {
        self.sdists.values()
    }

    pub fn len(&self) -> usize {
        self.sdists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sdists.is_empty()
    }

    /// Import a source distribution into the repository.
    ///
    /// The tree is staged into `.tmp-import` and renamed into place so a
    /// crash never leaves a half-copied package directory under a valid
    /// package-id name. The in-memory set is updated only on success.
    pub fn add_sdist(&mut self, sd: &SourceDist, if_exists: IfExists) -> Result<()> {
        if self.mode != RepoMode::Write {
            // Mutating through a read handle bypasses the cross-process
            // exclusion contract; continuing could corrupt the store.
            error!(
                "Attempted to write into a repository that was not opened with a write lock. \
                 This is a bug in the calling code; aborting to protect the repository."
            );
            panic!("repository mutation through a read-mode handle");
        }

        let id = sd.pkg_id().to_string();
        let dest = self.root.join(&id);
        if dest.exists() {
            match if_exists {
                IfExists::Error => return Err(PackageError::SdistExists(id)),
                IfExists::Ignore => {
                    warn!("Source distribution '{id}' is already in the local repository");
                    return Ok(());
                }
                IfExists::Replace => {
                    info!("Source distribution '{id}' is already in the local repository - replacing");
                }
            }
        }

        let tmp = self.root.join(TMP_IMPORT_DIRNAME);
        if tmp.exists() {
            fs::remove_dir_all(&tmp).map_err(|e| PackageError::io(&tmp, e))?;
        }
        copy_tree(&sd.path, &tmp)?;
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| PackageError::io(&dest, e))?;
        }
        fs::rename(&tmp, &dest).map_err(|e| PackageError::io(&dest, e))?;

        let imported = SourceDist::from_directory(&dest)?;
        self.sdists.insert(imported.pkg_id().clone(), imported);
        info!("Source distribution '{id}' imported into the local repository");
        Ok(())
    }

    /// Resolve `requirements` against this repository merged with `catalog`.
    pub fn solve(
        &self,
        requirements: &[Dependency],
        catalog: &dyn PackageProvider,
    ) -> Result<Vec<PackageId>> {
        let merged = MergedProvider::new(self, catalog);
        solver::solve(requirements, &merged)
    }
}

impl PackageProvider for Repository {
    fn versions_of(&self, name: &str) -> Vec<PackageId> {
        self.sdists
            .keys()
            .filter(|id| id.name == name)
            .cloned()
            .collect()
    }

    fn dependencies_of(&self, pkg: &PackageId) -> Option<Vec<Dependency>> {
        self.find(pkg).map(|sd| sd.manifest.dependencies.clone())
    }
}

/// Recursively copy a directory tree.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            PackageError::io(path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .expect("walkdir yields children of its root");
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PackageError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| PackageError::io(&target, e))?;
        }
    }
    Ok(())
}
