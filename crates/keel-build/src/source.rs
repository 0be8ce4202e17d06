//! Source file discovery and classification.
//!
//! Files are classified by suffix. Compilable files carrying a secondary
//! `.main` or `.test` extension (`tool.main.cpp`, `ring.test.cpp`) become
//! standalone app/test executables instead of library members.

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};

/// What role a file plays in a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Header,
    Source,
    App,
    Test,
}

/// One classified file under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    /// Classify a file, or `None` when it is not a recognized source kind.
    pub fn from_path(path: &Path) -> Option<Self> {
        let kind = classify(path)?;
        Some(Self {
            path: path.to_path_buf(),
            kind,
        })
    }

    /// The full file name. Object files keep this intact so `vec.cpp`
    /// and `vec.test.cpp` never share an object.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The executable output stem: filename minus the extension and any
    /// secondary `.main`/`.test` marker (`ring.test.cpp` -> `ring`).
    pub fn stem(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        stem.strip_suffix(".main")
            .or_else(|| stem.strip_suffix(".test"))
            .unwrap_or(&stem)
            .to_string()
    }
}

const HEADER_EXTS: &[&str] = &["h", "hh", "hpp", "hxx", "inl"];
const SOURCE_EXTS: &[&str] = &["c", "C", "cc", "cpp", "cxx"];

fn classify(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?;
    if HEADER_EXTS.contains(&ext) {
        return Some(SourceKind::Header);
    }
    if !SOURCE_EXTS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.ends_with(".main") {
        Some(SourceKind::App)
    } else if stem.ends_with(".test") {
        Some(SourceKind::Test)
    } else {
        Some(SourceKind::Source)
    }
}

/// A directory tree of source files belonging to one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub path: PathBuf,
}

impl SourceRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Every recognized source file under the root, in sorted path order
    /// so planning is deterministic.
    pub fn collect_sources(&self) -> BuildResult<Vec<SourceFile>> {
        let mut sources = Vec::new();
        for entry in walkdir::WalkDir::new(&self.path)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.path).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(sf) = SourceFile::from_path(entry.path()) {
                sources.push(sf);
            }
        }
        Ok(sources)
    }
}
