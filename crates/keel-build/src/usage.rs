//! Usage requirements: what depending on a library does to your compile
//! and link lines.
//!
//! Libraries reference each other by `(namespace, name)` keys. Each entry
//! carries include directories, an optional linkable artifact, and its own
//! `uses`/`links` edges; collection walks those edges transitively.

use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// A `(namespace, name)` reference to a library's usage requirements.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usage {
    pub namespace: String,
    pub name: String,
}

impl Usage {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The requirements one library imposes on its users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRequirements {
    pub include_paths: Vec<PathBuf>,
    pub linkable_path: Option<PathBuf>,
    pub uses: Vec<Usage>,
    pub links: Vec<Usage>,
}

/// All known usage requirements, keyed by `(namespace, name)`.
///
/// Built once before planning and only read afterwards. The `uses`/`links`
/// edges may form cycles in source data; traversal tolerates them via a
/// visited set (edges denote set inclusion, not ordering).
#[derive(Debug, Clone, Default)]
pub struct UsageMap {
    entries: BTreeMap<(String, String), UsageRequirements>,
}

impl UsageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library's requirements. Each key may appear only once.
    pub fn add(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        reqs: UsageRequirements,
    ) -> BuildResult<&mut UsageRequirements> {
        let key = (namespace.into(), name.into());
        match self.entries.entry(key.clone()) {
            std::collections::btree_map::Entry::Occupied(_) => {
                Err(BuildError::DuplicateLibraryName {
                    namespace: key.0,
                    name: key.1,
                })
            }
            std::collections::btree_map::Entry::Vacant(v) => Ok(v.insert(reqs)),
        }
    }

    pub fn get(&self, usage: &Usage) -> Option<&UsageRequirements> {
        self.entries
            .get(&(usage.namespace.clone(), usage.name.clone()))
    }

    fn get_or_err(&self, usage: &Usage) -> BuildResult<&UsageRequirements> {
        self.get(usage).ok_or_else(|| BuildError::UnknownUsage {
            namespace: usage.namespace.clone(),
            name: usage.name.clone(),
        })
    }

    /// Linker inputs contributed by `usage` and everything it pulls in.
    ///
    /// Deterministic pre-order: a node's own `linkable_path`, then its
    /// `uses`, then its `links`. First visit wins; users must order their
    /// `links` explicitly when cyclic static-archive dependencies need a
    /// particular link order.
    pub fn link_paths(&self, usage: &Usage) -> BuildResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut walk = Walk::default();
        self.walk_links(usage, &mut walk, &mut out)?;
        Ok(out)
    }

    fn walk_links(&self, usage: &Usage, walk: &mut Walk, out: &mut Vec<PathBuf>) -> BuildResult<()> {
        if !walk.enter(usage) {
            return Ok(());
        }
        let reqs = self.get_or_err(usage)?;
        if let Some(lib) = &reqs.linkable_path {
            if !out.contains(lib) {
                out.push(lib.clone());
            }
        }
        for dep in reqs.uses.iter().chain(&reqs.links) {
            self.walk_links(dep, walk, out)?;
        }
        walk.leave();
        Ok(())
    }

    /// Include directories contributed by `usage` and its transitive
    /// `uses` (not `links`).
    pub fn include_paths(&self, usage: &Usage) -> BuildResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut walk = Walk::default();
        self.walk_includes(usage, &mut walk, &mut out)?;
        Ok(out)
    }

    fn walk_includes(
        &self,
        usage: &Usage,
        walk: &mut Walk,
        out: &mut Vec<PathBuf>,
    ) -> BuildResult<()> {
        if !walk.enter(usage) {
            return Ok(());
        }
        let reqs = self.get_or_err(usage)?;
        for inc in &reqs.include_paths {
            if !out.contains(inc) {
                out.push(inc.clone());
            }
        }
        for dep in &reqs.uses {
            self.walk_includes(dep, walk, out)?;
        }
        walk.leave();
        Ok(())
    }
}

/// Traversal bookkeeping: first-seen dedup plus cycle detection.
///
/// A node already on the active path is a genuine cycle (warned about,
/// tolerated); a node merely seen before is a diamond and is skipped
/// silently.
#[derive(Debug, Default)]
struct Walk {
    visited: BTreeSet<Usage>,
    stack: Vec<Usage>,
}

impl Walk {
    /// Returns false when the node must be skipped.
    fn enter(&mut self, usage: &Usage) -> bool {
        if self.stack.contains(usage) {
            warn!("Usage requirements for '{usage}' form a cycle");
            return false;
        }
        if !self.visited.insert(usage.clone()) {
            return false;
        }
        self.stack.push(usage.clone());
        true
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}
