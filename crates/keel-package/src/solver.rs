//! Dependency resolution: pick exactly one version per package name.
//!
//! Candidates come from [`PackageProvider`] implementations; the local
//! repository and the catalog each implement the trait and are combined
//! with [`MergedProvider`]. The search is a backtracking walk with
//! newest-first version preference, so the same inputs always produce the
//! same selection.

use crate::package_id::{Dependency, PackageId};
use crate::{PackageError, Result};
use semver::VersionReq;
use std::collections::BTreeMap;

/// A source of package candidates and their declared dependencies.
pub trait PackageProvider {
    /// All known versions of `name`, sorted ascending, deduplicated.
    fn versions_of(&self, name: &str) -> Vec<PackageId>;

    /// Dependencies declared by one specific candidate, or `None` if the
    /// provider does not know the package.
    fn dependencies_of(&self, pkg: &PackageId) -> Option<Vec<Dependency>>;
}

/// An in-memory provider backed by a map of packages to dependency lists.
///
/// Serves as the catalog stand-in for tests and small tools.
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    packages: BTreeMap<PackageId, Vec<Dependency>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pkg: PackageId, deps: Vec<Dependency>) -> &mut Self {
        self.packages.insert(pkg, deps);
        self
    }
}

impl PackageProvider for StaticProvider {
    fn versions_of(&self, name: &str) -> Vec<PackageId> {
        self.packages
            .keys()
            .filter(|id| id.name == name)
            .cloned()
            .collect()
    }

    fn dependencies_of(&self, pkg: &PackageId) -> Option<Vec<Dependency>> {
        self.packages.get(pkg).cloned()
    }
}

/// Union of two providers, with ties favoring `primary`.
///
/// Candidate lists are merged, sorted by the total order on [`PackageId`]
/// and deduplicated; dependency queries ask `primary` first so a locally
/// imported sdist shadows the catalog's copy of the same version.
pub struct MergedProvider<'a> {
    primary: &'a dyn PackageProvider,
    secondary: &'a dyn PackageProvider,
}

impl<'a> MergedProvider<'a> {
    pub fn new(primary: &'a dyn PackageProvider, secondary: &'a dyn PackageProvider) -> Self {
        Self { primary, secondary }
    }
}

impl PackageProvider for MergedProvider<'_> {
    fn versions_of(&self, name: &str) -> Vec<PackageId> {
        let mut all = self.primary.versions_of(name);
        all.extend(self.secondary.versions_of(name));
        all.sort();
        all.dedup();
        all
    }

    fn dependencies_of(&self, pkg: &PackageId) -> Option<Vec<Dependency>> {
        self.primary
            .dependencies_of(pkg)
            .or_else(|| self.secondary.dependencies_of(pkg))
    }
}

/// Resolve `requirements` to a flat package set.
///
/// Every requirement (root and induced) is satisfied by exactly one
/// selected version; no two selections share a name. The result is sorted
/// by package id.
pub fn solve(requirements: &[Dependency], provider: &dyn PackageProvider) -> Result<Vec<PackageId>> {
    let mut state = SolveState {
        provider,
        constraints: BTreeMap::new(),
        selected: BTreeMap::new(),
    };
    for req in requirements {
        state
            .constraints
            .entry(req.name.clone())
            .or_default()
            .push(req.req.clone());
    }

    state.extend()?;

    let mut out: Vec<PackageId> = state.selected.into_values().collect();
    out.sort();
    Ok(out)
}

struct SolveState<'a> {
    provider: &'a dyn PackageProvider,
    /// Active requirements per package name, root and induced alike.
    constraints: BTreeMap<String, Vec<VersionReq>>,
    selected: BTreeMap<String, PackageId>,
}

impl SolveState<'_> {
    /// Pick the most constrained unresolved name, try its candidates
    /// newest-first, and recurse. Returns the error describing the last
    /// contradiction when no assignment works.
    fn extend(&mut self) -> Result<()> {
        let Some(name) = self.next_unresolved() else {
            return Ok(());
        };

        let reqs = self.constraints.get(&name).cloned().unwrap_or_default();
        let all_candidates = self.provider.versions_of(&name);
        let mut viable: Vec<PackageId> = all_candidates
            .iter()
            .filter(|c| reqs.iter().all(|r| r.matches(&c.version)))
            .cloned()
            .collect();
        // Newest-first preference.
        viable.reverse();

        let mut last_failure = None;
        for candidate in viable {
            match self.try_select(candidate) {
                Ok(()) => return Ok(()),
                Err(e) => last_failure = Some(e),
            }
        }

        Err(last_failure.unwrap_or_else(|| PackageError::NoSolution {
            name: name.clone(),
            constraints: reqs.iter().map(|r| r.to_string()).collect(),
            candidates: all_candidates,
        }))
    }

    /// Select `candidate`, fold in its dependencies, and continue the
    /// search. Undoes every state change before returning an error.
    fn try_select(&mut self, candidate: PackageId) -> Result<()> {
        let name = candidate.name.clone();
        let deps = self.provider.dependencies_of(&candidate).unwrap_or_default();

        // A dependency of this candidate may contradict a package we have
        // already committed to; that kills this candidate immediately.
        for dep in &deps {
            if let Some(chosen) = self.selected.get(&dep.name) {
                if !dep.req.matches(&chosen.version) {
                    return Err(PackageError::NoSolution {
                        name: dep.name.clone(),
                        constraints: vec![dep.req.to_string()],
                        candidates: vec![chosen.clone()],
                    });
                }
            }
        }

        self.selected.insert(name.clone(), candidate);
        for dep in &deps {
            self.constraints
                .entry(dep.name.clone())
                .or_default()
                .push(dep.req.clone());
        }

        let result = self.extend();

        if result.is_err() {
            for dep in &deps {
                if let Some(reqs) = self.constraints.get_mut(&dep.name) {
                    reqs.pop();
                    if reqs.is_empty() {
                        self.constraints.remove(&dep.name);
                    }
                }
            }
            self.selected.remove(&name);
        }
        result
    }

    /// The unresolved name with the most active requirements; ties break
    /// lexicographically so the walk is deterministic.
    fn next_unresolved(&self) -> Option<String> {
        self.constraints
            .iter()
            .filter(|(name, _)| !self.selected.contains_key(*name))
            .max_by(|(an, ar), (bn, br)| ar.len().cmp(&br.len()).then(bn.cmp(an)))
            .map(|(name, _)| name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pkg(s: &str) -> PackageId {
        PackageId::parse(s).unwrap()
    }

    fn dep(name: &str, req: &str) -> Dependency {
        Dependency::from_entry(name, req).unwrap()
    }

    #[test]
    fn test_solve_empty() {
        let provider = StaticProvider::new();
        assert_eq!(solve(&[], &provider).unwrap(), vec![]);
    }

    #[test]
    fn test_solve_picks_newest() {
        let mut provider = StaticProvider::new();
        provider
            .add(pkg("foo@1.0.0"), vec![])
            .add(pkg("foo@1.1.0"), vec![])
            .add(pkg("foo@2.0.0"), vec![]);

        let selected = solve(&[dep("foo", "^1.0")], &provider).unwrap();
        assert_eq!(selected, vec![pkg("foo@1.1.0")]);
    }

    #[test]
    fn test_solve_transitive() {
        let mut provider = StaticProvider::new();
        provider
            .add(pkg("app@1.0.0"), vec![dep("lib", "^2.0")])
            .add(pkg("lib@2.3.0"), vec![dep("base", "^1.0")])
            .add(pkg("base@1.5.0"), vec![]);

        let selected = solve(&[dep("app", "^1.0")], &provider).unwrap();
        assert_eq!(
            selected,
            vec![pkg("app@1.0.0"), pkg("base@1.5.0"), pkg("lib@2.3.0")]
        );
    }

    #[test]
    fn test_solve_backtracks_over_version_choice() {
        // Newest bar requires a foo that conflicts with the root
        // requirement, so the solver must fall back to bar@1.0.0.
        let mut provider = StaticProvider::new();
        provider
            .add(pkg("bar@1.0.0"), vec![dep("foo", "^1.0")])
            .add(pkg("bar@1.1.0"), vec![dep("foo", "^2.0")])
            .add(pkg("foo@1.4.0"), vec![])
            .add(pkg("foo@2.0.0"), vec![]);

        let selected = solve(&[dep("bar", "^1.0"), dep("foo", "^1.0")], &provider).unwrap();
        assert_eq!(selected, vec![pkg("bar@1.0.0"), pkg("foo@1.4.0")]);
    }

    #[test]
    fn test_solve_no_solution() {
        let mut provider = StaticProvider::new();
        provider.add(pkg("foo@1.0.0"), vec![]);

        let err = solve(&[dep("foo", "^2.0")], &provider).unwrap_err();
        match err {
            PackageError::NoSolution { name, candidates, .. } => {
                assert_eq!(name, "foo");
                assert_eq!(candidates, vec![pkg("foo@1.0.0")]);
            }
            other => panic!("expected NoSolution, got {other:?}"),
        }
    }

    #[test]
    fn test_solve_conflicting_requirements() {
        let mut provider = StaticProvider::new();
        provider
            .add(pkg("foo@1.0.0"), vec![])
            .add(pkg("foo@2.0.0"), vec![]);

        let err = solve(&[dep("foo", "^1.0"), dep("foo", "^2.0")], &provider).unwrap_err();
        assert!(matches!(err, PackageError::NoSolution { .. }));
    }

    #[test]
    fn test_solve_deterministic() {
        let mut provider = StaticProvider::new();
        provider
            .add(pkg("a@1.0.0"), vec![dep("c", ">=1")])
            .add(pkg("b@1.0.0"), vec![dep("c", ">=1")])
            .add(pkg("c@1.0.0"), vec![])
            .add(pkg("c@2.0.0"), vec![]);

        let reqs = [dep("a", "*"), dep("b", "*")];
        let first = solve(&reqs, &provider).unwrap();
        for _ in 0..5 {
            assert_eq!(solve(&reqs, &provider).unwrap(), first);
        }
    }

    #[test]
    fn test_merged_provider_prefers_primary() {
        let mut local = StaticProvider::new();
        local.add(pkg("foo@1.0.0"), vec![dep("local-only", "^1.0")]);
        let mut catalog = StaticProvider::new();
        catalog
            .add(pkg("foo@1.0.0"), vec![dep("catalog-only", "^1.0")])
            .add(pkg("foo@1.1.0"), vec![]);

        let merged = MergedProvider::new(&local, &catalog);
        let versions = merged.versions_of("foo");
        assert_eq!(versions, vec![pkg("foo@1.0.0"), pkg("foo@1.1.0")]);

        // The local entry shadows the catalog's copy of the same version.
        let deps = merged.dependencies_of(&pkg("foo@1.0.0")).unwrap();
        assert_eq!(deps[0].name, "local-only");
    }
}
