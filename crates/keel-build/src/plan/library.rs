//! Planning one library: classify its sources, then lay out the compile,
//! archive, and link work.

use super::archive::CreateArchivePlan;
use super::compile_file::CompileFilePlan;
use super::exe::LinkExecutablePlan;
use super::BuildEnv;
use crate::error::BuildResult;
use crate::library::Library;
use crate::source::{SourceFile, SourceKind};
use crate::usage::Usage;
use std::path::{Path, PathBuf};

/// Per-invocation parameters for planning a library.
#[derive(Debug, Clone, Default)]
pub struct LibraryBuildParams {
    /// Subdirectory of the output root this library builds into.
    pub out_subdir: PathBuf,
    pub build_apps: bool,
    pub build_tests: bool,
    pub enable_warnings: bool,
    /// Extra usage edges applied to test executables only.
    pub test_uses: Vec<Usage>,
    /// Extra linker inputs applied to test executables only.
    pub test_link_files: Vec<PathBuf>,
}

/// The complete plan for one library.
#[derive(Debug, Clone)]
pub struct LibraryPlan {
    pub name: String,
    pub out_subdir: PathBuf,
    /// Every compilation this library needs: its own sources plus the
    /// object of each app/test executable.
    pub compile_files: Vec<CompileFilePlan>,
    pub create_archive: Option<CreateArchivePlan>,
    pub link_executables: Vec<LinkExecutablePlan>,
}

impl LibraryPlan {
    /// Plan a library's build.
    pub fn create(lib: &Library, params: &LibraryBuildParams) -> BuildResult<Self> {
        let mut compile_files = Vec::new();
        let mut lib_sources = Vec::new();
        let mut exe_sources = Vec::new();

        let obj_subdir = params.out_subdir.join("obj");

        // Objects mirror their position under the source root, so
        // same-named files in different subdirectories never collide.
        let obj_dir_for = |source: &SourceFile| -> PathBuf {
            match source
                .path
                .parent()
                .and_then(|p| p.strip_prefix(&lib.src_root.path).ok())
            {
                Some(rel) if rel != Path::new("") => obj_subdir.join(rel),
                _ => obj_subdir.clone(),
            }
        };

        let mut rules = lib.base_compile_rules();
        rules.enable_warnings = params.enable_warnings;

        // Tests may pull in extra usage requirements (a test harness).
        let mut test_rules = rules.clone();
        test_rules.uses.extend(params.test_uses.iter().cloned());

        if lib.src_root.exists() {
            for source in lib.src_root.collect_sources()? {
                match source.kind {
                    SourceKind::Header => continue,
                    SourceKind::Source => lib_sources.push(source),
                    SourceKind::App if params.build_apps => exe_sources.push(source),
                    SourceKind::Test if params.build_tests => exe_sources.push(source),
                    SourceKind::App | SourceKind::Test => continue,
                }
            }
        }

        for source in &lib_sources {
            compile_files.push(CompileFilePlan::new(
                source.clone(),
                rules.clone(),
                lib.name.as_str(),
                obj_dir_for(source),
            ));
        }

        let create_archive = (!lib_sources.is_empty())
            .then(|| CreateArchivePlan::new(lib.name.as_str(), params.out_subdir.clone()));

        // Usage edges for executables: both `uses` and `links` are link
        // inputs; tests additionally see the test harness edges.
        let mut exe_uses = lib.uses.clone();
        exe_uses.extend(lib.links.iter().cloned());
        let mut test_exe_uses = exe_uses.clone();
        test_exe_uses.extend(params.test_uses.iter().cloned());

        let mut link_executables = Vec::new();
        for source in exe_sources {
            let is_test = source.kind == SourceKind::Test;

            // Tests land under an extra "test" subdirectory; both kinds
            // then mirror their position inside the source tree.
            let subdir_base = if is_test {
                params.out_subdir.join("test")
            } else {
                params.out_subdir.clone()
            };
            let subdir = match source
                .path
                .parent()
                .and_then(|p| p.strip_prefix(&lib.src_root.path).ok())
            {
                Some(rel) if rel != Path::new("") => subdir_base.join(rel),
                _ => subdir_base,
            };

            let main_compile = CompileFilePlan::new(
                source.clone(),
                if is_test { test_rules.clone() } else { rules.clone() },
                lib.name.as_str(),
                obj_dir_for(&source),
            );
            compile_files.push(main_compile.clone());

            link_executables.push(LinkExecutablePlan {
                input_libs: if is_test {
                    params.test_link_files.clone()
                } else {
                    Vec::new()
                },
                uses: if is_test {
                    test_exe_uses.clone()
                } else {
                    exe_uses.clone()
                },
                main_compile,
                out_subdir: subdir,
                name: source.stem(),
            });
        }

        Ok(Self {
            name: lib.name.clone(),
            out_subdir: params.out_subdir.clone(),
            compile_files,
            create_archive,
            link_executables,
        })
    }

    /// Run this library's archive step, gathering the objects of its
    /// `Source`-kind compile plans.
    pub(super) fn archive(&self, env: &BuildEnv) -> BuildResult<()> {
        let Some(plan) = &self.create_archive else {
            return Ok(());
        };
        let objects: Vec<PathBuf> = self
            .compile_files
            .iter()
            .filter(|cf| cf.source.kind == SourceKind::Source)
            .map(|cf| env.output_root.join(cf.object_file_path(&env.toolchain)))
            .collect();
        plan.archive(env, objects)
    }
}
