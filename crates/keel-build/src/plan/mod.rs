//! Build planning and execution.
//!
//! Planning turns library models into pure descriptions (compile, archive,
//! link); execution walks the plan in three passes with the barriers the
//! artifacts require: every object exists before its archive, every
//! archive before the executables that link it.

mod archive;
mod compile_file;
mod exe;
mod library;

pub use archive::CreateArchivePlan;
pub use compile_file::{CompileFilePlan, CompileRules};
pub use exe::LinkExecutablePlan;
pub use library::{LibraryBuildParams, LibraryPlan};

use crate::error::{BuildError, BuildResult};
use crate::parallel::parallel_run;
use crate::proc::ProcessRunner;
use crate::toolchain::Toolchain;
use crate::usage::UsageMap;
use std::path::PathBuf;

/// Everything execution needs besides the plan itself.
///
/// The toolchain and usage map are immutable here; the runner is shared
/// across worker threads.
pub struct BuildEnv<'a> {
    pub toolchain: Toolchain,
    pub output_root: PathBuf,
    pub usage: UsageMap,
    pub runner: &'a dyn ProcessRunner,
}

/// The full plan for one build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub libraries: Vec<LibraryPlan>,
}

impl BuildPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_library(&mut self, lib: LibraryPlan) {
        self.libraries.push(lib);
    }

    /// Compile every translation unit of every library.
    ///
    /// Jobs are submitted in source-file order and run with bounded
    /// parallelism. On failure, in-flight jobs drain, every error is
    /// logged, and a single aggregated failure is returned; no archive or
    /// link work happens after a failed compile pass.
    pub fn compile_all(&self, env: &BuildEnv, n_jobs: usize) -> BuildResult<()> {
        let jobs: Vec<&CompileFilePlan> = self
            .libraries
            .iter()
            .flat_map(|lib| lib.compile_files.iter())
            .collect();
        let total = jobs.len();

        parallel_run(jobs, n_jobs, |plan| plan.compile(env)).map_err(|errors| {
            BuildError::CompilePassFailed {
                failed: errors.len(),
                total,
            }
        })
    }

    /// Create the static archive of every library that has one.
    pub fn archive_all(&self, env: &BuildEnv, n_jobs: usize) -> BuildResult<()> {
        let jobs: Vec<&LibraryPlan> = self
            .libraries
            .iter()
            .filter(|lib| lib.create_archive.is_some())
            .collect();

        parallel_run(jobs, n_jobs, |lib| lib.archive(env))
            .map_err(|mut errors| errors.remove(0))
    }

    /// Link every executable. Runs after the archive pass barrier.
    pub fn link_all(&self, env: &BuildEnv) -> BuildResult<()> {
        for lib in &self.libraries {
            let own_archive = lib
                .create_archive
                .as_ref()
                .map(|a| a.archive_file_path(&env.toolchain));
            for exe in &lib.link_executables {
                exe.link(env, own_archive.as_deref())?;
            }
        }
        Ok(())
    }

    /// Run the three passes in order.
    pub fn execute(&self, env: &BuildEnv, n_jobs: usize) -> BuildResult<()> {
        self.compile_all(env, n_jobs)?;
        self.archive_all(env, n_jobs)?;
        self.link_all(env)
    }
}
