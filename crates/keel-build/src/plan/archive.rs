//! The plan node for collecting a library's objects into a static archive.

use super::BuildEnv;
use crate::error::{BuildError, BuildResult};
use crate::proc::quote_command;
use crate::toolchain::{ArchiveSpec, Toolchain};
use std::path::PathBuf;
use tracing::{error, info};

/// Description of one static archive. The inputs are the library's
/// `Source`-kind compile plans; the library plan owns those and hands over
/// the object paths at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArchivePlan {
    /// Base name of the archive (not the filename).
    pub name: String,
    /// Output subdirectory, relative to the build output root.
    pub out_subdir: PathBuf,
}

impl CreateArchivePlan {
    pub fn new(name: impl Into<String>, out_subdir: PathBuf) -> Self {
        Self {
            name: name.into(),
            out_subdir,
        }
    }

    /// Archive path relative to the build output root.
    pub fn archive_file_path(&self, tc: &Toolchain) -> PathBuf {
        self.out_subdir.join(tc.archive_file_name(&self.name))
    }

    /// Run the archiver over the given objects. Expects every compilation
    /// to have completed.
    pub fn archive(&self, env: &BuildEnv, objects: Vec<PathBuf>) -> BuildResult<()> {
        let rel_path = self.archive_file_path(&env.toolchain);
        let out_path = env.output_root.join(&rel_path);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let argv = env.toolchain.create_archive_command(&ArchiveSpec {
            input_files: objects,
            out_path: out_path.clone(),
        });

        info!("[{}] Archive: {}", self.name, rel_path.display());
        let result = env
            .runner
            .run(&argv)
            .map_err(|e| BuildError::io(&out_path, e))?;
        info!(
            "[{}] Archive: {} - {}ms",
            self.name,
            rel_path.display(),
            result.duration.as_millis()
        );

        if !result.okay() {
            error!(
                "Creating static library archive failed: {}",
                rel_path.display()
            );
            return Err(BuildError::ArchiveFailed {
                name: self.name.clone(),
                archive: rel_path,
                command: quote_command(&argv),
                output: result.output,
            });
        }
        Ok(())
    }
}
