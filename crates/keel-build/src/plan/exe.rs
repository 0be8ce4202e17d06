//! The plan node for linking one executable (an app or a test).

use super::compile_file::CompileFilePlan;
use super::BuildEnv;
use crate::error::{BuildError, BuildResult};
use crate::proc::quote_command;
use crate::toolchain::LinkExeSpec;
use crate::usage::Usage;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Description of one executable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkExecutablePlan {
    /// Extra linker inputs (tests get the runner objects here).
    pub input_libs: Vec<PathBuf>,
    /// Usage edges whose transitive link paths join the inputs.
    pub uses: Vec<Usage>,
    /// The compilation producing this executable's own object file. The
    /// compile pass runs it; this plan only needs its object path.
    pub main_compile: CompileFilePlan,
    /// Output subdirectory, relative to the build output root.
    pub out_subdir: PathBuf,
    /// Output basename (affixes come from the toolchain).
    pub name: String,
}

impl LinkExecutablePlan {
    /// Link the executable. `own_archive` is this library's archive path
    /// (relative to the output root), when the library has one.
    pub fn link(&self, env: &BuildEnv, own_archive: Option<&Path>) -> BuildResult<()> {
        let tc = &env.toolchain;
        let rel_exe = self.out_subdir.join(tc.exe_file_name(&self.name));
        let out_path = env.output_root.join(&rel_exe);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        // Input order: the executable's own object, this library's
        // archive, explicit extra inputs, then usage-derived archives.
        let mut inputs = vec![env.output_root.join(self.main_compile.object_file_path(tc))];
        if let Some(archive) = own_archive {
            inputs.push(env.output_root.join(archive));
        }
        inputs.extend(self.input_libs.iter().cloned());
        for usage in &self.uses {
            for path in env.usage.link_paths(usage)? {
                if !inputs.contains(&path) {
                    inputs.push(path);
                }
            }
        }

        let argv = tc.create_link_executable_command(&LinkExeSpec {
            inputs,
            output: out_path.clone(),
        });

        info!("[{}] Link: {}", self.name, rel_exe.display());
        let result = env
            .runner
            .run(&argv)
            .map_err(|e| BuildError::io(&out_path, e))?;
        info!(
            "[{}] Link: {} - {}ms",
            self.name,
            rel_exe.display(),
            result.duration.as_millis()
        );

        if !result.okay() {
            error!("Linking executable failed: {}", rel_exe.display());
            return Err(BuildError::LinkFailed {
                name: self.name.clone(),
                executable: rel_exe,
                command: quote_command(&argv),
                output: result.output,
            });
        }
        Ok(())
    }
}
