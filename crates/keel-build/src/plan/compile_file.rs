//! The plan node for compiling one translation unit.

use super::BuildEnv;
use crate::depfile::{parse_gnu_depfile, scrape_msvc_includes, DepsSidecar};
use crate::error::{BuildError, BuildResult};
use crate::proc::quote_command;
use crate::source::SourceFile;
use crate::toolchain::{CompileFileSpec, DepsMode, Language, Toolchain};
use crate::usage::Usage;
use std::path::PathBuf;
use tracing::{error, info};

/// Compilation settings shared by a group of translation units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileRules {
    pub include_dirs: Vec<PathBuf>,
    pub defs: Vec<String>,
    pub enable_warnings: bool,
    /// Dependency headers come from these libraries' usage requirements.
    pub uses: Vec<Usage>,
}

/// A pure description of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFilePlan {
    pub source: SourceFile,
    pub rules: CompileRules,
    /// Library name, used to qualify log lines.
    pub qualifier: String,
    /// Object directory, relative to the build output root.
    pub subdir: PathBuf,
}

impl CompileFilePlan {
    pub fn new(
        source: SourceFile,
        rules: CompileRules,
        qualifier: impl Into<String>,
        subdir: PathBuf,
    ) -> Self {
        Self {
            source,
            rules,
            qualifier: qualifier.into(),
            subdir,
        }
    }

    /// Object path relative to the build output root. The object carries
    /// the source's full file name (`vec.test.cpp` -> `vec.test.cpp.o`),
    /// so a library source and its same-named `.test` counterpart never
    /// collide. The archive pass computes its inputs through this same
    /// function, so the two passes can never disagree about where an
    /// object lives.
    pub fn object_file_path(&self, tc: &Toolchain) -> PathBuf {
        self.subdir.join(tc.object_file_name(&self.source.file_name()))
    }

    /// Compile the file, capture its header dependencies, and write the
    /// `.deps.json` sidecar next to the object.
    pub fn compile(&self, env: &BuildEnv) -> BuildResult<()> {
        let tc = &env.toolchain;
        let out_path = env.output_root.join(self.object_file_path(tc));
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let mut external_include_dirs = Vec::new();
        for usage in &self.rules.uses {
            for dir in env.usage.include_paths(usage)? {
                if !external_include_dirs.contains(&dir) {
                    external_include_dirs.push(dir);
                }
            }
        }

        let spec = CompileFileSpec {
            source_path: self.source.path.clone(),
            out_path: out_path.clone(),
            include_dirs: self.rules.include_dirs.clone(),
            external_include_dirs,
            definitions: self.rules.defs.clone(),
            enable_warnings: self.rules.enable_warnings,
            lang: Language::Automatic,
        };
        let cmd = tc.create_compile_command(&spec);

        info!("[{}] Compile: {}", self.qualifier, self.source.path.display());
        let result = env
            .runner
            .run(&cmd.argv)
            .map_err(|e| BuildError::io(&self.source.path, e))?;
        info!(
            "[{}] Compile: {} - {}ms",
            self.qualifier,
            self.source.path.display(),
            result.duration.as_millis()
        );

        // Normalize dependency info into the sidecar. MSVC reports through
        // the output stream, so the include notes are filtered out of what
        // the user sees.
        let output = match tc.deps_mode() {
            DepsMode::Gnu => {
                // A failed compile may still leave a partial depfile; only
                // a finished object gets a sidecar.
                if result.exit_code == 0 {
                    if let Some(depfile) = &cmd.gnu_depfile {
                        if let Ok(text) = std::fs::read_to_string(depfile) {
                            DepsSidecar {
                                object: out_path.clone(),
                                source: self.source.path.clone(),
                                dependencies: parse_gnu_depfile(&text),
                            }
                            .write()?;
                        }
                    }
                }
                result.output
            }
            DepsMode::Msvc => {
                let (deps, remaining) = scrape_msvc_includes(&result.output);
                if result.exit_code == 0 {
                    DepsSidecar {
                        object: out_path.clone(),
                        source: self.source.path.clone(),
                        dependencies: deps,
                    }
                    .write()?;
                }
                remaining
            }
            DepsMode::None => result.output,
        };

        if result.exit_code != 0 {
            error!(
                "[{}] Compile failed: {}",
                self.qualifier,
                self.source.path.display()
            );
            return Err(BuildError::CompileFailed {
                qualifier: self.qualifier.clone(),
                file: self.source.path.clone(),
                command: quote_command(&cmd.argv),
                output,
            });
        }

        // Relay compiler warnings even on success.
        if !output.trim().is_empty() {
            info!("{}", output.trim_end());
        }
        Ok(())
    }
}
