//! The toolchain abstraction: compiler-agnostic synthesis of compile,
//! archive, and link command lines.
//!
//! A [`Toolchain`] is an immutable value assembled from argv templates and
//! filename affixes. Templates carry placeholders: `<FLAGS>` splices a
//! computed flag vector, while `<IN>`, `<OUT>`, `<PATH>` and `<DEF>`
//! substitute inside individual tokens (`<IN>` splices for the multi-input
//! archive and link templates).

mod builtin;
mod parse;
mod prep;

pub use builtin::builtin_toolchain;
pub use parse::{parse_kv_text, parse_toolchain, KeyValue};
pub use prep::ToolchainPrep;

use std::path::{Path, PathBuf};

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    C,
    Cxx,
    /// Decide from the file extension: `.c`/`.C` is C, everything else C++.
    #[default]
    Automatic,
}

/// How the compiler reports the headers a translation unit read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsMode {
    /// `-MD -MF <file> -MT <target>`: the compiler writes a Make-style file.
    Gnu,
    /// `/showIncludes`: include paths are scraped from compiler output.
    Msvc,
    /// No dependency information.
    None,
}

/// One compilation, described toolchain-independently.
#[derive(Debug, Clone, Default)]
pub struct CompileFileSpec {
    pub source_path: PathBuf,
    pub out_path: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub external_include_dirs: Vec<PathBuf>,
    pub definitions: Vec<String>,
    pub enable_warnings: bool,
    pub lang: Language,
}

/// A realized compile command with its dependency-file path (GNU mode only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub argv: Vec<String>,
    pub gnu_depfile: Option<PathBuf>,
}

/// Inputs for creating a static archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveSpec {
    pub input_files: Vec<PathBuf>,
    pub out_path: PathBuf,
}

/// Inputs for linking an executable.
#[derive(Debug, Clone, Default)]
pub struct LinkExeSpec {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// An immutable, thread-shareable command factory for one compiler setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    c_compile: Vec<String>,
    cxx_compile: Vec<String>,
    inc_template: Vec<String>,
    extern_inc_template: Vec<String>,
    def_template: Vec<String>,
    link_archive: Vec<String>,
    link_exe: Vec<String>,
    warning_flags: Vec<String>,
    archive_prefix: String,
    archive_suffix: String,
    object_prefix: String,
    object_suffix: String,
    exe_prefix: String,
    exe_suffix: String,
    deps_mode: DepsMode,
}

impl Toolchain {
    pub(crate) fn realize(prep: ToolchainPrep) -> Self {
        Self {
            c_compile: prep.c_compile,
            cxx_compile: prep.cxx_compile,
            inc_template: prep.include_template,
            extern_inc_template: prep.external_include_template,
            def_template: prep.define_template,
            link_archive: prep.link_archive,
            link_exe: prep.link_exe,
            warning_flags: prep.warning_flags,
            archive_prefix: prep.archive_prefix,
            archive_suffix: prep.archive_suffix,
            object_prefix: prep.object_prefix,
            object_suffix: prep.object_suffix,
            exe_prefix: prep.exe_prefix,
            exe_suffix: prep.exe_suffix,
            deps_mode: prep.deps_mode,
        }
    }

    pub fn deps_mode(&self) -> DepsMode {
        self.deps_mode
    }

    /// Flag arguments adding one include directory.
    pub fn include_args(&self, dir: &Path) -> Vec<String> {
        replace_in_tokens(&self.inc_template, "<PATH>", &dir.to_string_lossy())
    }

    /// Flag arguments adding one external (dependency) include directory.
    pub fn external_include_args(&self, dir: &Path) -> Vec<String> {
        replace_in_tokens(&self.extern_inc_template, "<PATH>", &dir.to_string_lossy())
    }

    /// Flag arguments adding one preprocessor definition.
    pub fn definition_args(&self, def: &str) -> Vec<String> {
        replace_in_tokens(&self.def_template, "<DEF>", def)
    }

    /// Realize the full compile command for one translation unit.
    pub fn create_compile_command(&self, spec: &CompileFileSpec) -> CompileCommand {
        let lang = match spec.lang {
            Language::Automatic => {
                let ext = spec.source_path.extension().and_then(|e| e.to_str());
                if matches!(ext, Some("c") | Some("C")) {
                    Language::C
                } else {
                    Language::Cxx
                }
            }
            other => other,
        };
        let template = match lang {
            Language::C => &self.c_compile,
            _ => &self.cxx_compile,
        };

        let mut flags = Vec::new();
        for dir in &spec.include_dirs {
            flags.extend(self.include_args(dir));
        }
        for dir in &spec.external_include_dirs {
            flags.extend(self.external_include_args(dir));
        }
        for def in &spec.definitions {
            flags.extend(self.definition_args(def));
        }
        if spec.enable_warnings {
            flags.extend(self.warning_flags.iter().cloned());
        }

        let mut gnu_depfile = None;
        match self.deps_mode {
            DepsMode::Gnu => {
                let depfile = append_extension(&spec.out_path, "d");
                flags.extend([
                    "-MD".to_string(),
                    "-MF".to_string(),
                    depfile.to_string_lossy().into_owned(),
                    "-MT".to_string(),
                    spec.out_path.to_string_lossy().into_owned(),
                ]);
                gnu_depfile = Some(depfile);
            }
            DepsMode::Msvc => flags.push("/showIncludes".to_string()),
            DepsMode::None => {}
        }

        let source = spec.source_path.to_string_lossy();
        let out = spec.out_path.to_string_lossy();
        let mut argv = Vec::with_capacity(template.len() + flags.len());
        for token in template {
            if token == "<FLAGS>" {
                argv.extend(flags.iter().cloned());
            } else {
                let token = token.replace("<IN>", &source).replace("<OUT>", &out);
                argv.push(token);
            }
        }

        CompileCommand { argv, gnu_depfile }
    }

    /// Realize the archive command: `<IN>` splices all inputs.
    pub fn create_archive_command(&self, spec: &ArchiveSpec) -> Vec<String> {
        expand_multi_input(&self.link_archive, &spec.input_files, &spec.out_path)
    }

    /// Realize the executable link command: `<IN>` splices all inputs.
    pub fn create_link_executable_command(&self, spec: &LinkExeSpec) -> Vec<String> {
        expand_multi_input(&self.link_exe, &spec.inputs, &spec.output)
    }

    /// Static archive filename for a library name.
    pub fn archive_file_name(&self, name: &str) -> String {
        format!("{}{}{}", self.archive_prefix, name, self.archive_suffix)
    }

    /// Object filename for a source file stem.
    pub fn object_file_name(&self, stem: &str) -> String {
        format!("{}{}{}", self.object_prefix, stem, self.object_suffix)
    }

    /// Executable filename for an output stem.
    pub fn exe_file_name(&self, stem: &str) -> String {
        format!("{}{}{}", self.exe_prefix, stem, self.exe_suffix)
    }
}

fn expand_multi_input(template: &[String], inputs: &[PathBuf], out: &Path) -> Vec<String> {
    let out = out.to_string_lossy();
    let mut argv = Vec::with_capacity(template.len() + inputs.len());
    for token in template {
        if token == "<IN>" {
            argv.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
        } else {
            argv.push(token.replace("<OUT>", &out));
        }
    }
    argv
}

fn replace_in_tokens(template: &[String], placeholder: &str, value: &str) -> Vec<String> {
    template
        .iter()
        .map(|t| t.replace(placeholder, value))
        .collect()
}

/// `a/b.o` -> `a/b.o.d` (append, never replace, the extension).
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(ext);
    path.with_file_name(name)
}
