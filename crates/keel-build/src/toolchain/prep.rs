//! The intermediate product of toolchain configuration.
//!
//! Both configuration routes (explicit key/value files and builtin profile
//! ids) produce a [`ToolchainPrep`], which is then realized into an
//! immutable [`Toolchain`](super::Toolchain) value.

use super::{DepsMode, Toolchain};

/// Fully-deduced toolchain parameters, ready to realize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPrep {
    /// Complete C compile command template (`<FLAGS>`, `<IN>`, `<OUT>`).
    pub c_compile: Vec<String>,
    /// Complete C++ compile command template.
    pub cxx_compile: Vec<String>,
    /// Per-directory include flag template (`<PATH>`).
    pub include_template: Vec<String>,
    /// Include template for external (dependency) headers.
    pub external_include_template: Vec<String>,
    /// Preprocessor definition flag template (`<DEF>`).
    pub define_template: Vec<String>,
    /// Archive creation command template (`<IN>`, `<OUT>`).
    pub link_archive: Vec<String>,
    /// Executable link command template (`<IN>`, `<OUT>`).
    pub link_exe: Vec<String>,
    /// Flags appended when a compilation enables warnings.
    pub warning_flags: Vec<String>,
    pub archive_prefix: String,
    pub archive_suffix: String,
    pub object_prefix: String,
    pub object_suffix: String,
    pub exe_prefix: String,
    pub exe_suffix: String,
    pub deps_mode: DepsMode,
}

impl ToolchainPrep {
    /// Produce the immutable toolchain value.
    pub fn realize(self) -> Toolchain {
        Toolchain::realize(self)
    }
}
