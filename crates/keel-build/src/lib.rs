//! keel build system infrastructure
//!
//! Provides the toolchain-abstracted build pipeline:
//! - Compiler-agnostic synthesis of compile/archive/link command lines
//! - Usage-requirement propagation across the library graph
//! - Build planning (compile, archive, link) per library
//! - Parallel execution with fail-fast error aggregation

pub mod depfile;
pub mod error;
pub mod library;
pub mod parallel;
pub mod plan;
pub mod proc;
pub mod shlex;
pub mod source;
pub mod toolchain;
pub mod usage;

// Re-export main types
pub use error::{BuildError, BuildResult};
pub use library::Library;
pub use plan::{
    BuildEnv, BuildPlan, CompileFilePlan, CompileRules, CreateArchivePlan, LibraryBuildParams,
    LibraryPlan, LinkExecutablePlan,
};
pub use proc::{quote_command, ProcessOutput, ProcessRunner, SystemRunner};
pub use source::{SourceFile, SourceKind, SourceRoot};
pub use toolchain::{
    CompileCommand, CompileFileSpec, DepsMode, KeyValue, Language, Toolchain, ToolchainPrep,
};
pub use usage::{Usage, UsageMap, UsageRequirements};
