/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{context}: Unknown option '{key}'{}",
        .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownKey {
        context: String,
        key: String,
        suggestion: Option<String>,
    },

    #[error("{context}: More than one value provided for option '{key}'")]
    DuplicateKey { context: String, key: String },

    #[error("{context}: Unknown value '{value}' for option '{key}'")]
    UnknownValue {
        context: String,
        key: String,
        value: String,
    },

    #[error("{context}: Cannot deduce {what} without 'Compiler-ID'")]
    CannotDeduce { context: String, what: String },

    #[error("More than one library is registered as '{namespace}/{name}'")]
    DuplicateLibraryName { namespace: String, name: String },

    #[error("Unable to find usage requirements for '{namespace}/{name}'")]
    UnknownUsage { namespace: String, name: String },

    #[error("Compilation failed for [{qualifier}] {}:\nSubcommand FAILED: {command}\n{output}", .file.display())]
    CompileFailed {
        qualifier: String,
        file: PathBuf,
        command: String,
        output: String,
    },

    #[error("Creating static library archive [{}] failed for '{name}':\nSubcommand FAILED: {command}\n{output}", .archive.display())]
    ArchiveFailed {
        name: String,
        archive: PathBuf,
        command: String,
        output: String,
    },

    #[error("Linking executable [{}] failed for '{name}':\nSubcommand FAILED: {command}\n{output}", .executable.display())]
    LinkFailed {
        name: String,
        executable: PathBuf,
        command: String,
        output: String,
    },

    #[error("{failed} of {total} compile jobs failed")]
    CompilePassFailed { failed: usize, total: usize },

    #[error("I/O error at {}: {error}", .path.display())]
    IoAt {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            error,
        }
    }

    /// Create an unknown-option error with a typo suggestion
    pub fn unknown_key(
        context: impl Into<String>,
        key: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self::UnknownKey {
            context: context.into(),
            key: key.into(),
            suggestion,
        }
    }

    /// Create an unknown-value error
    pub fn unknown_value(
        context: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::UnknownValue {
            context: context.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a cannot-deduce error
    pub fn cannot_deduce(context: impl Into<String>, what: impl Into<String>) -> Self {
        Self::CannotDeduce {
            context: context.into(),
            what: what.into(),
        }
    }
}
