use std::path::PathBuf;

use crate::language::Language;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The debug target doesn't exist.
    #[error("{}: no such file", .0.display())]
    FileNotFound(PathBuf),

    /// The detected language has no compile, debug or adapter path.
    #[error("unsupported or unknown file type ({0})")]
    UnsupportedLanguage(Language),

    /// None of the executables accepted for a language is on the search path.
    #[error(
        "required tool(s) for language '{language}' not found: {}",
        candidates.join(", ")
    )]
    ToolchainMissing {
        /// Language whose toolchain is missing.
        language: Language,

        /// Every executable that would have been accepted.
        candidates: Vec<String>,
    },

    /// The compiler exited with a non-zero status.
    #[error("compilation failed ({language}): {stderr}")]
    CompilationFailed {
        /// Language of the source being compiled.
        language: Language,

        /// Captured compiler diagnostics.
        stderr: String,
    },

    /// The target needs an emulator which isn't installed.
    #[error(
        "binary architecture '{arch}' does not match host '{host}', and emulator ({}) not found",
        emulator.as_deref().unwrap_or("none known")
    )]
    ArchMismatchUnbridgeable {
        /// Detected target architecture token.
        arch: String,

        /// Host architecture string.
        host: String,

        /// Emulator program associated with the target architecture.
        emulator: Option<String>,
    },

    /// No debugger candidate is on the search path.
    #[error(
        "no suitable debugger for '{language}' found on PATH (tried {})",
        candidates.join(", ")
    )]
    DebuggerNotFound {
        /// Language being debugged.
        language: Language,

        /// Debugger executables that were tried, in order.
        candidates: Vec<String>,
    },

    /// The interpreted language has no debug adapter.
    #[error("interpreted debugging for {0} is not implemented")]
    AdapterUnimplemented(Language),

    /// The JVM adapter needs a pre-built runnable archive.
    #[error("{}: a runnable .jar archive is required", .0.display())]
    RunnableArchiveRequired(PathBuf),

    /// A child process couldn't be spawned.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,

        /// Underlying OS error.
        source: std::io::Error,
    },

    /// File open/create error.
    #[error("{}: {}", .0.display(), .1)]
    File(PathBuf, std::io::Error),

    /// Other I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Summary serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
