//! This crate drives external debuggers over a source file or a binary, and
//! reports what they saw in a machine-readable form.
//!
//! For a given target, the engine:
//! - detects the implementation language (extension, shebang, content),
//! - builds a debug binary with security mitigations disabled (compiled
//!   languages only),
//! - detects the target architecture, and runs it under a user-mode
//!   emulator when it doesn't match the host,
//! - picks an installed debugger front-end (`gdb`, `lldb`, `dlv`), writes a
//!   script for it and runs it under a time bound,
//! - returns the captured output with a JSON summary embedded in stderr.
//!
//! Interpreted languages are run under their debug adapter instead.
//!
//! Every file and process created for a request is released before the
//! request returns, whatever the outcome.
//!
//! # Example
//!
//! ```no_run
//! use scry_engine::{DebugRequest, Debugger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let debugger = Debugger::new();
//!
//!     let request = DebugRequest::new("vuln.c")
//!         .break_at("vulnerable_function")
//!         .expressions("buffer");
//!
//!     let output = debugger.debug(request).await.unwrap();
//!     assert_eq!(output.summary.debugger, "gdb");
//!
//!     let (_stdout, stderr) = output.into_parts();
//!     let summary = scry_engine::summary::extract(&stderr).unwrap().unwrap();
//! }
//! ```

/// Module implementing debug adapters of interpreted languages.
pub mod adapter;

/// Module implementing architecture detection and matching.
pub mod arch;

/// Module implementing the build step of compiled languages.
pub mod compiler;

/// Module implementing the emulator bridge.
pub mod emulator;

/// Module implementing language detection.
pub mod language;

/// Module implementing debugger process orchestration.
pub mod process;

/// Module implementing debugger script generation.
pub mod script;

/// Module implementing debugger selection.
pub mod selector;

/// Module implementing the session summary.
pub mod summary;

/// Module implementing executable lookup and toolchain checks.
pub mod toolchain;

mod debugger;
mod error;
mod request;
mod tables;

pub use self::debugger::{Builder, Debugger, Detection};
pub use self::error::{Error, Result};
pub use self::language::Language;
pub use self::request::{BreakTarget, DEFAULT_TIMEOUT, DebugRequest, split_expressions};
pub use self::summary::{DebugOutput, DebugSummary};
pub use self::tables::Tables;
pub use self::toolchain::{SearchPath, ToolLocator};
