use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::process::ProcessOutput;

/// Line preceding the embedded summary in the returned stderr.
pub const SUMMARY_START: &str = "__DEBUG_SUMMARY_JSON_START__";

/// Line following the embedded summary in the returned stderr.
pub const SUMMARY_END: &str = "__DEBUG_SUMMARY_JSON_END__";

/// Machine-readable record of one debugging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSummary {
    /// UTC time of assembly, ISO-8601.
    pub timestamp: String,

    /// Resolved language.
    pub language: Language,

    /// Debugger (or debug adapter) name.
    pub debugger: String,

    /// Path-specific details.
    #[serde(flatten)]
    pub session: SessionDetails,

    /// Debugger standard output.
    pub stdout: String,

    /// Debugger standard error, without the embedded summary.
    pub stderr: String,

    /// Exit code, `null` if the debugger was killed.
    pub exit_code: Option<i32>,

    /// Whether the debugger was killed for exceeding its time bound.
    pub timed_out: bool,

    /// Whether the debugger exited with status 0 in time.
    pub success: bool,
}

/// Fields that depend on how the target was debugged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionDetails {
    /// Compiled (or pre-built) binary under a native debugger.
    Native {
        /// Full debugger command line.
        debugger_cmd: Vec<String>,

        /// Generated script contents.
        script: String,

        /// Binary handed to the debugger.
        binary: PathBuf,

        /// Detected architecture token, empty if unknown.
        arch_detected: String,

        /// Host architecture.
        host_arch: String,

        /// Whether the binary runs natively on the host.
        arch_ok: bool,
    },

    /// Interpreted program under a debug adapter.
    Interpreted {
        /// Full adapter command line.
        cmd: Vec<String>,
    },
}

/// Result of [Debugger::debug](crate::Debugger::debug).
#[derive(Debug, Clone)]
pub struct DebugOutput {
    /// Debugger standard output, untouched.
    pub stdout: String,

    /// Debugger standard error, followed by the embedded summary.
    pub stderr: String,

    /// The summary embedded in `stderr`.
    pub summary: DebugSummary,
}

impl DebugOutput {
    /// Returns the `(stdout, stderr)` pair.
    pub fn into_parts(self) -> (String, String) {
        (self.stdout, self.stderr)
    }
}

/// Builds the summary of a finished session and embeds it in stderr.
pub fn assemble(
    language: Language,
    debugger: impl Into<String>,
    session: SessionDetails,
    output: ProcessOutput,
) -> crate::Result<DebugOutput> {
    let success = output.success();

    let summary = DebugSummary {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        language,
        debugger: debugger.into(),
        session,
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.exit_code,
        timed_out: output.timed_out,
        success,
    };

    let json = serde_json::to_string(&summary)?;

    Ok(DebugOutput {
        stdout: summary.stdout.clone(),
        stderr: format!(
            "{}\n\n{SUMMARY_START}\n{json}\n{SUMMARY_END}\n",
            summary.stderr
        ),
        summary,
    })
}

/// Locates and decodes the summary embedded in `stderr`.
///
/// Returns `None` if no complete summary is embedded.
pub fn extract(stderr: &str) -> Option<crate::Result<DebugSummary>> {
    let start = stderr.rfind(SUMMARY_START)? + SUMMARY_START.len();
    let len = stderr[start..].find(SUMMARY_END)?;

    Some(serde_json::from_str(stderr[start..start + len].trim()).map_err(Into::into))
}
