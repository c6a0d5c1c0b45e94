use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::request::BreakTarget;
use crate::selector::Dialect;

/// Strings searched for around the program counter.
const CANARY_STRINGS: [&str; 3] = ["/bin/sh", "flag", "system"];

/// How the debugger reaches the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The debugger spawns the debuggee.
    Local,

    /// The debugger connects to an emulator's stub on a local port.
    Remote {
        /// Port of the remote-debug stub.
        port: u16,
    },
}

/// Everything a debugger script encodes.
#[derive(Debug, Clone)]
pub struct ScriptContext<'a> {
    /// Binary to load.
    pub binary: &'a Path,

    /// Source the binary was built from, if any.
    pub source: Option<&'a Path>,

    /// Where to stop.
    pub break_target: &'a BreakTarget,

    /// Trimmed, non-empty expressions to inspect.
    pub expressions: &'a [&'a str],

    /// How the debuggee is reached.
    pub mode: RunMode,

    /// Architecture to force, empty to let the debugger decide.
    pub arch: &'a str,

    /// Environment of the debuggee (local mode).
    pub env: &'a BTreeMap<String, String>,
}

/// Debugger script written to a temporary file.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct DebugScript {
    path: TempPath,
    content: String,
}

impl DebugScript {
    /// Returns the path of the script file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the full script text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Removes the script file now.
    pub fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Emits debugger scripts.
pub struct ScriptGenerator<'a> {
    runtime_support: &'a [PathBuf],
}

impl<'a> ScriptGenerator<'a> {
    /// Creates a generator; the first existing `runtime_support` script is
    /// sourced by gdb scripts.
    pub const fn new(runtime_support: &'a [PathBuf]) -> Self {
        Self { runtime_support }
    }

    /// Writes the script for `dialect` to a fresh temporary file.
    pub fn write(&self, dialect: Dialect, ctx: &ScriptContext<'_>) -> crate::Result<DebugScript> {
        let content = self.render(dialect, ctx);

        let mut file = tempfile::Builder::new()
            .prefix("scry-")
            .suffix(dialect.script_extension())
            .tempfile()?;

        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| crate::Error::File(file.path().to_path_buf(), e))?;

        let path = file.into_temp_path();

        tracing::debug!(path = %path.display(), script = %content, "debugger script");

        Ok(DebugScript { path, content })
    }

    /// Renders the script text for `dialect`.
    pub fn render(&self, dialect: Dialect, ctx: &ScriptContext<'_>) -> String {
        let lines = match dialect {
            Dialect::Gdb => self.gdb_lines(ctx),
            Dialect::Lldb => lldb_lines(ctx),
            Dialect::Delve => delve_lines(ctx),
        };

        lines.join("\n")
    }

    fn gdb_lines(&self, ctx: &ScriptContext<'_>) -> Vec<String> {
        let mut lines = vec!["set pagination off".to_owned(), "set confirm off".to_owned()];

        if !ctx.arch.is_empty() {
            lines.push(format!("set architecture {}", ctx.arch));
        }

        if let Some(support) = self.runtime_support.iter().find(|p| p.exists()) {
            lines.push(format!("source {}", support.display()));
        }

        lines.push("show architecture".to_owned());
        lines.push(format!("file {}", quote(&ctx.binary.to_string_lossy())));

        if ctx.mode == RunMode::Local {
            lines.extend(
                ctx.env
                    .iter()
                    .map(|(k, v)| format!("set environment {k}={v}")),
            );
        }

        if !ctx.break_target.is_none() {
            lines.push(format!("break {}", quote(&ctx.break_target.to_string())));
        }

        match ctx.mode {
            RunMode::Local => lines.push("run".to_owned()),
            RunMode::Remote { port } => {
                lines.push(format!("target remote :{port}"));
                lines.push("continue".to_owned());
            }
        }

        let banner = |title: &str| format!(r#"printf "\n=== {title} ===\n""#);

        lines.push(banner("DISASSEMBLY AROUND PC"));
        lines.push("x/32i $pc-8".to_owned());
        lines.push(banner("REGISTERS"));
        lines.push("info registers".to_owned());
        lines.push(banner("STACK TOP"));
        lines.push("x/64wx $sp".to_owned());
        lines.push(banner("SYMBOLS (some)"));
        lines.push("info functions".to_owned());

        for expr in ctx.expressions {
            lines.push(banner(&format!("EXPR: {expr}")));

            if is_raw_address(expr) {
                lines.push(format!("x/64xb {expr}"));
                lines.push(format!("x/s {expr}"));
            } else {
                lines.push(format!("print/x (void*)&{expr}"));
                lines.push(format!("print/x {expr}"));
                lines.push(format!("x/64xb &{expr}"));
                lines.push(format!("x/s &{expr}"));
            }
        }

        lines.push(banner("SEARCH COMMON STRINGS NEAR PC"));
        lines.extend(
            CANARY_STRINGS
                .iter()
                .map(|s| format!(r#"find $pc, $pc + 8192, "{s}""#)),
        );
        lines.push("quit".to_owned());

        lines
    }
}

fn lldb_lines(ctx: &ScriptContext<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    if ctx.mode == RunMode::Local {
        lines.extend(
            ctx.env
                .iter()
                .map(|(k, v)| format!("settings set target.env-vars {k}={v}")),
        );
    }

    match ctx.break_target {
        BreakTarget::None => (),
        BreakTarget::Line(line) => match ctx.source.and_then(Path::file_name) {
            Some(file) => lines.push(format!(
                "breakpoint set -f {} -l {line}",
                quote(&file.to_string_lossy())
            )),
            None => lines.push(format!("breakpoint set -l {line}")),
        },
        BreakTarget::Symbol(sym) => lines.push(format!("breakpoint set -n {}", quote(sym))),
    }

    lines.push(format!(
        "target create {}",
        quote(&ctx.binary.to_string_lossy())
    ));

    match ctx.mode {
        RunMode::Local => lines.push("run".to_owned()),
        RunMode::Remote { port } => {
            lines.push(format!("gdb-remote {port}"));
            lines.push("continue".to_owned());
        }
    }

    lines.push("thread backtrace all".to_owned());
    lines.push("quit".to_owned());

    lines
}

fn delve_lines(ctx: &ScriptContext<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    match ctx.break_target {
        BreakTarget::None => (),
        BreakTarget::Line(line) => match ctx.source.and_then(Path::file_name) {
            Some(file) => lines.push(format!("break {}:{line}", file.to_string_lossy())),
            None => lines.push(format!("break {line}")),
        },
        BreakTarget::Symbol(sym) => lines.push(format!("break {sym}")),
    }

    lines.extend(["continue", "stack", "regs", "locals"].map(str::to_owned));
    lines.extend(ctx.expressions.iter().map(|e| format!("print {e}")));
    lines.push("exit".to_owned());

    lines
}

/// Returns whether an expression is a raw address rather than a symbol.
fn is_raw_address(expr: &str) -> bool {
    expr.starts_with("0x")
}

/// Quotes `s` the way a POSIX shell would, if needed.
fn quote(s: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c);

    if !s.is_empty() && s.chars().all(is_safe) {
        s.to_owned()
    } else {
        format!("'{}'", s.replace('\'', r#"'"'"'"#))
    }
}
