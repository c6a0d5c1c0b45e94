use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::language::Language;

/// Default bound on a debugging session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Where to stop the debuggee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BreakTarget {
    /// Run to completion without stopping.
    #[default]
    None,

    /// Source line number.
    Line(u32),

    /// Function symbol.
    Symbol(String),
}

impl BreakTarget {
    /// Returns whether no breakpoint is requested.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<&str> for BreakTarget {
    fn from(s: &str) -> Self {
        let s = s.trim();

        if s.is_empty() {
            Self::None
        } else if let Ok(line) = s.parse() {
            Self::Line(line)
        } else {
            Self::Symbol(s.to_owned())
        }
    }
}

impl From<String> for BreakTarget {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<u32> for BreakTarget {
    fn from(line: u32) -> Self {
        Self::Line(line)
    }
}

impl fmt::Display for BreakTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Line(line) => write!(f, "{line}"),
            Self::Symbol(sym) => f.write_str(sym),
        }
    }
}

/// A single debugging request.
///
/// Built once with the consuming setters, then handed to
/// [Debugger::debug](crate::Debugger::debug).
#[derive(Debug, Clone)]
pub struct DebugRequest {
    /// Source file or binary to debug.
    pub file: PathBuf,

    /// Language override, bypassing detection.
    pub language: Option<Language>,

    /// Where to stop.
    pub break_target: BreakTarget,

    /// Comma-separated expressions to inspect once stopped.
    pub expressions: String,

    /// Named input values, exposed to the debuggee as environment variables.
    pub input_vars: BTreeMap<String, String>,

    /// Bound on the debugging session.
    pub timeout: Duration,
}

impl DebugRequest {
    /// Creates a request for `file`, with no breakpoint, no expression and
    /// the default timeout.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            language: None,
            break_target: BreakTarget::None,
            expressions: String::new(),
            input_vars: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets where to stop.
    pub fn break_at(mut self, target: impl Into<BreakTarget>) -> Self {
        self.break_target = target.into();
        self
    }

    /// Sets the comma-separated expressions to inspect.
    pub fn expressions(mut self, expressions: impl Into<String>) -> Self {
        self.expressions = expressions.into();
        self
    }

    /// Adds a named input value.
    pub fn input_var(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.input_vars.insert(name.into(), value.to_string());
        self
    }

    /// Overrides language detection.
    pub fn language(mut self, language: impl Into<Option<Language>>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the bound on the debugging session.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the trimmed, non-empty expressions.
    pub fn expression_list(&self) -> Vec<&str> {
        split_expressions(&self.expressions)
    }
}

/// Splits a comma-separated expression list, dropping empty entries.
pub fn split_expressions(expressions: &str) -> Vec<&str> {
    expressions
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}
