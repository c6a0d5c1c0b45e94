use std::path::{Path, PathBuf};

use crate::arch::HostInfo;
use crate::language::Language;
use crate::script::RunMode;
use crate::toolchain::ToolLocator;

/// Command syntax accepted by a debugger front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `gdb` and its wrappers.
    Gdb,
    /// `lldb` and its wrappers.
    Lldb,
    /// Delve's terminal client.
    Delve,
}

impl Dialect {
    /// Returns the extension used for script files of this dialect.
    pub const fn script_extension(self) -> &'static str {
        match self {
            Self::Gdb => ".gdb",
            Self::Lldb => ".lldb",
            Self::Delve => ".dlv",
        }
    }

    /// Returns whether the dialect can drive an emulator's remote stub.
    pub const fn supports_remote(self) -> bool {
        !matches!(self, Self::Delve)
    }
}

/// Debugger executable worth trying.
#[derive(Debug, Clone)]
pub struct DebuggerCandidate {
    /// Executable name.
    pub name: String,

    /// Script dialect it speaks.
    pub dialect: Dialect,
}

fn candidates(names: &[(&str, Dialect)]) -> Vec<DebuggerCandidate> {
    names
        .iter()
        .map(|(name, dialect)| DebuggerCandidate {
            name: (*name).to_owned(),
            dialect: *dialect,
        })
        .collect()
}

/// Ordered debugger candidates per language family.
#[derive(Debug, Clone)]
pub struct DebuggerTable {
    /// Go: a single required front-end.
    pub go: Vec<DebuggerCandidate>,

    /// Rust: language-aware wrappers first.
    pub rust: Vec<DebuggerCandidate>,

    /// C, C++, Zig and pre-built binaries.
    pub native: Vec<DebuggerCandidate>,

    /// Native order on macOS, used when `lldb` is installed.
    pub native_darwin: Vec<DebuggerCandidate>,
}

impl Default for DebuggerTable {
    fn default() -> Self {
        use Dialect::{Delve, Gdb, Lldb};

        Self {
            go: candidates(&[("dlv", Delve)]),
            rust: candidates(&[
                ("rust-gdb", Gdb),
                ("rust-lldb", Lldb),
                ("gdb", Gdb),
                ("lldb", Lldb),
            ]),
            native: candidates(&[("gdb-multiarch", Gdb), ("gdb", Gdb), ("lldb", Lldb)]),
            native_darwin: candidates(&[("lldb", Lldb), ("gdb", Gdb), ("gdb-multiarch", Gdb)]),
        }
    }
}

/// Debugger resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerChoice {
    /// Resolved executable path.
    pub path: PathBuf,

    /// Display name (the candidate name).
    pub name: String,

    /// Script dialect.
    pub dialect: Dialect,
}

impl DebuggerChoice {
    /// Builds the command line running `script` against `binary`.
    pub fn invocation(&self, script: &Path, binary: &Path, mode: RunMode) -> Vec<String> {
        let exe = self.path.display().to_string();
        let script = script.display().to_string();
        let binary = binary.display().to_string();

        match (self.dialect, mode) {
            (Dialect::Gdb, RunMode::Local) => {
                vec![exe, "-q".into(), "-x".into(), script, "--args".into(), binary]
            }
            (Dialect::Gdb, RunMode::Remote { .. }) => vec![exe, "-q".into(), "-x".into(), script],
            (Dialect::Lldb, _) => vec![exe, "-s".into(), script],
            (Dialect::Delve, _) => vec![
                exe,
                "exec".into(),
                binary,
                "--init".into(),
                script,
                "--allow-non-terminal-interactive=true".into(),
            ],
        }
    }
}

/// Picks the debugger executable for a language.
pub struct DebuggerSelector<'a, L> {
    table: &'a DebuggerTable,
    locator: &'a L,
    host: &'a HostInfo,
}

impl<'a, L: ToolLocator> DebuggerSelector<'a, L> {
    /// Creates a selector over the given table.
    pub const fn new(table: &'a DebuggerTable, locator: &'a L, host: &'a HostInfo) -> Self {
        Self {
            table,
            locator,
            host,
        }
    }

    /// Returns the ordered candidates for `language`.
    pub fn candidates(&self, language: Language) -> crate::Result<&'a [DebuggerCandidate]> {
        let list = match language {
            Language::Go => &self.table.go,
            Language::Rust => &self.table.rust,
            Language::C | Language::Cpp | Language::Zig | Language::Binary => {
                if self.host.is_darwin() && self.locator.locate("lldb").is_some() {
                    &self.table.native_darwin
                } else {
                    &self.table.native
                }
            }
            lang => return Err(crate::Error::UnsupportedLanguage(lang)),
        };

        Ok(list.as_slice())
    }

    /// Returns the first candidate found on the search path.
    pub fn select(&self, language: Language) -> crate::Result<DebuggerChoice> {
        let candidates = self.candidates(language)?;

        candidates
            .iter()
            .find_map(|c| {
                self.locator.locate(&c.name).map(|path| DebuggerChoice {
                    path,
                    name: c.name.clone(),
                    dialect: c.dialect,
                })
            })
            .ok_or_else(|| crate::Error::DebuggerNotFound {
                language,
                candidates: candidates.iter().map(|c| c.name.clone()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    use super::{DebuggerChoice, DebuggerSelector, DebuggerTable, Dialect};
    use crate::arch::HostInfo;
    use crate::language::Language;
    use crate::script::RunMode;
    use crate::toolchain::ToolLocator;

    struct FakeTools(HashSet<&'static str>);

    impl ToolLocator for FakeTools {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.0
                .contains(program)
                .then(|| Path::new("/opt/fake/bin").join(program))
        }
    }

    fn host(os: &str) -> HostInfo {
        HostInfo {
            arch: "x86_64".to_owned(),
            os: os.to_owned(),
        }
    }

    fn select(tools: &[&'static str], os: &str, lang: Language) -> crate::Result<DebuggerChoice> {
        let table = DebuggerTable::default();
        let tools = FakeTools(tools.iter().copied().collect());
        let host = host(os);

        DebuggerSelector::new(&table, &tools, &host).select(lang)
    }

    #[test]
    fn go_requires_delve() {
        let choice = select(&["dlv", "gdb"], "linux", Language::Go).unwrap();
        assert_eq!(choice.name, "dlv");
        assert_eq!(choice.dialect, Dialect::Delve);

        let err = select(&["gdb", "lldb"], "linux", Language::Go).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::DebuggerNotFound { candidates, .. } if candidates == ["dlv"]
        ));
    }

    #[test]
    fn rust_prefers_wrappers() {
        let all = ["rust-gdb", "rust-lldb", "gdb", "lldb"];
        assert_eq!(select(&all, "linux", Language::Rust).unwrap().name, "rust-gdb");

        let choice = select(&all[1..], "linux", Language::Rust).unwrap();
        assert_eq!(choice.name, "rust-lldb");
        assert_eq!(choice.dialect, Dialect::Lldb);

        assert_eq!(select(&all[2..], "linux", Language::Rust).unwrap().name, "gdb");
        assert_eq!(select(&all[3..], "linux", Language::Rust).unwrap().name, "lldb");
    }

    #[test]
    fn native_order_depends_on_platform() {
        let all = ["gdb-multiarch", "gdb", "lldb"];

        assert_eq!(select(&all, "linux", Language::C).unwrap().name, "gdb-multiarch");
        assert_eq!(select(&all[1..], "linux", Language::Cpp).unwrap().name, "gdb");
        assert_eq!(select(&all[2..], "linux", Language::Zig).unwrap().name, "lldb");

        assert_eq!(select(&all, "darwin", Language::Binary).unwrap().name, "lldb");
        assert_eq!(
            select(&all[..2], "darwin", Language::Binary).unwrap().name,
            "gdb-multiarch"
        );
    }

    #[test]
    fn nothing_found() {
        let err = select(&[], "linux", Language::C).unwrap_err();
        assert!(matches!(err, crate::Error::DebuggerNotFound { .. }));

        let err = select(&["gdb"], "linux", Language::Python).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedLanguage(Language::Python)));
    }

    #[test]
    fn invocation_templates() {
        let gdb = DebuggerChoice {
            path: "/usr/bin/gdb".into(),
            name: "gdb".to_owned(),
            dialect: Dialect::Gdb,
        };
        let script = Path::new("/tmp/s.gdb");
        let bin = Path::new("/w/a.ctf");

        assert_eq!(
            gdb.invocation(script, bin, RunMode::Local),
            ["/usr/bin/gdb", "-q", "-x", "/tmp/s.gdb", "--args", "/w/a.ctf"]
        );
        assert_eq!(
            gdb.invocation(script, bin, RunMode::Remote { port: 1234 }),
            ["/usr/bin/gdb", "-q", "-x", "/tmp/s.gdb"]
        );

        let dlv = DebuggerChoice {
            path: "/go/bin/dlv".into(),
            name: "dlv".to_owned(),
            dialect: Dialect::Delve,
        };
        assert_eq!(
            dlv.invocation(script, bin, RunMode::Local)[..5],
            ["/go/bin/dlv", "exec", "/w/a.ctf", "--init", "/tmp/s.gdb"]
        );
    }
}
