use std::collections::HashMap;
use std::path::PathBuf;

use crate::language::Language;

/// Resolves executable names to paths.
///
/// This is the only way the engine looks programs up, so that tests can
/// confine it to a directory of fake tools.
pub trait ToolLocator {
    /// Returns the path of `program`, if it can be found.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Returns the first of `candidates` that can be found, with its name.
    fn locate_first<'c>(&self, candidates: &'c [String]) -> Option<(&'c str, PathBuf)> {
        candidates
            .iter()
            .find_map(|name| self.locate(name).map(|path| (name.as_str(), path)))
    }
}

/// Search-path based [ToolLocator].
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: Option<Vec<PathBuf>>,
}

impl SearchPath {
    /// Looks programs up in the `PATH` environment variable.
    pub const fn from_env() -> Self {
        Self { dirs: None }
    }

    /// Looks programs up in the given directories only.
    pub fn in_dirs(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: Some(dirs.into_iter().map(Into::into).collect()),
        }
    }
}

impl ToolLocator for SearchPath {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let res = match &self.dirs {
            None => which::which(program),
            Some(dirs) if dirs.is_empty() => return None,
            Some(dirs) => {
                let paths = std::env::join_paths(dirs).ok()?;
                let cwd = std::env::current_dir().ok()?;
                which::which_in(program, Some(paths), cwd)
            }
        };

        res.ok()
    }
}

/// Executables accepted for each language, any one of which is enough.
#[derive(Debug, Clone)]
pub struct ToolchainTable {
    tools: HashMap<Language, Vec<String>>,
}

impl ToolchainTable {
    /// Returns the accepted executables for `language`.
    pub fn candidates(&self, language: Language) -> &[String] {
        self.tools.get(&language).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replaces the accepted executables for `language`.
    pub fn set(&mut self, language: Language, candidates: &[&str]) {
        self.tools.insert(
            language,
            candidates.iter().map(|s| (*s).to_owned()).collect(),
        );
    }
}

impl Default for ToolchainTable {
    fn default() -> Self {
        let mut table = Self {
            tools: HashMap::new(),
        };

        table.set(Language::C, &["gcc", "clang"]);
        table.set(Language::Cpp, &["g++", "clang++"]);
        table.set(Language::Rust, &["rustc", "cargo"]);
        table.set(Language::Go, &["go", "dlv"]);
        table.set(Language::Zig, &["zig"]);
        table.set(Language::Python, &["python3"]);
        table.set(Language::Node, &["node"]);
        table.set(Language::Ruby, &["ruby"]);
        table.set(Language::Php, &["php"]);
        table.set(Language::Bash, &["bash", "sh"]);
        table.set(Language::Perl, &["perl"]);
        table.set(Language::Java, &["java", "javac"]);

        table
    }
}

/// Checks that a language's toolchain is installed.
pub struct ToolchainVerifier<'a, L> {
    table: &'a ToolchainTable,
    locator: &'a L,
}

impl<'a, L: ToolLocator> ToolchainVerifier<'a, L> {
    /// Creates a verifier over the given table.
    pub const fn new(table: &'a ToolchainTable, locator: &'a L) -> Self {
        Self { table, locator }
    }

    /// Succeeds if at least one accepted executable for `language` is
    /// found (or if the language needs none).
    pub fn verify(&self, language: Language) -> crate::Result<()> {
        let candidates = self.table.candidates(language);

        if candidates.is_empty() || self.locator.locate_first(candidates).is_some() {
            return Ok(());
        }

        Err(crate::Error::ToolchainMissing {
            language,
            candidates: candidates.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchPath, ToolLocator, ToolchainTable, ToolchainVerifier};
    use crate::language::Language;

    #[test]
    fn empty_search_path_finds_nothing() {
        assert!(SearchPath::in_dirs(Vec::<std::path::PathBuf>::new())
            .locate("sh")
            .is_none());
    }

    #[test]
    fn languages_without_tools_always_pass() {
        let table = ToolchainTable::default();
        let locator = SearchPath::in_dirs(Vec::<std::path::PathBuf>::new());
        let verifier = ToolchainVerifier::new(&table, &locator);

        verifier.verify(Language::Binary).unwrap();
        verifier.verify(Language::Unknown).unwrap();
    }

    #[test]
    fn missing_toolchain_names_every_candidate() {
        let table = ToolchainTable::default();
        let locator = SearchPath::in_dirs(Vec::<std::path::PathBuf>::new());
        let verifier = ToolchainVerifier::new(&table, &locator);

        let err = verifier.verify(Language::C).unwrap_err();

        match err {
            crate::Error::ToolchainMissing {
                language,
                candidates,
            } => {
                assert_eq!(language, Language::C);
                assert_eq!(candidates, ["gcc", "clang"]);
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn second_candidate_is_enough() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let clang = dir.path().join("clang");
        std::fs::write(&clang, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&clang, std::fs::Permissions::from_mode(0o755)).unwrap();

        let table = ToolchainTable::default();
        let locator = SearchPath::in_dirs([dir.path()]);
        let verifier = ToolchainVerifier::new(&table, &locator);

        verifier.verify(Language::C).unwrap();
        assert_eq!(
            locator.locate_first(table.candidates(Language::C)),
            Some(("clang", clang))
        );
    }
}
