use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tokio::io::AsyncReadExt;

use crate::toolchain::ToolLocator;

/// Number of leading bytes inspected for a shebang line.
const SHEBANG_PROBE_LEN: usize = 128;

/// Language of a debug target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C source.
    C,
    /// C++ source.
    Cpp,
    /// Rust source.
    Rust,
    /// Go source.
    Go,
    /// Zig source.
    Zig,
    /// Python script.
    Python,
    /// JavaScript/TypeScript, run by Node.
    Node,
    /// Ruby script.
    Ruby,
    /// PHP script.
    Php,
    /// Shell script.
    Bash,
    /// Perl script.
    Perl,
    /// Java source or archive.
    Java,
    /// Pre-built executable.
    Binary,
    /// Anything else.
    Unknown,
}

/// How a language reaches a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Built by [SourceCompiler](crate::compiler::SourceCompiler), then
    /// handed to a native debugger.
    Compiled,

    /// Handed to a native debugger as is.
    Prebuilt,

    /// Run under a language-specific debug adapter.
    Interpreted,

    /// No path to a debugger.
    Unsupported,
}

impl Language {
    /// Every language tag, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::C,
        Self::Cpp,
        Self::Rust,
        Self::Go,
        Self::Zig,
        Self::Python,
        Self::Node,
        Self::Ruby,
        Self::Php,
        Self::Bash,
        Self::Perl,
        Self::Java,
        Self::Binary,
        Self::Unknown,
    ];

    /// Returns the tag used in summaries and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Zig => "zig",
            Self::Python => "python",
            Self::Node => "node",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Bash => "bash",
            Self::Perl => "perl",
            Self::Java => "java",
            Self::Binary => "binary",
            Self::Unknown => "unknown",
        }
    }

    /// Returns how this language is brought under a debugger.
    pub const fn handling(self) -> Handling {
        match self {
            Self::C | Self::Cpp | Self::Rust | Self::Go | Self::Zig => Handling::Compiled,
            Self::Binary => Handling::Prebuilt,
            Self::Python
            | Self::Node
            | Self::Ruby
            | Self::Php
            | Self::Bash
            | Self::Perl
            | Self::Java => Handling::Interpreted,
            Self::Unknown => Handling::Unsupported,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown language tag.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();

        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lower)
            .ok_or(UnknownLanguage(s.to_owned()))
    }
}

/// Shebang matching rule: any needle found in the shebang line selects
/// the language.
#[derive(Debug, Clone)]
pub struct ShebangRule {
    /// Substrings looked up in the shebang line.
    pub needles: Vec<String>,

    /// Language selected on match.
    pub language: Language,
}

impl ShebangRule {
    fn new(needles: &[&str], language: Language) -> Self {
        Self {
            needles: needles.iter().map(|s| (*s).to_owned()).collect(),
            language,
        }
    }
}

/// Lookup data driving language detection.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    /// Lowercase extension (with the leading dot) to language.
    pub extensions: HashMap<String, Language>,

    /// Shebang rules, tried in order.
    pub shebangs: Vec<ShebangRule>,

    /// Extensions considered text when no MIME probe is available.
    pub text_extensions: HashSet<String>,

    /// Program answering `--brief --mime-type <path>`.
    pub mime_probe: String,
}

impl Default for LanguageTable {
    fn default() -> Self {
        let extensions = [
            (".c", Language::C),
            (".cpp", Language::Cpp),
            (".cc", Language::Cpp),
            (".cxx", Language::Cpp),
            (".c++", Language::Cpp),
            (".rs", Language::Rust),
            (".go", Language::Go),
            (".zig", Language::Zig),
            (".py", Language::Python),
            (".js", Language::Node),
            (".mjs", Language::Node),
            (".ts", Language::Node),
            (".rb", Language::Ruby),
            (".php", Language::Php),
            (".sh", Language::Bash),
            (".pl", Language::Perl),
            (".java", Language::Java),
            (".jar", Language::Java),
        ];

        let text_extensions = [
            ".c", ".cpp", ".cc", ".py", ".java", ".txt", ".h", ".rs", ".go", ".js", ".rb", ".php",
            ".sh",
        ];

        Self {
            extensions: extensions
                .into_iter()
                .map(|(ext, lang)| (ext.to_owned(), lang))
                .collect(),
            shebangs: vec![
                ShebangRule::new(&["python"], Language::Python),
                ShebangRule::new(&["node", "nodejs"], Language::Node),
                ShebangRule::new(&["ruby"], Language::Ruby),
                ShebangRule::new(&["php"], Language::Php),
                ShebangRule::new(&["perl"], Language::Perl),
                ShebangRule::new(&["bash", "sh"], Language::Bash),
            ],
            text_extensions: text_extensions.into_iter().map(str::to_owned).collect(),
            mime_probe: "file".to_owned(),
        }
    }
}

/// Maps a debug target to a [Language].
pub struct LanguageDetector<'a, L> {
    table: &'a LanguageTable,
    locator: &'a L,
}

impl<'a, L: ToolLocator> LanguageDetector<'a, L> {
    /// Creates a detector over the given table.
    pub const fn new(table: &'a LanguageTable, locator: &'a L) -> Self {
        Self { table, locator }
    }

    /// Detects the language of `path`.
    ///
    /// An explicit language always wins. Otherwise the extension, then the
    /// shebang line, then a binary-content probe are consulted, falling
    /// back to [Language::Unknown].
    pub async fn detect(&self, path: &Path, explicit: Option<Language>) -> Language {
        if let Some(lang) = explicit {
            return lang;
        }

        if let Some(lang) = self.by_extension(path) {
            return lang;
        }

        if let Some(shebang) = read_shebang(path).await {
            if let Some(lang) = self.by_shebang(&shebang) {
                return lang;
            }
        }

        if self.is_binary_file(path).await {
            Language::Binary
        } else {
            Language::Unknown
        }
    }

    /// Looks the (lowercased) extension of `path` up.
    pub fn by_extension(&self, path: &Path) -> Option<Language> {
        let ext = dotted_extension(path)?;
        self.table.extensions.get(&ext).copied()
    }

    /// Matches a shebang line against the shebang rules.
    pub fn by_shebang(&self, shebang: &str) -> Option<Language> {
        self.table
            .shebangs
            .iter()
            .find(|rule| rule.needles.iter().any(|n| shebang.contains(n.as_str())))
            .map(|rule| rule.language)
    }

    async fn is_binary_file(&self, path: &Path) -> bool {
        if let Some(probe) = self.locator.locate(&self.table.mime_probe) {
            let output = tokio::process::Command::new(probe)
                .arg("--brief")
                .arg("--mime-type")
                .arg(path)
                .output()
                .await;

            match output {
                Ok(output) if output.status.success() => {
                    let mime = String::from_utf8_lossy(&output.stdout);
                    return !mime.trim().starts_with("text/");
                }
                Ok(output) => tracing::debug!(status = %output.status, "mime probe failed"),
                Err(e) => tracing::debug!(error = %e, "mime probe failed"),
            }
        }

        dotted_extension(path).is_none_or(|ext| !self.table.text_extensions.contains(&ext))
    }
}

/// Returns the lowercase extension of `path`, with its leading dot.
fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Reads the shebang line of `path`, if any.
async fn read_shebang(path: &Path) -> Option<String> {
    let mut file = tokio::fs::File::open(path).await.ok()?;

    let mut buf = Vec::with_capacity(SHEBANG_PROBE_LEN);
    (&mut file)
        .take(SHEBANG_PROBE_LEN as u64)
        .read_to_end(&mut buf)
        .await
        .ok()?;

    if !buf.starts_with(b"#!") {
        return None;
    }

    let line = buf.split(|b| *b == b'\n').next().unwrap_or_default();
    Some(String::from_utf8_lossy(line).into_owned())
}
