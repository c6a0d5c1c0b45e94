use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::arch::HostInfo;
use crate::language::Language;
use crate::toolchain::ToolLocator;

/// Extension given to binaries built by the engine, next to their source.
pub const ARTIFACT_EXTENSION: &str = "ctf";

/// Debug binary handed to the debugger.
///
/// If the engine built it, the file is removed when this value is dropped.
#[derive(Debug)]
pub struct CompiledArtifact {
    path: PathBuf,
    owned: bool,
    language: Language,
}

impl CompiledArtifact {
    /// Wraps a binary the engine didn't build (and must not delete).
    pub fn prebuilt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
            language: Language::Binary,
        }
    }

    pub(crate) fn owned(path: PathBuf, language: Language) -> Self {
        Self {
            path,
            owned: true,
            language,
        }
    }

    /// Returns the path of the binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether the engine built (and owns) the binary.
    pub const fn is_owned(&self) -> bool {
        self.owned
    }

    /// Returns the language the binary was built from.
    pub const fn language(&self) -> Language {
        self.language
    }
}

impl Drop for CompiledArtifact {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "remove artifact"),
        }
    }
}

/// Build recipe of a compiled language.
#[derive(Debug, Clone)]
pub struct BuildRecipe {
    /// Accepted compiler front-ends, in order of preference.
    pub compilers: Vec<String>,

    /// Compiler arguments; `{src}` and `{out}` are substituted.
    pub args: Vec<String>,

    /// Whether the target platform must be pinned to the host's
    /// (`GOARCH`/`GOOS`).
    pub pin_host_target: bool,
}

impl BuildRecipe {
    fn new(compilers: &[&str], args: &[&str]) -> Self {
        Self {
            compilers: compilers.iter().map(|s| (*s).to_owned()).collect(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
            pin_host_target: false,
        }
    }

    /// Returns the arguments for building `src` into `out`.
    pub fn render_args(&self, src: &Path, out: &Path) -> Vec<String> {
        let src = src.to_string_lossy();
        let out = out.to_string_lossy();

        self.args
            .iter()
            .map(|arg| arg.replace("{src}", &src).replace("{out}", &out))
            .collect()
    }
}

/// Build recipes of every compiled language.
#[derive(Debug, Clone)]
pub struct RecipeTable {
    recipes: HashMap<Language, BuildRecipe>,
}

impl RecipeTable {
    /// Returns the recipe for `language`.
    pub fn get(&self, language: Language) -> Option<&BuildRecipe> {
        self.recipes.get(&language)
    }

    /// Replaces the recipe for `language`.
    pub fn set(&mut self, language: Language, recipe: BuildRecipe) {
        self.recipes.insert(language, recipe);
    }
}

impl Default for RecipeTable {
    fn default() -> Self {
        let mut recipes = HashMap::new();

        recipes.insert(
            Language::C,
            BuildRecipe::new(
                &["gcc", "clang"],
                &[
                    "-g",
                    "-O0",
                    "-fno-stack-protector",
                    "-no-pie",
                    "-z",
                    "execstack",
                    "{src}",
                    "-o",
                    "{out}",
                ],
            ),
        );

        recipes.insert(
            Language::Cpp,
            BuildRecipe::new(
                &["g++", "clang++"],
                &[
                    "-g",
                    "-O0",
                    "-std=c++17",
                    "-fno-stack-protector",
                    "-no-pie",
                    "-z",
                    "execstack",
                    "{src}",
                    "-o",
                    "{out}",
                ],
            ),
        );

        recipes.insert(
            Language::Rust,
            BuildRecipe::new(
                &["rustc"],
                &[
                    "-C",
                    "debuginfo=2",
                    "-C",
                    "opt-level=0",
                    "{src}",
                    "-o",
                    "{out}",
                ],
            ),
        );

        recipes.insert(
            Language::Go,
            BuildRecipe {
                pin_host_target: true,
                ..BuildRecipe::new(
                    &["go"],
                    &["build", "-gcflags", "all=-N -l", "-o", "{out}", "{src}"],
                )
            },
        );

        recipes.insert(
            Language::Zig,
            BuildRecipe::new(
                &["zig"],
                &[
                    "build-exe",
                    "{src}",
                    "-O",
                    "Debug",
                    "-fno-stack-protector",
                    "-lc",
                    "-femit-bin={out}",
                ],
            ),
        );

        Self { recipes }
    }
}

/// Builds debug binaries with mitigations disabled.
pub struct SourceCompiler<'a, L> {
    recipes: &'a RecipeTable,
    locator: &'a L,
    host: &'a HostInfo,
}

impl<'a, L: ToolLocator> SourceCompiler<'a, L> {
    /// Creates a compiler over the given recipes.
    pub const fn new(recipes: &'a RecipeTable, locator: &'a L, host: &'a HostInfo) -> Self {
        Self {
            recipes,
            locator,
            host,
        }
    }

    /// Compiles `source` into `<stem>.ctf`, next to it.
    #[tracing::instrument(name = "Compile", skip_all, fields(lang = %language, src = %source.display()))]
    pub async fn compile(&self, source: &Path, language: Language) -> crate::Result<CompiledArtifact> {
        let recipe = self
            .recipes
            .get(language)
            .ok_or(crate::Error::UnsupportedLanguage(language))?;

        let (compiler_name, compiler) = self.locator.locate_first(&recipe.compilers).ok_or_else(|| {
            crate::Error::ToolchainMissing {
                language,
                candidates: recipe.compilers.clone(),
            }
        })?;

        // guard created first, so that partial outputs are removed as well
        let artifact = CompiledArtifact::owned(artifact_path(source), language);

        let mut command = tokio::process::Command::new(&compiler);
        command.args(recipe.render_args(source, artifact.path()));

        if recipe.pin_host_target {
            command.envs(self.host_target_env(&compiler).await);
        }

        tracing::info!(compiler = compiler_name, "compiling");

        let output = command.output().await.map_err(|e| crate::Error::Spawn {
            program: compiler.display().to_string(),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = if output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                String::from_utf8_lossy(&output.stderr).into_owned()
            };

            return Err(crate::Error::CompilationFailed { language, stderr });
        }

        tracing::debug!(out = %artifact.path().display(), "compiled");

        Ok(artifact)
    }

    /// Returns `GOARCH`/`GOOS` matching the host, so that the produced
    /// binary runs natively.
    async fn host_target_env(&self, go: &Path) -> Vec<(&'static str, String)> {
        let Some(goarch) = host_to_goarch(&self.host.arch) else {
            return Vec::new();
        };

        let goos = match tokio::process::Command::new(go)
            .args(["env", "GOOS"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_owned())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "go env GOOS");
                None
            }
        }
        .filter(|goos| !goos.is_empty())
        .unwrap_or_else(|| self.host.os.clone());

        vec![("GOARCH", goarch.to_owned()), ("GOOS", goos)]
    }
}

/// Returns where the binary built from `source` goes.
///
/// Never the source itself: `exploit.ctf` builds into `exploit.ctf.ctf`.
fn artifact_path(source: &Path) -> PathBuf {
    let path = source.with_extension(ARTIFACT_EXTENSION);
    if path != source {
        return path;
    }

    let mut name = source.as_os_str().to_owned();
    name.push(".");
    name.push(ARTIFACT_EXTENSION);
    PathBuf::from(name)
}

/// Maps a host machine name to Go's `GOARCH`.
fn host_to_goarch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" | "amd64" => Some("amd64"),
        "aarch64" | "arm64" => Some("arm64"),
        "armv7l" | "armv7" => Some("arm"),
        "i386" | "i686" => Some("386"),
        _ => None,
    }
}
