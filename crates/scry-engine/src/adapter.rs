use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::emulator::ephemeral_port;
use crate::language::Language;
use crate::process::{DebugSession, ProcessOrchestrator, ProcessOutput};
use crate::toolchain::ToolLocator;

/// How an interpreted language is put under a debug adapter.
///
/// In `args`, `{port}` is replaced with a fresh local port and `{file}` with
/// the program to debug.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    /// Accepted interpreters, in order of preference.
    pub interpreters: Vec<String>,

    /// Adapter name reported in the summary.
    pub tool: String,

    /// Interpreter arguments.
    pub args: Vec<String>,

    /// Extension the program must have (e.g., `.jar`).
    pub required_extension: Option<String>,
}

impl AdapterSpec {
    fn new(interpreters: &[&str], tool: &str, args: &[&str]) -> Self {
        Self {
            interpreters: interpreters.iter().map(|s| (*s).to_owned()).collect(),
            tool: tool.to_owned(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
            required_extension: None,
        }
    }

    /// Returns the interpreter arguments debugging `file` on `port`.
    pub fn render_args(&self, file: &Path, port: u16) -> Vec<String> {
        let file = file.to_string_lossy();
        let port = port.to_string();

        self.args
            .iter()
            .map(|arg| arg.replace("{port}", &port).replace("{file}", &file))
            .collect()
    }
}

/// Debug adapters of interpreted languages.
#[derive(Debug, Clone)]
pub struct AdapterTable {
    adapters: HashMap<Language, AdapterSpec>,
}

impl AdapterTable {
    /// Returns the adapter for `language`.
    pub fn get(&self, language: Language) -> Option<&AdapterSpec> {
        self.adapters.get(&language)
    }

    /// Replaces the adapter for `language`.
    pub fn set(&mut self, language: Language, spec: AdapterSpec) {
        self.adapters.insert(language, spec);
    }
}

impl Default for AdapterTable {
    fn default() -> Self {
        let mut adapters = HashMap::new();

        adapters.insert(
            Language::Python,
            AdapterSpec::new(
                &["python3", "python"],
                "debugpy",
                &[
                    "-m",
                    "debugpy",
                    "--listen",
                    "127.0.0.1:{port}",
                    "--wait-for-client",
                    "{file}",
                ],
            ),
        );

        adapters.insert(
            Language::Node,
            AdapterSpec::new(&["node"], "node-inspect", &["--inspect-brk={port}", "{file}"]),
        );

        adapters.insert(
            Language::Java,
            AdapterSpec {
                required_extension: Some(".jar".to_owned()),
                ..AdapterSpec::new(
                    &["java"],
                    "jdb",
                    &[
                        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address={port}",
                        "-jar",
                        "{file}",
                    ],
                )
            },
        );

        Self { adapters }
    }
}

/// Outcome of an adapter session.
#[derive(Debug, Clone)]
pub struct AdapterRun {
    /// Adapter name.
    pub tool: String,

    /// Full command line.
    pub cmd: Vec<String>,

    /// Captured output.
    pub output: ProcessOutput,
}

/// Runs interpreted programs under their debug adapter.
pub struct InterpretedAdapterLauncher<'a, L> {
    table: &'a AdapterTable,
    locator: &'a L,
}

impl<'a, L: ToolLocator> InterpretedAdapterLauncher<'a, L> {
    /// Creates a launcher over the given adapters.
    pub const fn new(table: &'a AdapterTable, locator: &'a L) -> Self {
        Self { table, locator }
    }

    /// Runs `file` under the adapter of `language`, with the same time
    /// bound and kill discipline as native debuggers.
    pub async fn launch(
        &self,
        session: &mut DebugSession,
        language: Language,
        file: &Path,
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> crate::Result<AdapterRun> {
        let spec = self
            .table
            .get(language)
            .ok_or(crate::Error::AdapterUnimplemented(language))?;

        if let Some(ext) = &spec.required_extension {
            let matches = file
                .extension()
                .is_some_and(|e| format!(".{}", e.to_string_lossy()).eq_ignore_ascii_case(ext));

            if !matches {
                return Err(crate::Error::RunnableArchiveRequired(file.to_path_buf()));
            }
        }

        let (_, interpreter) = self.locator.locate_first(&spec.interpreters).ok_or_else(|| {
            crate::Error::ToolchainMissing {
                language,
                candidates: spec.interpreters.clone(),
            }
        })?;

        let port = ephemeral_port()?;

        let mut cmd = vec![interpreter.display().to_string()];
        cmd.extend(spec.render_args(file, port));

        tracing::debug!(tool = %spec.tool, port, "starting debug adapter");

        let output = ProcessOrchestrator::new(timeout)
            .run(session, &spec.tool, &cmd, env)
            .await?;

        Ok(AdapterRun {
            tool: spec.tool.clone(),
            cmd,
            output,
        })
    }
}
