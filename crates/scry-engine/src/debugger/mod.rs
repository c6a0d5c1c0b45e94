mod builder;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::Instrument;

pub use self::builder::Builder;
use crate::adapter::InterpretedAdapterLauncher;
use crate::arch::{ArchitectureDetector, ArchitectureInfo, HostInfo, archs_match};
use crate::compiler::{CompiledArtifact, SourceCompiler};
use crate::emulator::EmulatorBridge;
use crate::language::{Handling, Language, LanguageDetector};
use crate::process::{DebugSession, ProcessOrchestrator};
use crate::request::DebugRequest;
use crate::script::{DebugScript, RunMode, ScriptContext, ScriptGenerator};
use crate::selector::{Dialect, DebuggerSelector};
use crate::summary::{self, DebugOutput, SessionDetails};
use crate::tables::Tables;
use crate::toolchain::{SearchPath, ToolLocator, ToolchainVerifier};

/// Debugging-orchestration engine.
///
/// Each call to [debug](Self::debug) runs one request to completion, and
/// owns every file and process it creates.
pub struct Debugger<L = SearchPath> {
    tables: Tables,
    locator: L,
    host: HostInfo,
}

impl Debugger<SearchPath> {
    /// Creates a debugger builder.
    pub fn builder() -> Builder<SearchPath> {
        Builder::new()
    }

    /// Creates a debugger with the default tables, resolving executables on
    /// `PATH`.
    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for Debugger<SearchPath> {
    fn default() -> Self {
        Self::new()
    }
}

/// Files and processes of one request.
///
/// Fields are released in declaration order: the script file, then the
/// engine-built binary, then the debugger and emulator processes.
#[derive(Default)]
struct Resources {
    script: Option<DebugScript>,
    artifact: Option<CompiledArtifact>,
    session: DebugSession,
}

/// What a request would resolve to, without compiling or running anything.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Resolved language.
    pub language: Language,

    /// Toolchain executables accepted for the language, if none is
    /// installed.
    pub missing_toolchain: Option<Vec<String>>,

    /// Architecture of the target (pre-built binaries only).
    pub arch: Option<ArchitectureInfo>,

    /// Whether the target runs natively (pre-built binaries only).
    pub arch_ok: Option<bool>,

    /// Host description.
    pub host: HostInfo,

    /// Debugger or adapter that would be used, if resolvable.
    pub debugger: Option<String>,
}

impl<L: ToolLocator> Debugger<L> {
    /// Returns the lookup tables.
    pub const fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Returns the host description.
    pub const fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Debugs the target described by `request`.
    ///
    /// On success, the debugger output is returned along with its summary
    /// (also embedded in the returned stderr). Every file and process created
    /// for the request is released before returning, on every path.
    pub async fn debug(&self, request: DebugRequest) -> crate::Result<DebugOutput> {
        let span = tracing::info_span!("DebugRequest", file = %request.file.display());
        self.debug_inner(request).instrument(span).await
    }

    async fn debug_inner(&self, request: DebugRequest) -> crate::Result<DebugOutput> {
        if !matches!(tokio::fs::try_exists(&request.file).await, Ok(true)) {
            return Err(crate::Error::FileNotFound(request.file));
        }

        let language = LanguageDetector::new(&self.tables.languages, &self.locator)
            .detect(&request.file, request.language)
            .await;

        tracing::info!(%language, "language detected");

        let handling = language.handling();
        if handling == Handling::Unsupported {
            return Err(crate::Error::UnsupportedLanguage(language));
        }

        ToolchainVerifier::new(&self.tables.toolchains, &self.locator).verify(language)?;

        if handling == Handling::Interpreted {
            return self.debug_interpreted(language, &request).await;
        }

        let mut res = Resources::default();

        let artifact = if handling == Handling::Compiled {
            SourceCompiler::new(&self.tables.recipes, &self.locator, &self.host)
                .compile(&request.file, language)
                .await?
        } else {
            CompiledArtifact::prebuilt(&request.file)
        };
        let binary = res.artifact.insert(artifact).path().to_path_buf();

        let arch = ArchitectureDetector::new(&self.tables.arch, &self.locator)
            .detect(&binary)
            .await;
        let arch_ok = archs_match(&self.host.arch, &arch.token);

        let choice = DebuggerSelector::new(&self.tables.debuggers, &self.locator, &self.host)
            .select(language)?;

        tracing::info!(debugger = %choice.name, arch = %arch.token, arch_ok, "debugger selected");

        let mode = if arch_ok {
            RunMode::Local
        } else if !choice.dialect.supports_remote() {
            tracing::warn!(debugger = %choice.name, "no remote mode, running natively");
            RunMode::Local
        } else {
            let emulator = EmulatorBridge::new(&self.locator)
                .launch(&arch, &self.host, &binary, &request.input_vars)
                .await?;

            RunMode::Remote {
                port: res.session.emulator.insert(emulator).port(),
            }
        };

        let expressions = request.expression_list();
        let ctx = ScriptContext {
            binary: &binary,
            source: (handling == Handling::Compiled).then_some(request.file.as_path()),
            break_target: &request.break_target,
            expressions: &expressions,
            mode,
            arch: &arch.token,
            env: &request.input_vars,
        };

        let script = res.script.insert(
            ScriptGenerator::new(&self.tables.runtime_support).write(choice.dialect, &ctx)?,
        );

        let debugger_cmd = choice.invocation(script.path(), &binary, mode);
        let script = script.content().to_owned();

        // gdb and lldb scripts set the debuggee environment themselves
        let env = match choice.dialect {
            Dialect::Delve => request.input_vars.clone(),
            Dialect::Gdb | Dialect::Lldb => BTreeMap::new(),
        };

        let output = ProcessOrchestrator::new(request.timeout)
            .run(&mut res.session, &choice.name, &debugger_cmd, &env)
            .await?;

        summary::assemble(
            language,
            choice.name,
            SessionDetails::Native {
                debugger_cmd,
                script,
                binary,
                arch_detected: arch.token,
                host_arch: self.host.arch.clone(),
                arch_ok,
            },
            output,
        )
    }

    async fn debug_interpreted(
        &self,
        language: Language,
        request: &DebugRequest,
    ) -> crate::Result<DebugOutput> {
        let mut session = DebugSession::default();

        let run = InterpretedAdapterLauncher::new(&self.tables.adapters, &self.locator)
            .launch(
                &mut session,
                language,
                &request.file,
                &request.input_vars,
                request.timeout,
            )
            .await?;

        summary::assemble(
            language,
            run.tool,
            SessionDetails::Interpreted { cmd: run.cmd },
            run.output,
        )
    }

    /// Resolves what debugging `file` would involve.
    ///
    /// Sources are not compiled, so the architecture is only reported for
    /// pre-built binaries.
    pub async fn detect(
        &self,
        file: &Path,
        language: Option<Language>,
    ) -> crate::Result<Detection> {
        if !matches!(tokio::fs::try_exists(file).await, Ok(true)) {
            return Err(crate::Error::FileNotFound(file.to_path_buf()));
        }

        let language = LanguageDetector::new(&self.tables.languages, &self.locator)
            .detect(file, language)
            .await;

        let missing_toolchain = match ToolchainVerifier::new(&self.tables.toolchains, &self.locator)
            .verify(language)
        {
            Err(crate::Error::ToolchainMissing { candidates, .. }) => Some(candidates),
            _ => None,
        };

        let arch = match language.handling() {
            Handling::Prebuilt => Some(
                ArchitectureDetector::new(&self.tables.arch, &self.locator)
                    .detect(file)
                    .await,
            ),
            _ => None,
        };
        let arch_ok = arch.as_ref().map(|a| archs_match(&self.host.arch, &a.token));

        let debugger = match language.handling() {
            Handling::Compiled | Handling::Prebuilt => {
                DebuggerSelector::new(&self.tables.debuggers, &self.locator, &self.host)
                    .select(language)
                    .ok()
                    .map(|choice| choice.name)
            }
            Handling::Interpreted => self.tables.adapters.get(language).map(|a| a.tool.clone()),
            Handling::Unsupported => None,
        };

        Ok(Detection {
            language,
            missing_toolchain,
            arch,
            arch_ok,
            host: self.host.clone(),
            debugger,
        })
    }
}
