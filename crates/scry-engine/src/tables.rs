use std::path::PathBuf;

use crate::adapter::AdapterTable;
use crate::arch::ArchTable;
use crate::compiler::RecipeTable;
use crate::language::LanguageTable;
use crate::selector::DebuggerTable;
use crate::toolchain::ToolchainTable;

/// Lookup tables driving every stage of a request.
///
/// The defaults describe the supported languages, toolchains and debuggers.
/// Any table may be replaced before building a [Debugger](crate::Debugger).
#[derive(Debug, Clone)]
pub struct Tables {
    /// Extension, shebang and text-extension tables.
    pub languages: LanguageTable,

    /// Executables required per language.
    pub toolchains: ToolchainTable,

    /// Build recipes of compiled languages.
    pub recipes: RecipeTable,

    /// Architecture probe table.
    pub arch: ArchTable,

    /// Debugger candidates per language family.
    pub debuggers: DebuggerTable,

    /// Debug adapters of interpreted languages.
    pub adapters: AdapterTable,

    /// Debugger support scripts sourced when present (Go runtime helpers).
    pub runtime_support: Vec<PathBuf>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            languages: LanguageTable::default(),
            toolchains: ToolchainTable::default(),
            recipes: RecipeTable::default(),
            arch: ArchTable::default(),
            debuggers: DebuggerTable::default(),
            adapters: AdapterTable::default(),
            runtime_support: vec![PathBuf::from("/usr/local/go/src/runtime/runtime-gdb.py")],
        }
    }
}
