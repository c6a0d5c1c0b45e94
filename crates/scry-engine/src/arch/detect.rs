use std::path::Path;

use goblin::elf::Elf;
use goblin::elf::header::{ELFMAG, EM_386, EM_AARCH64, EM_ARM, EM_MIPS, EM_X86_64};
use goblin::mach::Mach;
use goblin::mach::cputype::{CPU_TYPE_ARM, CPU_TYPE_ARM64, CPU_TYPE_X86, CPU_TYPE_X86_64};

use super::{ArchTable, ArchitectureInfo};
use crate::toolchain::ToolLocator;

/// Inspects a binary and reports its [ArchitectureInfo].
pub struct ArchitectureDetector<'a, L> {
    table: &'a ArchTable,
    locator: &'a L,
}

impl<'a, L: ToolLocator> ArchitectureDetector<'a, L> {
    /// Creates a detector over the given table.
    pub const fn new(table: &'a ArchTable, locator: &'a L) -> Self {
        Self { table, locator }
    }

    /// Detects the architecture of the binary at `path`.
    ///
    /// The descriptor text comes from the `file` utility when installed, or
    /// is synthesized from the binary header otherwise. An empty token is
    /// returned if nothing is recognized.
    pub async fn detect(&self, path: &Path) -> ArchitectureInfo {
        let descriptor = match self.describe_with_probe(path).await {
            Some(desc) => Some(desc),
            None => tokio::fs::read(path)
                .await
                .inspect_err(|e| tracing::debug!(error = %e, "read binary header"))
                .ok()
                .and_then(|bytes| describe_header(&bytes)),
        };

        let info = descriptor
            .map(|desc| self.table.classify(&desc))
            .unwrap_or_default();

        tracing::debug!(token = %info.token, emulator = ?info.emulator, "architecture detected");

        info
    }

    async fn describe_with_probe(&self, path: &Path) -> Option<String> {
        let probe = self.locator.locate(&self.table.descriptor_probe)?;

        let output = tokio::process::Command::new(probe)
            .arg("--brief")
            .arg(path)
            .output()
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "descriptor probe"))
            .ok()?;

        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Synthesizes a `file`-like descriptor from an ELF or Mach-O header.
pub fn describe_header(bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(ELFMAG) {
        let elf = Elf::parse(bytes).ok()?;

        let machine = match elf.header.e_machine {
            EM_X86_64 => "x86-64",
            EM_386 => "Intel 80386",
            EM_AARCH64 => "ARM aarch64",
            EM_ARM => "ARM",
            EM_MIPS => "MIPS",
            _ => "unknown arch",
        };

        return Some(format!(
            "ELF {}-bit {} executable, {machine}",
            if elf.is_64 { 64 } else { 32 },
            if elf.little_endian { "LSB" } else { "MSB" },
        ));
    }

    let Mach::Binary(macho) = Mach::parse(bytes).ok()? else {
        return None;
    };

    let cpu = match macho.header.cputype {
        CPU_TYPE_X86_64 => "x86_64",
        CPU_TYPE_X86 => "i386",
        CPU_TYPE_ARM64 => "arm64",
        CPU_TYPE_ARM => "arm",
        _ => "unknown arch",
    };

    Some(format!(
        "Mach-O {}-bit executable {cpu}",
        if macho.is_64 { 64 } else { 32 },
    ))
}
