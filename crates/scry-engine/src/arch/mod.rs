mod detect;
mod host;
mod matcher;

pub use self::detect::{ArchitectureDetector, describe_header};
pub use self::host::{HostInfo, host_info};
pub use self::matcher::archs_match;

/// Architecture of a debug target, as understood by the debugger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitectureInfo {
    /// Debugger architecture token (e.g., `i386:x86-64`), empty if unknown.
    pub token: String,

    /// User-mode emulator able to run the target, if one is known.
    pub emulator: Option<String>,
}

impl ArchitectureInfo {
    fn new(token: &str, emulator: Option<&str>) -> Self {
        Self {
            token: token.to_owned(),
            emulator: emulator.map(str::to_owned),
        }
    }

    /// Returns whether nothing was recognized.
    pub fn is_unknown(&self) -> bool {
        self.token.is_empty()
    }
}

/// Entry of the architecture probe table.
#[derive(Debug, Clone)]
pub struct ArchProbe {
    /// Lowercase substring looked up in the file-format descriptor.
    pub probe: String,

    /// Architecture reported on match.
    pub info: ArchitectureInfo,
}

/// Lookup data driving architecture detection.
#[derive(Debug, Clone)]
pub struct ArchTable {
    /// Probes, tried in order.
    pub probes: Vec<ArchProbe>,

    /// Program answering `--brief <path>` with a file-format descriptor.
    pub descriptor_probe: String,
}

impl Default for ArchTable {
    fn default() -> Self {
        let probes = [
            ("x86-64", "i386:x86-64", None),
            ("x86_64", "i386:x86-64", None),
            ("intel 80386", "i386", None),
            ("i386", "i386", None),
            ("aarch64", "aarch64", Some("qemu-aarch64")),
            ("arm64", "aarch64", Some("qemu-aarch64")),
            ("arm", "arm", Some("qemu-arm")),
            ("mips", "mips", Some("qemu-mips")),
        ];

        Self {
            probes: probes
                .into_iter()
                .map(|(probe, token, emulator)| ArchProbe {
                    probe: probe.to_owned(),
                    info: ArchitectureInfo::new(token, emulator),
                })
                .collect(),
            descriptor_probe: "file".to_owned(),
        }
    }
}

impl ArchTable {
    /// Matches a file-format descriptor against the probe table, then
    /// against coarse ELF/Mach-O heuristics.
    pub fn classify(&self, descriptor: &str) -> ArchitectureInfo {
        let desc = descriptor.to_lowercase();

        if let Some(probe) = self.probes.iter().find(|p| desc.contains(p.probe.as_str())) {
            return probe.info.clone();
        }

        if desc.contains("elf 64-bit") || desc.contains("mach-o 64-bit") {
            if desc.contains("arm") || desc.contains("aarch64") || desc.contains("arm64") {
                return ArchitectureInfo::new("aarch64", Some("qemu-aarch64"));
            }
            return ArchitectureInfo::new("i386:x86-64", None);
        }

        if desc.contains("elf 32-bit") {
            return ArchitectureInfo::new("i386", None);
        }

        ArchitectureInfo::default()
    }
}
