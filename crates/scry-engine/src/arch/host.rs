/// Machine the engine runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Lowercase machine name (`uname -m`).
    pub arch: String,

    /// Lowercase OS name (`uname -s`).
    pub os: String,
}

impl HostInfo {
    /// Returns whether the host runs macOS.
    pub fn is_darwin(&self) -> bool {
        self.os == "darwin"
    }
}

/// Probes the host machine.
#[cfg(unix)]
pub fn host_info() -> HostInfo {
    match nix::sys::utsname::uname() {
        Ok(uts) => HostInfo {
            arch: uts.machine().to_string_lossy().to_lowercase(),
            os: uts.sysname().to_string_lossy().to_lowercase(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "uname");
            fallback_host_info()
        }
    }
}

/// Probes the host machine.
#[cfg(not(unix))]
pub fn host_info() -> HostInfo {
    fallback_host_info()
}

fn fallback_host_info() -> HostInfo {
    HostInfo {
        arch: std::env::consts::ARCH.to_owned(),
        os: match std::env::consts::OS {
            "macos" => "darwin".to_owned(),
            os => os.to_owned(),
        },
    }
}
