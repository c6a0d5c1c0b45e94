use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use scry_engine::arch::HostInfo;
use scry_engine::{Debugger, SearchPath};
use tempfile::TempDir;

/// `e_machine` of x86-64 binaries.
pub const EM_X86_64: u16 = 62;

/// `e_machine` of AArch64 binaries.
pub const EM_AARCH64: u16 = 183;

/// Temporary directory holding fake tools (`bin/`) and debug targets
/// (`work/`).
pub struct Sandbox {
    _dir: TempDir,
    bin: PathBuf,
    work: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("bin");
        let work = dir.path().join("work");

        std::fs::create_dir(&bin).expect("create bin");
        std::fs::create_dir(&work).expect("create work");

        // fake compilers copy this file to their output
        std::fs::write(bin.join("template.elf"), elf64_header(EM_X86_64)).expect("template");

        Self {
            _dir: dir,
            bin,
            work,
        }
    }

    /// Installs an executable shell script named `name` in `bin/`.
    pub fn tool(&self, name: &str, body: &str) -> &Self {
        let path = self.bin.join(name);

        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod tool");

        self
    }

    /// Installs a C-style compiler recording its arguments in `<name>.args`.
    pub fn compiler(&self, name: &str) -> &Self {
        self.tool(
            name,
            &format!(
                r#"here=$(dirname "$0")
printf '%s\n' "$@" > "$here/{name}.args"
while [ $# -gt 0 ]; do
  [ "$1" = "-o" ] && out="$2"
  shift
done
cp "$here/template.elf" "$out""#
            ),
        )
    }

    /// Installs a gdb printing its `-x` script, then `tail`.
    pub fn gdb(&self, name: &str, tail: &str) -> &Self {
        self.tool(name, &format!("cat \"$3\"\n{tail}"))
    }

    /// Writes a debug target in `work/`.
    pub fn target(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.work.join(name);
        std::fs::write(&path, content).expect("write target");
        path
    }

    /// Returns the content of a file written by a fake tool in `bin/`.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.bin.join(name)).expect("read tool output")
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Builds a debugger only seeing the fake tools, on an x86-64 Linux host.
    pub fn debugger(&self) -> Debugger<SearchPath> {
        Debugger::builder()
            .with_locator(SearchPath::in_dirs([&self.bin]))
            .with_host(HostInfo {
                arch: "x86_64".to_owned(),
                os: "linux".to_owned(),
            })
            .build()
    }
}

/// Builds a bare 64-bit little-endian ELF executable header.
pub fn elf64_header(machine: u16) -> Vec<u8> {
    let mut hdr = vec![0u8; 64];
    hdr[..4].copy_from_slice(b"\x7fELF");
    hdr[4] = 2;
    hdr[5] = 1;
    hdr[6] = 1;
    hdr[16..18].copy_from_slice(&2u16.to_le_bytes());
    hdr[18..20].copy_from_slice(&machine.to_le_bytes());
    hdr[20..24].copy_from_slice(&1u32.to_le_bytes());
    hdr[52..54].copy_from_slice(&64u16.to_le_bytes());
    hdr[54..56].copy_from_slice(&56u16.to_le_bytes());
    hdr[58..60].copy_from_slice(&64u16.to_le_bytes());
    hdr
}
