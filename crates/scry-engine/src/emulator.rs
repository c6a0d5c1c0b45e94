use std::collections::BTreeMap;
use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;
use std::time::Duration;

use crate::arch::{ArchitectureInfo, HostInfo};
use crate::process::ChildHandle;
use crate::toolchain::ToolLocator;

/// Time given to the emulator to open its remote-debug stub.
const WARM_UP: Duration = Duration::from_millis(300);

/// Time given to the emulator to exit on its own once the debugger is done.
const STOP_GRACE: Duration = Duration::from_millis(200);

/// Returns a local TCP port that was free a moment ago.
///
/// The port is released before the emulator binds it, so another process
/// may grab it in between. Such a race surfaces as a debugger connection
/// failure in the session output.
pub fn ephemeral_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Runs foreign-architecture binaries under a user-mode emulator.
pub struct EmulatorBridge<'a, L> {
    locator: &'a L,
}

impl<'a, L: ToolLocator> EmulatorBridge<'a, L> {
    /// Creates a bridge resolving emulators with `locator`.
    pub const fn new(locator: &'a L) -> Self {
        Self { locator }
    }

    /// Starts `binary` under the emulator of `arch`, stopped on its first
    /// instruction and waiting for a debugger on a local port.
    #[tracing::instrument(name = "Emulate", skip_all, fields(arch = %arch.token))]
    pub async fn launch(
        &self,
        arch: &ArchitectureInfo,
        host: &HostInfo,
        binary: &Path,
        env: &BTreeMap<String, String>,
    ) -> crate::Result<EmulatorProcess> {
        let unbridgeable = || crate::Error::ArchMismatchUnbridgeable {
            arch: arch.token.clone(),
            host: host.arch.clone(),
            emulator: arch.emulator.clone(),
        };

        let program = arch.emulator.as_deref().ok_or_else(unbridgeable)?;
        let path = self.locator.locate(program).ok_or_else(unbridgeable)?;

        let port = ephemeral_port()?;

        let mut args = vec!["-g".to_owned(), port.to_string()];
        for (key, value) in env {
            args.push("-E".to_owned());
            args.push(format!("{key}={value}"));
        }
        args.push(binary.display().to_string());

        let handle = ChildHandle::spawn(program, &path, &args, &BTreeMap::new())?;

        tracing::info!(program, port, "emulator started");

        tokio::time::sleep(WARM_UP).await;

        Ok(EmulatorProcess {
            program: program.to_owned(),
            port,
            handle,
        })
    }
}

/// Emulator running a debuggee behind a remote-debug stub.
///
/// The emulator is killed when this value is dropped.
pub struct EmulatorProcess {
    program: String,
    port: u16,
    handle: ChildHandle,
}

impl EmulatorProcess {
    /// Returns the port of the remote-debug stub.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the emulator program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Stops the emulator and returns its stderr.
    pub async fn stop(&mut self) -> String {
        if let Err(e) = self.handle.wait(STOP_GRACE).await {
            tracing::debug!(error = %e, "emulator wait");
            self.handle.kill();
        }

        self.handle.take_output().await.1
    }
}
