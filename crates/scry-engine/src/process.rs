use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::emulator::EmulatorProcess;

/// Time left to stream readers once their process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Output of a child process collected in the background.
struct CapturedStream {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl CapturedStream {
    fn spawn(mut reader: impl AsyncRead + Unpin + Send + 'static) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let buf = Arc::clone(&buf);
            async move {
                let mut chunk = [0u8; 4096];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::debug!(error = %e, "stream read");
                            break;
                        }
                    }
                }
            }
        });

        Self { buf, task }
    }

    /// Waits (at most `grace`) for the stream to end and returns what was
    /// read so far.
    async fn finish(self, grace: Duration) -> String {
        let Self { buf, task } = self;

        let abort = task.abort_handle();
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::debug!("stream still open, keeping partial output");
            abort.abort();
        }

        let bytes = buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` if killed by a signal.
    pub exit_code: Option<i32>,

    /// Whether the process was killed for exceeding its time bound.
    pub timed_out: bool,
}

impl ExitOutcome {
    /// Returns whether the process exited cleanly in time.
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0)) && !self.timed_out
    }
}

/// Child process spawned in its own process group.
///
/// The whole group is killed when the handle is dropped while the child is
/// still running.
pub struct ChildHandle {
    name: String,
    pid: Option<u32>,
    child: Child,
    stdout: Option<CapturedStream>,
    stderr: Option<CapturedStream>,
}

impl ChildHandle {
    /// Spawns `program` with piped standard streams.
    ///
    /// Standard input is closed right away, so that an interactive front-end
    /// sees end-of-file once its script is exhausted.
    pub fn spawn(
        name: impl Into<String>,
        program: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> crate::Result<Self> {
        let name = name.into();

        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = Command::from(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| crate::Error::Spawn {
                program: program.display().to_string(),
                source: e,
            })?;

        drop(child.stdin.take());

        let pid = child.id();
        tracing::debug!(%name, ?pid, "process spawned");

        Ok(Self {
            stdout: child.stdout.take().map(CapturedStream::spawn),
            stderr: child.stderr.take().map(CapturedStream::spawn),
            name,
            pid,
            child,
        })
    }

    /// Returns the display name of the process.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the OS identifier of the process, if it wasn't reaped yet.
    pub const fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Waits for the process to exit, killing it after `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> crate::Result<ExitOutcome> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(ExitOutcome {
                exit_code: status?.code(),
                timed_out: false,
            }),
            Err(_) => {
                tracing::warn!(name = %self.name, ?timeout, "timed out, killing process");
                self.kill();
                let status = self.child.wait().await?;
                Ok(ExitOutcome {
                    exit_code: status.code(),
                    timed_out: true,
                })
            }
        }
    }

    /// Returns whether the process already exited.
    pub fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    /// Collects everything the process wrote to stdout and stderr.
    pub async fn take_output(&mut self) -> (String, String) {
        let stdout = match self.stdout.take() {
            Some(stream) => stream.finish(DRAIN_GRACE).await,
            None => String::new(),
        };

        let stderr = match self.stderr.take() {
            Some(stream) => stream.finish(DRAIN_GRACE).await,
            None => String::new(),
        };

        (stdout, stderr)
    }

    /// Forcibly terminates the process and its group.
    pub fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) => tracing::debug!(name = %self.name, pid, "process group killed"),
                Err(Errno::ESRCH) => (),
                Err(e) => tracing::error!(error = %e, name = %self.name, pid, "killpg"),
            }
        }

        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, name = %self.name, "kill");
        }
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        if !self.has_exited() {
            self.kill();
        }
    }
}

/// Live child processes of one request.
///
/// Dropping the session terminates the debugger, then the emulator.
#[derive(Default)]
pub struct DebugSession {
    /// Debugger (or debug adapter) process.
    pub debugger: Option<ChildHandle>,

    /// Emulator process, when bridging architectures.
    pub emulator: Option<EmulatorProcess>,
}

/// Captured output of a debugging session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Debugger standard output.
    pub stdout: String,

    /// Debugger standard error, followed by the emulator's.
    pub stderr: String,

    /// How the debugger ended.
    pub exit_code: Option<i32>,

    /// Whether the debugger was killed for exceeding its time bound.
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Returns whether the debugger exited cleanly in time.
    pub const fn success(&self) -> bool {
        ExitOutcome {
            exit_code: self.exit_code,
            timed_out: self.timed_out,
        }
        .success()
    }
}

/// Runs a debugger to completion under a time bound.
pub struct ProcessOrchestrator {
    timeout: Duration,
}

impl ProcessOrchestrator {
    /// Creates an orchestrator bounding sessions to `timeout`.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Spawns the debugger command line `cmd` into `session` and runs it.
    ///
    /// The emulator of the session (if any) is stopped afterwards and its
    /// stderr is appended to the debugger's.
    pub async fn run(
        &self,
        session: &mut DebugSession,
        name: &str,
        cmd: &[String],
        env: &BTreeMap<String, String>,
    ) -> crate::Result<ProcessOutput> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(crate::Error::Spawn {
                program: name.to_owned(),
                source: std::io::ErrorKind::InvalidInput.into(),
            });
        };

        tracing::info!(cmd = ?cmd, "launching debugger");

        let debugger = session
            .debugger
            .insert(ChildHandle::spawn(name, Path::new(program), args, env)?);

        let outcome = debugger.wait(self.timeout).await?;
        let (stdout, mut stderr) = debugger.take_output().await;

        if let Some(emulator) = session.emulator.as_mut() {
            let emulator_stderr = emulator.stop().await;

            if !emulator_stderr.is_empty() {
                stderr.push_str(&format!(
                    "\n--- {} stderr ---\n{emulator_stderr}",
                    emulator.program()
                ));
            }
        }

        tracing::info!(
            exit_code = ?outcome.exit_code,
            timed_out = outcome.timed_out,
            "debugger finished"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
        })
    }
}
