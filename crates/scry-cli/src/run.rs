use std::io::Write;

use miette::IntoDiagnostic;
use scry_engine::{DebugRequest, Debugger};

/// Runs the subcommand for debugging a file.
///
/// The debugger stdout and stderr (with its embedded summary) are forwarded
/// to ours. Returns the exit code of the command.
pub fn evaluate_debug(request: DebugRequest) -> miette::Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let output = runtime.block_on(async move {
        let debugger = Debugger::new();
        debugger.debug(request).await.into_diagnostic()
    })?;

    let exit_code = if output.summary.success { 0 } else { 1 };

    let (stdout, stderr) = output.into_parts();

    std::io::stdout()
        .write_all(stdout.as_bytes())
        .into_diagnostic()?;
    std::io::stderr()
        .write_all(stderr.as_bytes())
        .into_diagnostic()?;

    Ok(exit_code)
}
