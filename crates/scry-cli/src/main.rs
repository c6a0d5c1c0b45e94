#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use std::path::PathBuf;
use std::time::Duration;

use scry_cli::{CliAction, CliOpts};
use scry_engine::{DebugRequest, Language};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::builder().with_env_var("SCRY_LOG").from_env_lossy())
        .init();

    let res = match cli.action {
        CliAction::Debug {
            break_at,
            expressions,
            input_vars,
            language,
            timeout,
            file,
        } => scry_cli::evaluate_debug(build_request(
            file,
            break_at,
            expressions,
            input_vars,
            language,
            timeout,
        ))
        .map(Some),
        CliAction::Request { request } => scry_cli::parse_request(request)
            .and_then(scry_cli::RequestConfig::into_request)
            .and_then(scry_cli::evaluate_debug)
            .map(Some),
        CliAction::Detect { language, file } => {
            scry_cli::evaluate_detect(file, language, std::io::stdout()).map(|_| None)
        }
    };

    match res {
        Ok(Some(exit_code)) => std::process::exit(exit_code),
        Ok(None) => (),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}

fn build_request(
    file: PathBuf,
    break_at: Option<String>,
    expressions: Option<String>,
    input_vars: Vec<(String, String)>,
    language: Option<Language>,
    timeout: Option<u64>,
) -> DebugRequest {
    let mut request = DebugRequest::new(file).language(language);

    if let Some(target) = break_at {
        request = request.break_at(target);
    }

    if let Some(expressions) = expressions {
        request = request.expressions(expressions);
    }

    if let Some(secs) = timeout {
        request = request.timeout(Duration::from_secs(secs));
    }

    input_vars
        .into_iter()
        .fold(request, |request, (name, value)| request.input_var(name, value))
}
