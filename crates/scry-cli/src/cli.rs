use std::path::PathBuf;

use scry_engine::Language;

/// The Scry debugging driver.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Command to debug a source file or a binary.
    Debug {
        /// Where to stop (line number or function symbol).
        #[clap(short, long = "break", value_name = "TARGET")]
        break_at: Option<String>,

        /// Comma-separated expressions to inspect once stopped.
        #[clap(short, long = "expr", value_name = "EXPRS")]
        expressions: Option<String>,

        /// Input value exposed to the debuggee as an environment variable.
        #[clap(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_input_var)]
        input_vars: Vec<(String, String)>,

        /// Language override, bypassing detection.
        #[clap(short, long = "lang", value_name = "LANG")]
        language: Option<Language>,

        /// Bound on the debugging session, in seconds.
        #[clap(short, long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Source file or binary to debug.
        file: PathBuf,
    },

    /// Command to run a debugging request described in KDL.
    Request {
        /// Debugging request (KDL format).
        ///
        /// If it ends with `.kdl`, it is treated as a path to a request file.
        /// Otherwise it is directly parsed as inline KDL-formatted request.
        #[clap(short, long, value_name = "CONTENT/PATH")]
        request: String,
    },

    /// Command to report what debugging a file would involve, without
    /// compiling or running anything.
    Detect {
        /// Language override, bypassing detection.
        #[clap(short, long = "lang", value_name = "LANG")]
        language: Option<Language>,

        /// Source file or binary to inspect.
        file: PathBuf,
    },
}

/// Input value argument without a `=` separator.
#[derive(Debug, thiserror::Error)]
#[error("invalid KEY=VALUE: no `=` found in `{0}`")]
pub struct InvalidInputVar(String);

fn parse_input_var(s: &str) -> Result<(String, String), InvalidInputVar> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| InvalidInputVar(s.to_owned()))
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}
