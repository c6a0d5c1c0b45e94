use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use miette::IntoDiagnostic;
use scry_engine::{DebugRequest, Language};

/// Debugging request, as described in KDL.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct RequestConfig {
    /// Source file or binary to debug.
    #[knus(child, unwrap(argument))]
    pub file: String,

    /// Language override.
    #[knus(child, unwrap(argument))]
    pub language: Option<String>,

    /// Where to stop (line number or function symbol).
    #[knus(child, unwrap(argument))]
    pub break_at: Option<String>,

    /// Comma-separated expressions to inspect.
    #[knus(child, unwrap(argument))]
    pub expressions: Option<String>,

    /// Bound on the debugging session, in seconds.
    #[knus(child, unwrap(argument))]
    pub timeout: Option<u64>,

    /// Input values exposed to the debuggee.
    #[knus(children(name = "input"))]
    pub input_vars: Vec<InputVar>,
}

/// Named input value.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct InputVar {
    /// Variable name.
    #[knus(argument)]
    pub name: String,

    /// Variable value.
    #[knus(argument)]
    pub value: String,
}

impl RequestConfig {
    /// Converts the configuration into an engine request.
    pub fn into_request(self) -> miette::Result<DebugRequest> {
        let language = self
            .language
            .as_deref()
            .map(str::parse::<Language>)
            .transpose()
            .into_diagnostic()?;

        let mut request = DebugRequest::new(self.file).language(language);

        if let Some(target) = self.break_at {
            request = request.break_at(target);
        }

        if let Some(expressions) = self.expressions {
            request = request.expressions(expressions);
        }

        if let Some(secs) = self.timeout {
            request = request.timeout(Duration::from_secs(secs));
        }

        Ok(self
            .input_vars
            .into_iter()
            .fold(request, |request, var| request.input_var(var.name, var.value)))
    }
}

/// Parses a request given inline, or as a path to a `.kdl` file.
pub fn parse_request(request: String) -> miette::Result<RequestConfig> {
    let path = Path::new(&request);

    let config = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", &request)?
    };

    Ok(config)
}
