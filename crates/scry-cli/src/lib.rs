//! Crate implementing the CLI commands.

mod cli;
mod detect;
mod request;
mod run;

pub use self::cli::{CliAction, CliOpts, InvalidInputVar};
pub use self::detect::{dump_to_kdl, evaluate_detect};
pub use self::request::{InputVar, RequestConfig, parse_request};
pub use self::run::evaluate_debug;
