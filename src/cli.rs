//! Command-line interface.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host specs to connect to at startup.
    pub hosts: Vec<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Transcript file to append session logs to from startup.
    pub log_output: Option<PathBuf>,
    /// Start with verbose tracing enabled.
    pub debug: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Short('o') | Long("log-output") => {
                result.log_output = Some(parser.value()?.parse()?);
            }
            Short('d') | Long("debug") => {
                result.debug = true;
            }
            Value(val) => {
                result.hosts.push(val.to_string_lossy().into());
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"multish {version}
Broadcast one terminal's commands to a group of shell sessions

USAGE:
    multish [OPTIONS] [HOST]...

ARGS:
    [HOST]...               Sessions to open at startup; `localhost`
                            spawns a local shell, anything else is
                            passed to `ssh`

OPTIONS:
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -o, --log-output <FILE> Append a session transcript to FILE
    -d, --debug             Enable verbose tracing at startup
    -h, --help              Print help
    -V, --version           Print version

At the prompt, lines starting with `:` are control commands (`:help`
lists them), `!` runs a command locally, `#` is a comment, and
everything else is broadcast to all active sessions.

EXAMPLES:
    # One local shell
    multish localhost

    # A mixed group, with a transcript
    multish -o session.log localhost web1 web2
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("multish {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
