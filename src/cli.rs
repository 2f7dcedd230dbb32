//! Command-line interface for profview.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments.
///
/// Options left unset fall through to the environment, the config file and
/// finally the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Directory profiles are served from.
    pub profiles: Option<PathBuf>,
    /// Inactivity window after which a session is unloaded.
    pub valid: Option<Duration>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
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
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('P') | Long("profiles") => {
                result.profiles = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("valid") => {
                let value: String = parser.value()?.parse()?;
                result.valid = Some(
                    parse_duration(&value).ok_or(ArgsError::InvalidValue("valid", value))?,
                );
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Parse a duration such as `90`, `45s`, `30m`, `2h` or `1h30m`.
///
/// A bare number is read as seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return (secs > 0).then(|| Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let amount: u64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
        digits.clear();
    }

    if !digits.is_empty() || total == 0 {
        return None;
    }
    Some(Duration::from_secs(total))
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"profview {version}
Serve captured profiles in per-session web viewers

USAGE:
    profview [OPTIONS]

OPTIONS:
    -H, --host <ADDR>        Host address to bind [default: 0.0.0.0]
    -p, --port <PORT>        Port to listen on [default: 8080]
    -P, --profiles <DIR>     Directory containing the profiles [default: .]
    -t, --valid <DURATION>   Unload a profile after this long without activity
                             (e.g. 90, 45s, 30m, 1h30m) [default: 30m]
    -c, --config <FILE>      Path to configuration file (JSON)
    -l, --log-level <LVL>    Log level (error, warn, info, debug, trace)
    -h, --help               Print help
    -V, --version            Print version

ENVIRONMENT VARIABLES:
    PROFVIEW_HOST            Host address (overrides config)
    PROFVIEW_PORT            Port number (overrides config)
    PROFVIEW_PROFILES        Profiles directory (overrides config)
    PROFVIEW_SESSION_TTL     Session lifetime in seconds (overrides config)
    PROFVIEW_LOG_LEVEL       Log level (overrides config)
    RUST_LOG                 Alternative log level setting

EXAMPLES:
    # Serve profiles from the current directory on 0.0.0.0:8080
    profview

    # Serve a profiles directory on localhost with a short session lifetime
    profview -H 127.0.0.1 -P /var/lib/profiles --valid 5m

    # Then open http://localhost:8080/?profile=cpu.pb.gz
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("profview {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
