// Error types and fatal reporting

use std::fmt;

use colored::Colorize;

#[derive(Debug)]
pub enum Error {
    UnknownCommand(String),
    Launch(String, std::io::Error),
    SessionNotFound(String),
    SessionExists(String),
    RecordNotFound(String),
    RecordExists(String),
    RecordType(String),
    RecordParse(String, String),
    WrongKind {
        label: String,
        expected: &'static str,
        actual: &'static str,
    },
    Generator(String),
    GeneratorExists(String),
    TeamNotFound(String),
    ConfigParse(String),
    Migration(String),
    Backend(String),
    Prompt(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownCommand(name) => write!(f, "Unknown command: '{}'", name),
            Error::Launch(name, e) => write!(f, "Could not launch '{}': {}", name, e),
            Error::SessionNotFound(label) => {
                write!(f, "Session '{}' is not configured", label)
            }
            Error::SessionExists(label) => {
                write!(f, "Session '{}' is already configured", label)
            }
            Error::RecordNotFound(label) => write!(f, "Record '{}' does not exist", label),
            Error::RecordExists(label) => write!(f, "Record '{}' already exists", label),
            Error::RecordType(name) => write!(f, "Unresolvable record type '{}'", name),
            Error::RecordParse(label, msg) => {
                write!(f, "Record '{}' is unreadable: {}", label, msg)
            }
            Error::WrongKind {
                label,
                expected,
                actual,
            } => write!(
                f,
                "Record '{}' has type '{}', not '{}'",
                label, actual, expected
            ),
            Error::Generator(name) => write!(f, "Unresolvable generator '{}'", name),
            Error::GeneratorExists(name) => {
                write!(f, "Generator '{}' is already configured", name)
            }
            Error::TeamNotFound(team) => write!(
                f,
                "Team '{}' does not exist (pass --create-team to create it)",
                team
            ),
            Error::ConfigParse(msg) => write!(f, "Config parse error: {}", msg),
            Error::Migration(msg) => write!(f, "Legacy config migration failed: {}", msg),
            Error::Backend(msg) => write!(f, "Backend failure: {}", msg),
            Error::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Launch(_, e) | Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Uppercase the first character of a message for the fatal line.
pub fn capitalize(msg: &str) -> String {
    let mut chars = msg.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Report a terminal failure exactly once on stderr.
///
/// `debug` is pre-scanned from argv so this works even when the failure
/// happened before option parsing produced a result.
pub fn report_fatal(err: &Error, debug: bool) {
    if debug {
        eprintln!("{:?}", err);
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            eprintln!("caused by: {}", cause);
            source = cause.source();
        }
    }
    eprintln!("{} {}.", "Fatal:".red().bold(), capitalize(&err.to_string()));
}
