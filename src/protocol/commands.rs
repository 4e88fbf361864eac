//! Module `command`
//!
//! Defines the FTP command parsing logic and the data structures used to
//! represent commands and their results.

use std::path::PathBuf;

use crate::protocol::responses::format_response;

/// Represents an FTP command parsed from the client input.
///
/// Verbs taking one argument carry `Some(arg)` only when exactly one
/// argument followed the verb; handlers decide how to reply otherwise.
/// Path arguments keep the client's raw bytes.
#[derive(Debug, PartialEq)]
pub enum Command {
    USER(Option<String>), // Username for login
    CWD(Option<PathBuf>), // Change working directory
    CDUP,
    PWD,
    TYPE(Option<String>), // A or I
    MODE(Option<String>), // Only S
    STRU(Option<String>), // Only F
    PASV,                  // Enter passive mode
    RETR(Option<PathBuf>), // Retrieve/download file
    NLST,
    QUIT,
    UNKNOWN, // Unknown, unsupported or malformed command
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(code: u16, text: &str) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(format_response(code, text)),
        }
    }

    /// `reason` goes to the server log; `code` and `text` go to the client.
    pub fn failure(reason: impl Into<String>, code: u16, text: &str) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(format_response(code, text)),
        }
    }
}

/// Parses a raw command line received from a client into the `Command` enum.
///
/// The verb is case-insensitive; arguments keep their case.
pub fn parse_command(raw: impl AsRef<[u8]>) -> Command {
    let mut parts = raw
        .as_ref()
        .split(|b| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty());
    let cmd = parts
        .next()
        .map(|verb| String::from_utf8_lossy(verb).to_ascii_uppercase())
        .unwrap_or_default();
    let args: Vec<&[u8]> = parts.collect();

    let single = match args.as_slice() {
        [arg] => Some(*arg),
        _ => None,
    };
    let text = || single.map(|arg| String::from_utf8_lossy(arg).into_owned());
    let path = || single.map(path_argument);
    let bare = args.is_empty();

    match cmd.as_str() {
        "USER" => Command::USER(text()),
        "CWD" => Command::CWD(path()),
        "TYPE" => Command::TYPE(text()),
        "MODE" => Command::MODE(text()),
        "STRU" => Command::STRU(text()),
        "RETR" => Command::RETR(path()),
        "CDUP" if bare => Command::CDUP,
        "PWD" if bare => Command::PWD,
        "PASV" if bare => Command::PASV,
        "NLST" if bare => Command::NLST,
        "QUIT" if bare => Command::QUIT,
        _ => Command::UNKNOWN,
    }
}

#[cfg(unix)]
fn path_argument(arg: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(arg))
}

#[cfg(not(unix))]
fn path_argument(arg: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(arg).into_owned())
}
