//! FTP Protocol implementation
//!
//! Handles FTP command parsing, dispatch and response generation.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::{handle_auth_command, handle_command};
