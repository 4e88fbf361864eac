//! FTP Response handling
//!
//! Reply codes and the exact reply texts clients see.

pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const USER_REJECTED: u16 = 331;
pub const CANT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const LOCAL_ERROR: u16 = 451;
pub const SYNTAX_ERROR: u16 = 500;
pub const BAD_PARAMETER: u16 = 504;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_UNAVAILABLE: u16 = 550;

pub const MSG_CONNECTED: &str = "connected.";
pub const MSG_GOODBYE: &str = "Goodbye.";
pub const MSG_LOGIN_OK: &str = "login successful.";
pub const MSG_WRONG_USER: &str = "Wrong username.";
pub const MSG_GUEST_ONLY: &str = "cannot change from guest user.";
pub const MSG_LOGIN_REQUIRED: &str = "Please login with USER.";
pub const MSG_UNKNOWN: &str = "unknown command.";
pub const MSG_TOO_LONG: &str = "Command too long.";
pub const MSG_TOO_MANY: &str = "Too many connections. Try again later.";
pub const MSG_DIR_CHANGED: &str = "Directory successfully changed.";
pub const MSG_DIR_NO_ACCESS: &str = "No access to directory.";
pub const MSG_DIR_FAILED: &str = "Failed to change directory.";
pub const MSG_ASCII: &str = "Switching to ASCII mode.";
pub const MSG_BINARY: &str = "Switching to Binary mode.";
pub const MSG_BAD_TYPE: &str = "Unrecognised TYPE command.";
pub const MSG_MODE_S: &str = "Mode set to S.";
pub const MSG_BAD_MODE: &str = "Bad MODE command.";
pub const MSG_STRU_F: &str = "Structure set to F.";
pub const MSG_BAD_STRU: &str = "Bad STRU command.";
pub const MSG_USE_PASV: &str = "Use PASV first.";
pub const MSG_NO_DATA_CONN: &str = "Failed to establish connection.";
pub const MSG_CANT_OPEN_DATA: &str = "Can't open data connection.";
pub const MSG_OPEN_FAILED: &str = "Failed to open file.";
pub const MSG_FILE_SENT: &str = "File transfer success.";
pub const MSG_ABORTED: &str = "Connection closed; transfer aborted.";
pub const MSG_LISTING: &str = "Here comes the directory listing.";
pub const MSG_LISTING_SENT: &str = "Directory send OK.";
pub const MSG_LISTING_FAILED: &str = "Error reading directory from disk.";

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\n", code, message)
}
