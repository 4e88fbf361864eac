//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    WrongUsername(String),
    MalformedInput(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::WrongUsername(u) => write!(f, "Wrong username: {}", u),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}

/// Navigate module errors
#[derive(Debug)]
pub enum NavigateError {
    /// The request would leave the server root, or starts with `./` or `..`.
    NoAccess(String),
    DirectoryNotFound(String),
    NotADirectory(String),
}

impl fmt::Display for NavigateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigateError::NoAccess(p) => write!(f, "No access to directory: {}", p),
            NavigateError::DirectoryNotFound(p) => write!(f, "Directory not found: {}", p),
            NavigateError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
        }
    }
}

impl std::error::Error for NavigateError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    FileNotFound(String),
    NotAFile(String),
    OutsideRoot(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::NotAFile(p) => write!(f, "Not a regular file: {}", p),
            StorageError::OutsideRoot(p) => write!(f, "Path outside server root: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Transfer module errors
#[derive(Debug)]
pub enum TransferError {
    DataChannelNotInitialized,
    PortBindingFailed(SocketAddr, io::Error),
    NoAvailablePort(usize),
    ListenerConfigurationFailed(io::Error),
    ConnectionTimeout(Duration),
    AcceptorExited,
    TransferFailed(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::DataChannelNotInitialized => write!(f, "Data channel not initialized"),
            TransferError::PortBindingFailed(addr, e) => {
                write!(f, "Failed to bind to {}: {}", addr, e)
            }
            TransferError::NoAvailablePort(attempts) => {
                write!(f, "No free data port found after {} attempts", attempts)
            }
            TransferError::ListenerConfigurationFailed(e) => {
                write!(f, "Failed to configure listener: {}", e)
            }
            TransferError::ConnectionTimeout(waited) => {
                write!(f, "No data connection within {:?}", waited)
            }
            TransferError::AcceptorExited => {
                write!(f, "Acceptor stopped before a data connection was made")
            }
            TransferError::TransferFailed(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

/// Errors that stop the server from starting
#[derive(Debug)]
pub enum FtpServerError {
    Config(config::ConfigError),
    IoError(io::Error),
}

impl fmt::Display for FtpServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpServerError::Config(e) => write!(f, "Configuration error: {}", e),
            FtpServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FtpServerError {}

impl From<config::ConfigError> for FtpServerError {
    fn from(error: config::ConfigError) -> Self {
        FtpServerError::Config(error)
    }
}

impl From<io::Error> for FtpServerError {
    fn from(error: io::Error) -> Self {
        FtpServerError::IoError(error)
    }
}
