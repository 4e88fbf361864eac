//! Module `session`
//!
//! Defines the `Session` struct holding everything a control connection
//! remembers between commands: login status, working directory, transfer
//! type and whether a passive data channel has been requested.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Per-connection protocol state.
///
/// Only the control task mutates a `Session`; handlers receive it by
/// `&mut` and never hold it across a lock on the data channel.
#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    current_directory: PathBuf,
    client_addr: Option<SocketAddr>,
    advertised_ip: Ipv4Addr,
    is_logged_in: bool,
    transfer_is_binary: bool,
    passive_mode_active: bool,
}

impl Session {
    /// Creates a session rooted at `root`, which must already be canonical.
    pub fn new(root: PathBuf, advertised_ip: Ipv4Addr) -> Self {
        Self {
            current_directory: root.clone(),
            root,
            client_addr: None,
            advertised_ip,
            is_logged_in: false,
            transfer_is_binary: false,
            passive_mode_active: false,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    /// The directory sessions may never leave.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    /// Address placed in PASV replies.
    pub fn advertised_ip(&self) -> Ipv4Addr {
        self.advertised_ip
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// `TYPE I` was the last accepted TYPE command.
    pub fn is_binary(&self) -> bool {
        self.transfer_is_binary
    }

    pub fn is_passive_mode(&self) -> bool {
        self.passive_mode_active
    }

    /// Client address for log lines.
    pub fn peer(&self) -> String {
        self.client_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_current_directory(&mut self, path: PathBuf) {
        debug_assert!(path.starts_with(&self.root));
        self.current_directory = path;
    }

    pub fn set_client_addr(&mut self, addr: Option<SocketAddr>) {
        self.client_addr = addr;
    }

    /// There is no logout; this only ever moves the session forward.
    pub fn mark_logged_in(&mut self) {
        self.is_logged_in = true;
    }

    pub fn set_binary(&mut self, binary: bool) {
        self.transfer_is_binary = binary;
    }

    pub fn set_passive_mode(&mut self, active: bool) {
        self.passive_mode_active = active;
    }
}
