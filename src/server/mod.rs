//! Server core functionality
//!
//! Binds the control socket and runs one session task per client.

pub mod core;

pub use self::core::Server;
