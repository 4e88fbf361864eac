//! Transfer module for FTP server
//!
//! Handles the passive data channel and file transfers over it.

pub mod data_channel;
pub mod file_ops;
pub mod operations;

pub use data_channel::{ChannelStatus, DataChannel};
pub use file_ops::send_file;
pub use operations::{bind_passive_listener, pasv_tuple};
