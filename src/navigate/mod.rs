//! Navigate module
//!
//! Handles directory navigation operations for FTP clients,
//! keeping every working directory inside the server root.

mod operations;

pub use operations::{change_directory, parent_directory};
