//! File system storage
//!
//! Resolves retrievable files and produces directory listings.

pub mod operations;

pub use operations::{list_entries, prepare_file_retrieval};
