//! Client management system
//!
//! Handles client connections, session state and the command loop.

pub mod handler;
pub mod state;

pub use handler::handle_client;
pub use state::Session;
