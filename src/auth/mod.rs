//! Authentication system
//!
//! A single fixed credential, checked on `USER`.

pub mod validator;

pub use validator::validate_user;
