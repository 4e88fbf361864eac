//! Authentication validator
//!
//! Checks a `USER` argument against the one login name the server accepts.

use crate::config::ServerConfig;
use crate::error::AuthError;

/// Performs basic input sanitation to check for malicious or malformed usernames.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty() && input.len() <= max_length && !input.contains(['\r', '\n', '\0'])
}

/// Validates that the given username is the configured credential.
pub fn validate_user(username: &str, config: &ServerConfig) -> Result<(), AuthError> {
    if !is_valid_input(username, config.max_command_length) {
        return Err(AuthError::MalformedInput("Invalid username format".into()));
    }

    if username == config.username {
        Ok(())
    } else {
        Err(AuthError::WrongUsername(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_configured_user() {
        let config = ServerConfig::default();
        assert!(validate_user("cs317", &config).is_ok());
    }

    #[test]
    fn username_is_case_sensitive() {
        let config = ServerConfig::default();
        assert!(matches!(
            validate_user("CS317", &config),
            Err(AuthError::WrongUsername(_))
        ));
    }

    #[test]
    fn rejects_control_characters() {
        let config = ServerConfig::default();
        assert!(matches!(
            validate_user("cs317\0", &config),
            Err(AuthError::MalformedInput(_))
        ));
    }
}
