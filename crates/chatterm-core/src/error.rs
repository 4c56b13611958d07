//! Error taxonomy for the session lifecycle

use thiserror::Error;

/// Failure surfaced by a chat command
///
/// The `Display` output is the inline text shown to the user.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No base URL for the assistant endpoint was configured
    #[error("API base URL not configured. Please set {} environment variable.", crate::config::API_BASE_ENV)]
    Configuration,

    /// Session creation failed; calling start again may succeed
    #[error("Failed to start session: {0}")]
    SessionCreation(String),

    /// A message round-trip failed; the session stays usable
    #[error("Failed to send message: {0}")]
    MessageSend(String),
}

impl ChatError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration)
    }
}

/// Failure at the HTTP boundary
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed with status {0}")]
    Status(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("response did not contain a session identifier")]
    MissingSessionId,

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation_message_wraps_cause() {
        let err = ChatError::SessionCreation("Failed to create session: 500".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to start session: Failed to create session: 500"
        );
    }

    #[test]
    fn test_configuration_message_names_variable() {
        assert!(ChatError::Configuration
            .to_string()
            .contains("CHATTERM_API_BASE"));
    }
}
