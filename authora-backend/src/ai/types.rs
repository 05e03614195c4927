use std::fmt;

/// Error returned by a language model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiError {
    pub message: String,
    /// HTTP status when the provider answered with an error status
    pub status_code: Option<u16>,
}

impl AiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (status {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AiError {}

impl From<String> for AiError {
    fn from(message: String) -> Self {
        AiError::new(message)
    }
}

impl From<&str> for AiError {
    fn from(message: &str) -> Self {
        AiError::new(message)
    }
}
