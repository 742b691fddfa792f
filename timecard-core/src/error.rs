//! Error taxonomy shared by the gateway and its tool surface.

use thiserror::Error;

/// Upper bound on backend-derived error text. Anything longer is cut so a
/// misbehaving backend cannot flood tool callers with internal detail.
pub const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Access denied: {0}")]
    AuthorizationDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Ambiguous name '{name}': matched {candidates:?}. Use a more specific name or an id.")]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing prerequisite: {0}")]
    PrerequisiteMissing(String),

    #[error("Write rate limit reached for {domain}. Try again later.")]
    RateLimited { domain: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        status: Option<u16>,
    },
}

impl Error {
    /// Backend failure with a bounded, human-readable message.
    pub fn backend(message: impl Into<String>, status: Option<u16>) -> Self {
        let message = message.into();
        let message = if message.chars().count() > MAX_MESSAGE_LEN {
            let mut cut: String = message.chars().take(MAX_MESSAGE_LEN).collect();
            cut.push_str("...");
            cut
        } else {
            message
        };
        Error::Backend {
            message,
            status: status.filter(|s| *s >= 100),
        }
    }
}
