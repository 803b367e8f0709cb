//! ContactLink error types

use thiserror::Error;

/// ContactLink error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an observation the resolver cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A secondary points at a contact that is not a live primary
    #[error("Integrity error: contact {contact_id} links to {linked_id}, which is not a primary contact")]
    Integrity { contact_id: u64, linked_id: u64 },

    /// Exact (email, phone) pair already stored
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML render error
    #[error("TOML render error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Whether a retry of the whole resolution may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for ContactLink operations
pub type Result<T> = std::result::Result<T, Error>;
