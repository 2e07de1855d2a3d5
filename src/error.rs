//! SDK error types

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the SDK
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors surfaced by SDK operations.
///
/// Every variant renders the original failure detail in its message, so
/// callers that only log `to_string()` still see what the remote side said.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The backend reported an error for the call
    #[error("{message}")]
    Remote { message: String },

    /// A non-success HTTP status without a recognizable error body
    #[error("Request failed with status code {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response was not shaped as expected (e.g. not an array)
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// A row could not be decoded into its typed model
    #[error("Failed to decode {entity}: {source}")]
    Decode {
        entity: &'static str,
        source: serde_json::Error,
    },

    /// The operation needs a signed-in user
    #[error("No user is signed in")]
    NotSignedIn,

    /// The invitation token was rejected by the backend
    #[error("Access token is expired or invalid")]
    InvalidInvitation,

    /// A caller-supplied argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid SDK configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error wrapped with the name of the failed operation
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<SdkError>,
    },
}

impl SdkError {
    /// Create a remote error from a message
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a decode error for the given entity name
    pub fn decode(entity: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { entity, source }
    }

    /// Wrap this error with the name of the failed operation
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping `Context` wrappers
    pub fn root(&self) -> &SdkError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach operation context to a `Result`
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}

/// Decode a JSON value into a typed model
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    entity: &'static str,
    value: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|e| SdkError::decode(entity, e))
}

/// Decode a list of JSON rows into typed models
pub(crate) fn decode_rows<T: serde::de::DeserializeOwned>(
    entity: &'static str,
    rows: Vec<serde_json::Value>,
) -> Result<Vec<T>> {
    rows.into_iter().map(|row| decode(entity, row)).collect()
}
