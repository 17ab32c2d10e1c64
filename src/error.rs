//! Error types for the GTN API client.
//!
//! Login flows never surface these past their boundary: signing and
//! transport errors are folded into an [`AuthStatus`](crate::models::AuthStatus).
//! Only caller mistakes ([`Error::AlreadyInitialized`], [`Error::UnknownSession`])
//! and failures of plain API calls reach the caller as `Err`.

use thiserror::Error;

/// A specialized `Result` type for GTN client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all GTN client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The private key could not be decoded or the assertion could not be signed
    #[error("Signing error: {0}")]
    Signing(String),

    /// The transport could not produce an HTTP status (connect, timeout, I/O)
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error raised by reqwest
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but rejected the credentials
    #[error("Authentication failed: status={status}, description={description}")]
    AuthFailure {
        /// HTTP status code returned by the server
        status: u16,
        /// Server-reported description, or the raw body
        description: String,
    },

    /// `init()` or `login_user()` was called on an already initialised client
    #[error("Already initialised; init() can be called only once per session")]
    AlreadyInitialized,

    /// The customer number has no session in the registry
    #[error("No valid token available for customer {0}; call init_customer() first")]
    UnknownSession(String),

    /// No active server session is available
    #[error("Session is not active")]
    NotActive,

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The server refused to open a stream
    #[error("Stream request failed: status={status}, description={description}")]
    StreamRejected {
        /// HTTP status code returned by the server
        status: u16,
        /// Server-reported description, or the raw body
        description: String,
    },

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Stream was disconnected unexpectedly
    #[error("Stream disconnected")]
    StreamDisconnected,

    /// Channel send error (internal)
    #[error("Internal channel error")]
    ChannelError,
}

impl Error {
    /// Returns `true` if no HTTP status was obtained (network, timeout, I/O).
    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::Transport(_) | Error::WebSocket(_) | Error::StreamDisconnected => true,
            Error::Http(e) => e.status().is_none(),
            _ => false,
        }
    }

    /// Returns `true` if the server rejected the credentials or no session exists.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::AuthFailure { .. } | Error::Signing(_) | Error::NotActive
        )
    }

    /// Returns `true` for programmer errors that retrying cannot fix.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::AlreadyInitialized
                | Error::UnknownSession(_)
                | Error::InvalidInput(_)
                | Error::Config(_)
        )
    }
}

/// Human-readable description of an error body: its `message` or
/// `description` field, else the trimmed body.
pub(crate) fn describe_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("description"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(feature = "streaming")]
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(err.to_string())
    }
}
