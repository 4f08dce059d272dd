//! Error types for the file-transfer client.

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures that end a run early.
///
/// Error text relayed by the server is not one of these; it is an ordinary
/// [`Outcome`](crate::client::Outcome).
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad or missing arguments
    #[error("{0}")]
    Usage(String),

    /// The control connection could not be established
    #[error("Client could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server hung up before the exchange was finished
    #[error("Server closed the connection before {0}")]
    ConnectionClosed(&'static str),

    /// Socket or filesystem failure after connecting
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Usage(_) => 2,
            ClientError::Connect { .. } | ClientError::ConnectionClosed(_) | ClientError::Io(_) => 1,
        }
    }
}
