//! Error types for the splitbook record store, server and client.

use crate::validation::ValidationError;

/// Boxed error source carried by storage and seed failures.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// All errors that can occur when using splitbook.
#[derive(Debug, thiserror::Error)]
pub enum SplitbookError {
    /// The durable medium could not be read, written, or held malformed data.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(BoxError),

    /// The seed source could not be read during a reset.
    #[error("seed unavailable: {0}")]
    SeedUnavailable(BoxError),

    /// A request body failed shape validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport failed before a response was received.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP server could not bind or stopped with an I/O failure.
    #[cfg(feature = "server")]
    #[error("server error: {0}")]
    Server(std::io::Error),

    /// The server answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
}

impl SplitbookError {
    /// Collapses any error into a single message suitable for showing to
    /// an end user.
    ///
    /// Transport and status failures all read as a request failure; the
    /// detailed kind is still available on the error itself.
    #[inline]
    #[must_use]
    pub fn user_message(&self) -> String {
        match *self {
            Self::Validation(ref err) => err.to_string(),
            Self::Api { status, .. } => format!("Request failed: HTTP error! status: {status}"),
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::Http(_) => "Request failed: the server could not be reached".to_owned(),
            #[cfg(feature = "server")]
            Self::Server(_) => "The server stopped unexpectedly".to_owned(),
            Self::StorageUnavailable(_) | Self::SeedUnavailable(_) | Self::Serialization(_) => {
                "An error occurred".to_owned()
            }
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SplitbookError>;
