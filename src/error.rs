//! Error taxonomy shared by the extraction, provider, and configuration layers.
//!
//! Every failure is terminal for the single operation that raised it; nothing
//! in this crate retries. Callers decide how a failure is surfaced: the
//! [`App`](crate::app::App) controller turns extraction and configuration
//! errors into notifications and provider errors into an apology turn.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The file type is outside the supported set (pdf, docx, txt, md).
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A supported file type could not be decoded.
    #[error("{format} extraction failed: {message}")]
    Extraction {
        format: &'static str,
        message: String,
    },

    /// A configuration save was rejected; nothing was mutated.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// The provider replied, but not in the shape its contract promises.
    #[error("unexpected {provider} response: {message}")]
    ResponseFormat {
        provider: &'static str,
        message: String,
    },

    /// Network failure or a non-2xx HTTP status. Carries the response body
    /// when one was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A provider call was attempted without valid credentials.
    #[error("provider not configured")]
    NotConfigured,

    /// The identifier is already present in the document store.
    #[error("document already loaded: {0}")]
    DuplicateDocument(String),

    /// The local key-value store could not be written.
    #[error("local storage error: {0}")]
    Storage(String),
}

impl Error {
    pub(crate) fn extraction(format: &'static str, message: impl ToString) -> Self {
        Error::Extraction {
            format,
            message: message.to_string(),
        }
    }

    pub(crate) fn response_format(provider: &'static str, message: impl Into<String>) -> Self {
        Error::ResponseFormat {
            provider,
            message: message.into(),
        }
    }
}
