//! Error types for pinpad operations.

use pinpad_proto::{CodecError, ResponseKind};

use crate::transport::TransportError;

/// Alias for `Result<T, pinpad::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A request was issued while another one is still awaiting its response.
    #[error("a request is already in progress")]
    RequestInProgress,

    /// A response arrived for a kind nobody subscribed to.
    #[error("no subscriber registered for {0} responses")]
    NoSubscriber(ResponseKind),

    /// Connecting to or talking with the terminal failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded; nothing was sent.
    #[error(transparent)]
    Encode(#[from] CodecError),

    /// An I/O error while loading configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
