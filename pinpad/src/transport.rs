//! Byte-stream transport abstraction.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::ConnectionParams;

/// Classification of a communication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCause {
    /// Establishing the connection failed.
    Connect,
    /// Unclassified socket failure.
    General,
    /// Reading from the connection failed.
    Receive,
    /// Writing to the connection failed.
    Send,
    /// Inbound data could not be framed.
    Parse,
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::General => "socket",
            Self::Receive => "receive",
            Self::Send => "send",
            Self::Parse => "parse",
        })
    }
}

/// A classified transport failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{cause} error: {message}")]
#[non_exhaustive]
pub struct TransportError {
    /// What kind of operation failed.
    pub cause: ErrorCause,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Creates an error with the given cause.
    pub fn new(cause: ErrorCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    /// Shorthand for an [`ErrorCause::Connect`] error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(ErrorCause::Connect, message)
    }

    /// Shorthand for an [`ErrorCause::Send`] error.
    pub fn send(message: impl Into<String>) -> Self {
        Self::new(ErrorCause::Send, message)
    }

    /// Shorthand for an [`ErrorCause::Receive`] error.
    pub fn receive(message: impl Into<String>) -> Self {
        Self::new(ErrorCause::Receive, message)
    }
}

/// Something that happened on an open connection.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TransportEvent {
    /// Bytes arrived, in stream order.
    Data(Bytes),
    /// The connection failed asynchronously.
    Error(TransportError),
    /// The connection ended.
    Terminated(String),
}

/// Callback through which a transport reports [`TransportEvent`]s.
#[derive(Clone)]
pub struct EventSink(Arc<dyn Fn(TransportEvent) + Send + Sync>);

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

impl EventSink {
    /// Wraps a callback.
    pub fn new(f: impl Fn(TransportEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Reports an event.
    pub fn emit(&self, event: TransportEvent) {
        (self.0)(event);
    }
}

/// A duplex byte-stream connection to the terminal.
///
/// Events are emitted from the transport's own receive activity only.
/// `connect` and `send` report failure through their return value and must
/// not call into the [`EventSink`] on the caller's stack: the engine holds
/// its critical section across both calls.
pub trait Transport: Send + Sync {
    /// Opens a connection, replacing any existing one.
    fn connect(&self, params: &ConnectionParams, events: EventSink) -> Result<(), TransportError>;

    /// Closes the connection, if any. Emits no events.
    fn disconnect(&self);

    /// Writes `data` to the connection.
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Connection state as of the last read or write.
    fn is_connected(&self) -> bool;

    /// Actively checks the connection state.
    fn check_connect_state(&self) -> bool {
        self.is_connected()
    }
}
