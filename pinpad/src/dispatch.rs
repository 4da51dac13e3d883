//! Routing of decoded responses to subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use pinpad_proto::{Response, ResponseKind, ResponseVariant};
use tracing::trace;

use crate::error::{Error, Result};
use crate::schedule::Scheduler;
use crate::transport::ErrorCause;

/// Type-erased response callback.
type Handler = Arc<dyn Fn(Response) + Send + Sync>;

/// Callback for [`SocketEvent`]s.
pub(crate) type SocketHandler = Arc<dyn Fn(&SocketEvent) + Send + Sync>;

/// Connection-level notification, independent of response decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SocketEvent {
    /// Text written to the terminal.
    Sent(String),
    /// A complete frame payload read from the terminal, before decoding.
    Received(String),
    /// A communication failure.
    Failed {
        /// Failure classification.
        cause: ErrorCause,
        /// Human-readable detail.
        message: String,
    },
    /// The connection ended.
    Terminated(String),
}

/// One callback slot per response kind.
#[derive(Default)]
pub(crate) struct Dispatcher {
    /// Response callbacks.
    handlers: HashMap<ResponseKind, Handler>,
    /// Socket-level callback.
    socket: Option<SocketHandler>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .field("socket", &self.socket.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Installs the callback for `T`, replacing any previous one.
    pub(crate) fn subscribe<T, F>(&mut self, f: F)
    where
        T: ResponseVariant,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |response| {
            if let Some(r) = T::from_response(response) {
                f(r);
            }
        });
        self.handlers.insert(T::KIND, handler);
    }

    /// Removes the callback for `kind`.
    pub(crate) fn unsubscribe(&mut self, kind: ResponseKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    /// Whether `kind` has a callback.
    pub(crate) fn is_subscribed(&self, kind: ResponseKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Installs the socket-level callback.
    pub(crate) fn set_socket_handler(&mut self, handler: Option<SocketHandler>) {
        self.socket = handler;
    }

    /// The socket-level callback, if any.
    pub(crate) fn socket_handler(&self) -> Option<SocketHandler> {
        self.socket.clone()
    }

    /// Binds `response` to its subscriber.
    pub(crate) fn resolve(&self, response: Response) -> Result<Delivery> {
        let kind = response.kind();
        let handler = self
            .handlers
            .get(&kind)
            .cloned()
            .ok_or(Error::NoSubscriber(kind))?;
        Ok(Delivery { handler, response })
    }
}

/// A response bound to its subscriber, ready to run.
pub(crate) struct Delivery {
    /// Subscriber.
    handler: Handler,
    /// Response to hand over.
    response: Response,
}

impl Delivery {
    /// Runs the callback on `via` when given, else on the calling thread.
    pub(crate) fn run(self, via: Option<&Arc<dyn Scheduler>>) {
        let Self { handler, response } = self;
        trace!(kind = %response.kind(), posted = via.is_some(), "delivering response");
        match via {
            Some(scheduler) => scheduler.post(Box::new(move || handler(response))),
            None => handler(response),
        }
    }
}

/// Chooses where a delivery runs.
///
/// Posts to `captured` only when marshaling is enabled and the calling
/// thread is not already that context.
pub(crate) fn route(
    enabled: bool,
    captured: Option<&Arc<dyn Scheduler>>,
) -> Option<Arc<dyn Scheduler>> {
    captured
        .filter(|s| enabled && !s.is_current())
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use pinpad_proto::{DisplayResponse, StatusResponse, TransactionResponse};

    use super::*;
    use crate::schedule::EventLoop;

    #[test]
    fn delivers_to_matching_subscriber() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut d = Dispatcher::default();
        d.subscribe(move |r: StatusResponse| sink.lock().unwrap().push(r.terminal_id));

        let resp = StatusResponse {
            terminal_id: "T1".into(),
            ..StatusResponse::default()
        };
        d.resolve(resp.into()).unwrap().run(None);

        assert_eq!(*seen.lock().unwrap(), vec!["T1".to_owned()]);
    }

    #[test]
    fn missing_subscriber_is_an_error() {
        let d = Dispatcher::default();
        let err = d
            .resolve(TransactionResponse::default().into())
            .err()
            .unwrap();
        assert!(matches!(err, Error::NoSubscriber(ResponseKind::Transaction)));
    }

    #[test]
    fn later_subscription_replaces_earlier() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::default();
        let first = Arc::clone(&seen);
        d.subscribe(move |_: DisplayResponse| first.lock().unwrap().push("first"));
        let second = Arc::clone(&seen);
        d.subscribe(move |_: DisplayResponse| second.lock().unwrap().push("second"));

        d.resolve(DisplayResponse::default().into()).unwrap().run(None);
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);

        assert!(d.unsubscribe(ResponseKind::Display));
        assert!(!d.is_subscribed(ResponseKind::Display));
    }

    #[test]
    fn route_posts_only_from_foreign_threads() {
        let (_event_loop, handle) = EventLoop::new();
        let captured: Arc<dyn Scheduler> = Arc::new(handle);

        assert!(route(true, Some(&captured)).is_none());
        assert!(route(true, None).is_none());

        let remote = Arc::clone(&captured);
        thread::spawn(move || {
            assert!(route(true, Some(&remote)).is_some());
            assert!(route(false, Some(&remote)).is_none());
        })
        .join()
        .unwrap();
    }
}
