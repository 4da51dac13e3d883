//! Request/response correlation over a single terminal connection.
//!
//! The [`Engine`] allows one request in flight at a time. Inbound bytes are
//! framed and decoded under the same lock that guards the in-flight state,
//! and the resulting callbacks run only after that lock is released, so
//! subscribers may call back into the engine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use pinpad_proto::{
    Codec, Framer, JsonCodec, RECEIPT_ACK, Request, Response, ResponseKind, ResponseVariant,
    SetDialogRequest,
};
use tracing::{debug, error, info, warn};

use crate::config::{ConnectionParams, EngineConfig};
use crate::dialog::DialogHandler;
use crate::dispatch::{Dispatcher, SocketEvent, route};
use crate::error::{Error, Result};
use crate::schedule::Scheduler;
use crate::tcp::TcpTransport;
use crate::transport::{ErrorCause, EventSink, Transport, TransportEvent};

/// Client for one PIN-pad terminal.
///
/// Cheap to clone; clones share the connection and all state.
///
/// # Example
///
/// ```no_run
/// use pinpad::{ConnectionParams, Engine, TransactionRequest, TransactionResponse};
///
/// let engine = Engine::builder()
///     .params(ConnectionParams::new("192.168.1.50", 2011))
///     .build();
/// engine.subscribe(|r: TransactionResponse| println!("approved: {}", r.success));
/// engine.do_transaction(TransactionRequest {
///     amt_purchase: 1250,
///     ..TransactionRequest::default()
/// })?;
/// # Ok::<(), pinpad::Error>(())
/// ```
#[derive(Clone)]
pub struct Engine {
    /// Shared state.
    inner: Arc<Inner>,
}

/// Non-owning reference to an [`Engine`].
#[derive(Clone)]
pub struct WeakEngine(Weak<Inner>);

impl WeakEngine {
    /// The engine, if it is still alive.
    pub fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(|inner| Engine { inner })
    }
}

impl fmt::Debug for WeakEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakEngine").finish()
    }
}

/// Engine internals.
struct Inner {
    /// Timing and delivery settings.
    config: EngineConfig,
    /// Runtime toggle for scheduler delivery.
    use_scheduler: AtomicBool,
    /// Parameters for the next connect.
    params: Mutex<ConnectionParams>,
    /// Byte-stream connection.
    transport: Box<dyn Transport>,
    /// Message translation.
    codec: Box<dyn Codec>,
    /// In-flight request state; the engine-wide critical section.
    state: Mutex<State>,
    /// Subscribers.
    dispatcher: RwLock<Dispatcher>,
    /// Scheduler snapshotted by each request.
    scheduler: RwLock<Option<Arc<dyn Scheduler>>>,
    /// Dialog-closing collaborator.
    dialog: RwLock<Option<Arc<dyn DialogHandler>>>,
    /// Raised when the terminal acknowledges a dialog change.
    dialog_ack: Signal,
}

/// State guarded by the engine lock.
struct State {
    /// Receive buffer.
    framer: Framer,
    /// Last request issued.
    pending: Option<Request>,
    /// Last request that started a transaction.
    txn: Option<Request>,
    /// A request was sent and its response has not been handled.
    in_progress: bool,
    /// Scheduler captured when `pending` was issued.
    captured: Option<Arc<dyn Scheduler>>,
}

impl State {
    /// Forgets everything tied to the current connection.
    fn reset(&mut self) {
        self.framer.clear();
        self.pending = None;
        self.txn = None;
        self.in_progress = false;
    }
}

/// Work produced under the lock and performed after releasing it.
enum Effect {
    /// Notify the socket-level subscriber.
    Socket(SocketEvent),
    /// Hand a response to its subscriber, optionally via a scheduler.
    Deliver(Response, Option<Arc<dyn Scheduler>>),
    /// Wake a pending [`Engine::do_hide_dialogs`].
    DialogAck,
    /// Close the transaction dialog.
    CloseDialog,
}

/// Builder for an [`Engine`].
///
/// Defaults: [`TcpTransport`], [`JsonCodec`], default [`ConnectionParams`]
/// and [`EngineConfig`], no scheduler, no dialog handler.
#[must_use = "an EngineBuilder does nothing until .build() is called"]
#[derive(Default)]
pub struct EngineBuilder {
    /// Connection parameters.
    params: ConnectionParams,
    /// Engine configuration.
    config: EngineConfig,
    /// Transport override.
    transport: Option<Box<dyn Transport>>,
    /// Codec override.
    codec: Option<Box<dyn Codec>>,
    /// Delivery scheduler.
    scheduler: Option<Arc<dyn Scheduler>>,
    /// Dialog handler.
    dialog: Option<Arc<dyn DialogHandler>>,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("params", &self.params)
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_codec", &self.codec.is_some())
            .field("scheduler", &self.scheduler.is_some())
            .field("dialog", &self.dialog.is_some())
            .finish()
    }
}

impl EngineBuilder {
    /// Sets the connection parameters.
    pub fn params(mut self, params: ConnectionParams) -> Self {
        self.params = params;
        self
    }

    /// Replaces the whole engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the idle gap after which a partial frame is dropped (default: 5 s).
    pub fn stale_after(mut self, d: Duration) -> Self {
        self.config.stale_after = d;
        self
    }

    /// Sets how long [`Engine::do_hide_dialogs`] waits (default: 2 s).
    pub fn hide_dialogs_timeout(mut self, d: Duration) -> Self {
        self.config.hide_dialogs_timeout = d;
        self
    }

    /// Enables or disables scheduler delivery (default: enabled).
    pub fn use_scheduler_for_events(mut self, enable: bool) -> Self {
        self.config.use_scheduler_for_events = enable;
        self
    }

    /// Uses a custom transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Uses a custom codec.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Delivers responses through `scheduler`.
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Installs a dialog handler.
    pub fn dialog_handler(mut self, handler: Arc<dyn DialogHandler>) -> Self {
        self.dialog = Some(handler);
        self
    }

    /// Builds the engine. No connection is opened until first use.
    pub fn build(self) -> Engine {
        let engine = Engine {
            inner: Arc::new(Inner {
                use_scheduler: AtomicBool::new(self.config.use_scheduler_for_events),
                params: Mutex::new(self.params),
                transport: self
                    .transport
                    .unwrap_or_else(|| Box::new(TcpTransport::new())),
                codec: self.codec.unwrap_or_else(|| Box::new(JsonCodec::new())),
                state: Mutex::new(State {
                    framer: Framer::with_stale_after(self.config.stale_after),
                    pending: None,
                    txn: None,
                    in_progress: false,
                    captured: None,
                }),
                dispatcher: RwLock::new(Dispatcher::default()),
                scheduler: RwLock::new(self.scheduler),
                dialog: RwLock::new(None),
                dialog_ack: Signal::default(),
                config: self.config,
            }),
        };
        if let Some(handler) = self.dialog {
            engine.set_dialog_handler(handler);
        }
        engine
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("params", &self.params())
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .field("in_progress", &self.is_request_in_progress())
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Engine {
    /// Returns a builder with default settings.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// A non-owning handle to this engine.
    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    /// Parameters used by the next connect.
    pub fn params(&self) -> ConnectionParams {
        lock(&self.inner.params).clone()
    }

    /// Replaces the connection parameters. Takes effect on the next connect.
    pub fn set_params(&self, params: ConnectionParams) {
        *lock(&self.inner.params) = params;
    }

    /// Opens a connection to the terminal.
    ///
    /// Any request in flight on a previous connection is abandoned.
    pub fn connect(&self) -> Result<()> {
        let result = {
            let mut state = self.state();
            self.connect_locked(&mut state)
        };
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    /// Closes the connection and abandons any request in flight.
    pub fn disconnect(&self) {
        self.inner.transport.disconnect();
        self.state().reset();
    }

    /// Connection state as of the last read or write.
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Actively checks the connection state.
    pub fn check_connect_state(&self) -> bool {
        self.inner.transport.check_connect_state()
    }

    /// Whether a request is awaiting its response.
    pub fn is_request_in_progress(&self) -> bool {
        self.state().in_progress
    }

    /// Abandons the request in flight so a new one can be issued.
    pub fn clear_request_in_progress(&self) {
        self.state().in_progress = false;
    }

    /// The most recently issued request.
    pub fn pending_request(&self) -> Option<Request> {
        self.state().pending.clone()
    }

    /// Sets the scheduler captured by subsequent requests.
    pub fn set_scheduler(&self, scheduler: Option<Arc<dyn Scheduler>>) {
        *write(&self.inner.scheduler) = scheduler;
    }

    /// Enables or disables scheduler delivery.
    pub fn set_use_scheduler_for_events(&self, enable: bool) {
        self.inner.use_scheduler.store(enable, Ordering::SeqCst);
    }

    /// Whether scheduler delivery is enabled.
    pub fn uses_scheduler_for_events(&self) -> bool {
        self.inner.use_scheduler.load(Ordering::SeqCst)
    }

    /// Installs the callback for responses carrying `T`, replacing any
    /// previous callback for that kind.
    pub fn subscribe<T, F>(&self, f: F)
    where
        T: ResponseVariant,
        F: Fn(T) + Send + Sync + 'static,
    {
        write(&self.inner.dispatcher).subscribe(f);
    }

    /// Removes the callback for `kind`. Returns whether one was installed.
    pub fn unsubscribe(&self, kind: ResponseKind) -> bool {
        write(&self.inner.dispatcher).unsubscribe(kind)
    }

    /// Whether `kind` has a callback.
    pub fn is_subscribed(&self, kind: ResponseKind) -> bool {
        read(&self.inner.dispatcher).is_subscribed(kind)
    }

    /// Installs the socket-level callback, replacing any previous one.
    pub fn on_socket_event(&self, f: impl Fn(&SocketEvent) + Send + Sync + 'static) {
        write(&self.inner.dispatcher).set_socket_handler(Some(Arc::new(f)));
    }

    /// Installs the dialog handler and attaches it to this engine.
    pub fn set_dialog_handler(&self, handler: Arc<dyn DialogHandler>) {
        handler.attach(self.downgrade());
        *write(&self.inner.dialog) = Some(handler);
    }

    /// Sends `request` to the terminal, connecting first if needed.
    ///
    /// Fails with [`Error::RequestInProgress`], leaving all state untouched,
    /// while an earlier request is still awaiting its response.
    pub fn do_request(&self, request: Request) -> Result<()> {
        let name = request.name();
        let mut state = self.state();
        if state.in_progress {
            info!(request = name, "ignored, request already in progress");
            return Err(Error::RequestInProgress);
        }
        info!(request = name, "issuing request");

        if !self.inner.transport.is_connected() {
            info!(request = name, "not connected, connecting first");
            if let Err(e) = self.connect_locked(&mut state) {
                drop(state);
                error!(error = %e, "connect failed");
                self.report_failure(&e);
                return Err(e);
            }
        }

        state.captured = read(&self.inner.scheduler).clone();
        if request.starts_transaction() {
            state.txn = Some(request.clone());
        }
        let encoded = self.inner.codec.encode(&request);
        state.pending = Some(request);
        let wire = encoded.inspect_err(|e| {
            error!(request = name, error = %e, "failed to encode request");
        })?;

        let sent = self.inner.transport.send(wire.as_bytes());
        state.in_progress = sent.is_ok();
        drop(state);

        match sent {
            Ok(()) => {
                debug!(request = name, len = wire.len(), "request sent");
                self.fire_socket(&SocketEvent::Sent(wire));
                Ok(())
            }
            Err(e) => {
                warn!(request = name, error = %e, "send failed");
                let e = Error::Transport(e);
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Hides the terminal's dialogs and waits for the acknowledgement.
    ///
    /// Returns `Ok(false)` if the terminal did not acknowledge within the
    /// configured timeout. The in-progress flag is cleared either way.
    pub fn do_hide_dialogs(&self) -> Result<bool> {
        self.inner.dialog_ack.reset();
        self.do_request(Request::SetDialog(SetDialogRequest::hidden()))?;
        let timeout = self.inner.config.hide_dialogs_timeout;
        let acked = self.inner.dialog_ack.wait(timeout);
        self.clear_request_in_progress();
        if !acked {
            warn!(?timeout, "terminal did not acknowledge hidden dialogs");
        }
        Ok(acked)
    }

    /// Feeds bytes read from the connection into the engine.
    ///
    /// Transports reach this through the [`EventSink`] given to
    /// [`Transport::connect`]. Returns the first delivery failure, such as
    /// [`Error::NoSubscriber`]; every frame in `data` is still processed.
    pub fn receive(&self, data: &[u8]) -> Result<()> {
        let effects = {
            let mut state = self.state();
            let mut effects = Vec::new();
            state.framer.extend(data, Instant::now());
            while let Some(payload) = state.framer.next_frame() {
                self.process(&mut state, payload, &mut effects);
            }
            effects
        };
        self.apply(effects)
    }

    /// Locks the engine state.
    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Sink handed to the transport on connect.
    fn sink(&self) -> EventSink {
        let weak = Arc::downgrade(&self.inner);
        EventSink::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                Engine { inner }.on_transport_event(event);
            }
        })
    }

    /// Opens a fresh connection while holding the state lock.
    fn connect_locked(&self, state: &mut State) -> Result<()> {
        state.reset();
        let params = self.params();
        info!(host = %params.host, port = params.port, tls = params.tls, "connecting to terminal");
        self.inner.transport.connect(&params, self.sink())?;
        Ok(())
    }

    /// Handles an event reported by the transport.
    fn on_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Data(data) => {
                if let Err(e) = self.receive(&data) {
                    error!(error = %e, "failed to handle inbound data");
                }
            }
            TransportEvent::Error(e) => {
                warn!(error = %e, "transport error");
                self.state().in_progress = false;
                self.fire_socket(&SocketEvent::Failed {
                    cause: e.cause,
                    message: e.message,
                });
            }
            TransportEvent::Terminated(reason) => {
                info!(%reason, "connection terminated");
                self.state().reset();
                self.fire_socket(&SocketEvent::Terminated(reason));
            }
        }
    }

    /// Correlates one decoded frame with the in-flight state.
    fn process(&self, state: &mut State, payload: String, effects: &mut Vec<Effect>) {
        debug!(len = payload.len(), "frame received");
        let decoded = self.inner.codec.decode(&payload);
        effects.push(Effect::Socket(SocketEvent::Received(payload)));

        let response = match decoded {
            Ok(Some(response)) => response,
            Ok(None) => {
                debug!("dropping unrecognised response");
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping undecodable response");
                effects.push(Effect::Socket(SocketEvent::Failed {
                    cause: ErrorCause::Parse,
                    message: e.to_string(),
                }));
                return;
            }
        };

        let kind = response.kind();
        let closes_dialog = state.txn.as_ref().and_then(Request::paired_response) == Some(kind);
        state.in_progress = false;
        let via = route(
            self.inner.use_scheduler.load(Ordering::SeqCst),
            state.captured.as_ref(),
        );

        match response {
            Response::SetDialog(_) => {
                if matches!(state.pending, Some(Request::SetDialog(_))) {
                    effects.push(Effect::DialogAck);
                }
            }
            Response::Receipt(receipt) => {
                self.acknowledge_receipt(effects);
                if receipt.is_pre_print {
                    debug!("pre-print receipt acknowledged");
                } else {
                    effects.push(Effect::Deliver(Response::Receipt(receipt), via));
                }
            }
            response @ (Response::Display(_)
            | Response::Logon(_)
            | Response::Transaction(_)
            | Response::GetLastTransaction(_)
            | Response::ReprintReceipt(_)
            | Response::ControlPanel(_)
            | Response::Settlement(_)
            | Response::Status(_)
            | Response::QueryCard(_)
            | Response::ChequeAuth(_)
            | Response::Slave(_)
            | Response::ConfigureMerchant(_)
            | Response::ClientList(_)
            | Response::GetPassword(_)
            | Response::CloudLogon(_)) => effects.push(Effect::Deliver(response, via)),
        }

        if closes_dialog {
            effects.push(Effect::CloseDialog);
        }
    }

    /// Tells the terminal a receipt was received.
    fn acknowledge_receipt(&self, effects: &mut Vec<Effect>) {
        match self.inner.transport.send(RECEIPT_ACK.as_bytes()) {
            Ok(()) => effects.push(Effect::Socket(SocketEvent::Sent(RECEIPT_ACK.to_owned()))),
            Err(e) => {
                warn!(error = %e, "failed to acknowledge receipt");
                effects.push(Effect::Socket(SocketEvent::Failed {
                    cause: e.cause,
                    message: e.message,
                }));
            }
        }
    }

    /// Performs deferred effects in order.
    fn apply(&self, effects: Vec<Effect>) -> Result<()> {
        let mut first_err = None;
        for effect in effects {
            match effect {
                Effect::Socket(event) => self.fire_socket(&event),
                Effect::Deliver(response, via) => {
                    let resolved = read(&self.inner.dispatcher).resolve(response);
                    match resolved {
                        Ok(delivery) => delivery.run(via.as_ref()),
                        Err(e) => {
                            error!(error = %e, "undeliverable response");
                            first_err.get_or_insert(e);
                        }
                    }
                }
                Effect::DialogAck => self.inner.dialog_ack.set(),
                Effect::CloseDialog => {
                    let handler = read(&self.inner.dialog).clone();
                    if let Some(handler) = handler {
                        debug!("closing transaction dialog");
                        handler.close_dialog();
                    }
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Reports a transport failure to the socket-level subscriber.
    fn report_failure(&self, error: &Error) {
        if let Error::Transport(e) = error {
            self.fire_socket(&SocketEvent::Failed {
                cause: e.cause,
                message: e.message.clone(),
            });
        }
    }

    /// Invokes the socket-level subscriber, if any.
    fn fire_socket(&self, event: &SocketEvent) {
        let handler = read(&self.inner.dispatcher).socket_handler();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

/// Single-slot, auto-resetting signal.
#[derive(Debug, Default)]
struct Signal {
    /// Whether the signal is raised.
    raised: Mutex<bool>,
    /// Wakes waiters.
    cond: Condvar,
}

impl Signal {
    /// Raises the signal.
    fn set(&self) {
        *lock(&self.raised) = true;
        self.cond.notify_all();
    }

    /// Lowers the signal.
    fn reset(&self) {
        *lock(&self.raised) = false;
    }

    /// Waits up to `timeout` for the signal, consuming it.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = lock(&self.raised);
        let (mut guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, false)
    }
}

/// Locks a mutex, ignoring poisoning.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-locks an `RwLock`, ignoring poisoning.
fn read<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-locks an `RwLock`, ignoring poisoning.
fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
