//! Blocking TCP transport with a per-connection reader thread.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::ConnectionParams;
use crate::transport::{EventSink, Transport, TransportError, TransportEvent};

/// Default time allowed for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read buffer size for the receive thread.
const READ_CHUNK: usize = 4096;

/// Plain TCP [`Transport`].
///
/// TLS is not provided; a connect with [`ConnectionParams::tls`] set fails
/// with a connect error. Supply a custom [`Transport`] for TLS terminals.
#[derive(Debug)]
pub struct TcpTransport {
    /// Upper bound on each address connect attempt.
    connect_timeout: Duration,
    /// The live connection, if any.
    conn: Mutex<Option<Conn>>,
}

/// One open connection.
#[derive(Debug)]
struct Conn {
    /// Write half; the reader thread owns a clone.
    stream: TcpStream,
    /// Cleared on disconnect or failure; suppresses further events.
    alive: Arc<AtomicBool>,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTransport {
    /// Creates a transport using [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a transport with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            conn: Mutex::new(None),
        }
    }

    /// Locks the connection slot, ignoring poisoning.
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Conn>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves and connects to the first reachable address.
    fn open(&self, params: &ConnectionParams) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (params.host.as_str(), params.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }
}

impl Transport for TcpTransport {
    fn connect(&self, params: &ConnectionParams, events: EventSink) -> Result<(), TransportError> {
        if params.tls {
            return Err(TransportError::connect("TLS is not supported by TcpTransport"));
        }
        self.disconnect();

        let stream = self
            .open(params)
            .map_err(|e| TransportError::connect(format!("{}:{}: {e}", params.host, params.port)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::connect(e.to_string()))?;
        if params.keep_alive {
            set_keepalive(&stream).map_err(|e| TransportError::connect(e.to_string()))?;
        }
        let reader = stream
            .try_clone()
            .map_err(|e| TransportError::connect(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        thread::Builder::new()
            .name("pinpad-rx".into())
            .spawn(move || receive_loop(reader, &flag, &events))
            .map_err(|e| TransportError::connect(e.to_string()))?;

        info!(host = %params.host, port = params.port, "connected");
        *self.slot() = Some(Conn { stream, alive });
        Ok(())
    }

    fn disconnect(&self) {
        if let Some(conn) = self.slot().take() {
            conn.alive.store(false, Ordering::SeqCst);
            // Unblocks the reader thread; it exits without emitting events.
            let _ = conn.stream.shutdown(Shutdown::Both);
            info!("disconnected");
        }
    }

    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let slot = self.slot();
        let Some(conn) = slot.as_ref().filter(|c| c.alive.load(Ordering::SeqCst)) else {
            return Err(TransportError::send("not connected"));
        };
        let mut stream = &conn.stream;
        stream
            .write_all(data)
            .and_then(|()| stream.flush())
            .map_err(|e| TransportError::send(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|c| c.alive.load(Ordering::SeqCst))
    }

    fn check_connect_state(&self) -> bool {
        self.slot().as_ref().is_some_and(|c| {
            c.alive.load(Ordering::SeqCst)
                && c.stream.peer_addr().is_ok()
                && matches!(c.stream.take_error(), Ok(None))
        })
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Reads until EOF or error, forwarding everything to `events`.
fn receive_loop(mut stream: TcpStream, alive: &AtomicBool, events: &EventSink) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                if alive.swap(false, Ordering::SeqCst) {
                    events.emit(TransportEvent::Terminated("connection closed by peer".into()));
                }
                return;
            }
            Ok(n) => {
                if !alive.load(Ordering::SeqCst) {
                    return;
                }
                events.emit(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                if alive.swap(false, Ordering::SeqCst) {
                    events.emit(TransportEvent::Error(TransportError::receive(e.to_string())));
                    events.emit(TransportEvent::Terminated(e.to_string()));
                }
                return;
            }
        }
    }
}

/// Enables `SO_KEEPALIVE`.
#[cfg(unix)]
fn set_keepalive(stream: &TcpStream) -> io::Result<()> {
    use nix::sys::socket::{setsockopt, sockopt};

    setsockopt(stream, sockopt::KeepAlive, &true).map_err(io::Error::from)
}

/// Keep-alive is not configurable here; the request is ignored.
#[cfg(not(unix))]
fn set_keepalive(_stream: &TcpStream) -> io::Result<()> {
    tracing::warn!("TCP keep-alive is not supported on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::mpsc;

    use super::*;

    fn listener() -> (TcpListener, ConnectionParams) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ConnectionParams::new("127.0.0.1", port))
    }

    fn channel_sink() -> (EventSink, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let sink = EventSink::new(move |ev| {
            let _ = tx.lock().unwrap().send(ev);
        });
        (sink, rx)
    }

    #[test]
    fn sends_and_receives_over_loopback() {
        let (listener, params) = listener();
        let (sink, events) = channel_sink();
        let transport = TcpTransport::new();

        transport.connect(&params, sink).unwrap();
        assert!(transport.is_connected());
        assert!(transport.check_connect_state());

        let (mut peer, _) = listener.accept().unwrap();
        transport.send(b"#0007hi").unwrap();
        let mut got = [0u8; 7];
        peer.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"#0007hi");

        peer.write_all(b"#0008abc").unwrap();
        let mut received = Vec::new();
        while received.len() < 8 {
            match events.recv_timeout(Duration::from_secs(5)).unwrap() {
                TransportEvent::Data(d) => received.extend_from_slice(&d),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(received, b"#0008abc");
    }

    #[test]
    fn peer_close_reports_termination() {
        let (listener, params) = listener();
        let (sink, events) = channel_sink();
        let transport = TcpTransport::new();
        transport.connect(&params, sink).unwrap();

        let (peer, _) = listener.accept().unwrap();
        drop(peer);

        let ev = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(ev, TransportEvent::Terminated(_)));
        assert!(!transport.is_connected());
        assert!(transport.send(b"x").is_err());
    }

    #[test]
    fn local_disconnect_is_silent() {
        let (listener, params) = listener();
        let (sink, events) = channel_sink();
        let transport = TcpTransport::new();
        transport.connect(&params, sink).unwrap();
        let _peer = listener.accept().unwrap();

        transport.disconnect();
        assert!(!transport.is_connected());
        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn dropping_transport_closes_socket() {
        let (listener, params) = listener();
        let (sink, events) = channel_sink();
        let transport = TcpTransport::new();
        transport.connect(&params, sink).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        drop(transport);
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(peer.read(&mut buf).unwrap(), 0);
        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        let (listener, params) = listener();
        drop(listener);
        let (sink, _events) = channel_sink();

        let err = TcpTransport::new().connect(&params, sink).unwrap_err();
        assert_eq!(err.cause, crate::ErrorCause::Connect);
    }

    #[test]
    fn tls_is_rejected() {
        let (_listener, params) = listener();
        let (sink, _events) = channel_sink();

        let err = TcpTransport::new()
            .connect(&params.tls(true), sink)
            .unwrap_err();
        assert_eq!(err.cause, crate::ErrorCause::Connect);
    }

    #[test]
    fn keep_alive_connection_succeeds() {
        let (_listener, params) = listener();
        let (sink, _events) = channel_sink();
        let transport = TcpTransport::new();
        transport.connect(&params.keep_alive(true), sink).unwrap();
        assert!(transport.is_connected());
    }
}
