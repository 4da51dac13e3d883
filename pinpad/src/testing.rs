//! In-memory collaborators for engine tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use pinpad_proto::{
    ClientEntry, ClientListResponse, CloudLogonResponse, Codec, CodecError, DisplayResponse,
    GetPasswordResponse, ReceiptResponse, Request, Response, SetDialogResponse, StatusResponse,
    TransactionResponse, frame,
};

use crate::config::ConnectionParams;
use crate::transport::{EventSink, Transport, TransportError, TransportEvent};

/// Shared view of a [`MockTransport`], kept by the test.
#[derive(Default)]
pub(crate) struct Wire {
    /// Connection flag.
    pub connected: AtomicBool,
    /// Number of connect calls.
    pub connects: AtomicUsize,
    /// Fail the next connects.
    pub fail_connect: AtomicBool,
    /// Fail every send.
    pub fail_send: AtomicBool,
    /// Everything sent, one entry per call.
    pub sent: Mutex<Vec<String>>,
    /// Sink from the last connect.
    sink: Mutex<Option<EventSink>>,
}

impl Wire {
    /// Snapshot of sent text.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivers an event as the transport's receive thread would.
    pub fn emit(&self, event: TransportEvent) {
        let sink = self.sink.lock().unwrap().clone().expect("not connected");
        sink.emit(event);
    }

    /// Delivers inbound bytes.
    pub fn inject(&self, data: &str) {
        self.emit(TransportEvent::Data(Bytes::copy_from_slice(data.as_bytes())));
    }
}

/// Transport that records traffic instead of touching the network.
pub(crate) struct MockTransport(Arc<Wire>);

impl MockTransport {
    /// A transport and the handle a test inspects it through.
    pub fn new() -> (Self, Arc<Wire>) {
        let wire = Arc::new(Wire::default());
        (Self(Arc::clone(&wire)), wire)
    }
}

impl Transport for MockTransport {
    fn connect(&self, _params: &ConnectionParams, events: EventSink) -> Result<(), TransportError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::connect("connection refused"));
        }
        *self.0.sink.lock().unwrap() = Some(events);
        self.0.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.0.connected.store(false, Ordering::SeqCst);
    }

    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.0.fail_send.load(Ordering::SeqCst) {
            return Err(TransportError::send("broken pipe"));
        }
        self.0
            .sent
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }
}

/// Codec with a compact two-letter wire format.
///
/// Requests encode as their framed name. Payloads decode by prefix:
/// `TX<code><ref>` transaction, `ST<id>` status, `SD` dialog ack,
/// `RC<0|1>` receipt with pre-print flag, `DP<text>` display, `CL<name>`
/// client list, `GP<password>` password, `CO` cloud logon. A `??`
/// prefix is unrecognised; anything else fails to decode. A slave command
/// of `FAIL` fails to encode.
pub(crate) struct StubCodec;

impl Codec for StubCodec {
    fn encode(&self, request: &Request) -> Result<String, CodecError> {
        if let Request::Slave(slave) = request
            && slave.raw_command == "FAIL"
        {
            return Err(CodecError::Encode("refused".into()));
        }
        Ok(frame(request.name())?)
    }

    fn decode(&self, payload: &str) -> Result<Option<Response>, CodecError> {
        let (tag, body) = payload.split_at(payload.len().min(2));
        let response = match tag {
            "TX" => {
                let (code, txn_ref) = body.split_at(body.len().min(2));
                Response::Transaction(TransactionResponse {
                    success: code == "00",
                    response_code: code.into(),
                    txn_ref: txn_ref.into(),
                    ..TransactionResponse::default()
                })
            }
            "ST" => Response::Status(StatusResponse {
                success: true,
                terminal_id: body.into(),
                ..StatusResponse::default()
            }),
            "SD" => Response::SetDialog(SetDialogResponse { success: true }),
            "RC" => Response::Receipt(ReceiptResponse {
                is_pre_print: body == "1",
                ..ReceiptResponse::default()
            }),
            "DP" => Response::Display(DisplayResponse {
                lines: vec![body.into()],
                ..DisplayResponse::default()
            }),
            "CL" => Response::ClientList(ClientListResponse {
                clients: vec![ClientEntry {
                    name: body.into(),
                    ..ClientEntry::default()
                }],
            }),
            "GP" => Response::GetPassword(GetPasswordResponse {
                success: true,
                password: body.into(),
                ..GetPasswordResponse::default()
            }),
            "CO" => Response::CloudLogon(CloudLogonResponse {
                success: true,
                ..CloudLogonResponse::default()
            }),
            "??" => return Ok(None),
            _ => return Err(CodecError::Decode(format!("bad payload {payload:?}"))),
        };
        Ok(Some(response))
    }
}
