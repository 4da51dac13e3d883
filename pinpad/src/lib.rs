//! Client-side engine for networked PIN-pad payment terminals.
//!
//! `pinpad` talks to a terminal over a single TCP connection, allowing one
//! request in flight at a time. Responses are reassembled from the byte
//! stream, decoded, and handed to per-kind subscribers, optionally on a
//! caller-chosen [`Scheduler`].
//!
//! # Quick start
//!
//! ```no_run
//! use pinpad::{ConnectionParams, Engine, StatusRequest, StatusResponse};
//!
//! let engine = Engine::builder()
//!     .params(ConnectionParams::new("192.168.1.50", 2011))
//!     .build();
//!
//! engine.subscribe(|s: StatusResponse| println!("terminal {}", s.terminal_id));
//! engine.do_status(StatusRequest::default())?;
//! # Ok::<(), pinpad::Error>(())
//! ```
//!
//! Receipts are acknowledged automatically. Pre-print receipts stop there;
//! final receipts are also delivered to the receipt subscriber.

mod config;
mod dialog;
mod dispatch;
mod engine;
mod error;
mod requests;
mod schedule;
mod tcp;
#[cfg(test)]
mod testing;
mod transport;

pub use config::{
    ConnectionParams, DEFAULT_HIDE_DIALOGS_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, EngineConfig,
};
pub use dialog::DialogHandler;
pub use dispatch::SocketEvent;
pub use engine::{Engine, EngineBuilder, WeakEngine};
pub use error::{Error, Result};
pub use pinpad_proto::{
    AccountType, ChequeAuthRequest, ChequeAuthResponse, ChequeType, ClientEntry,
    ClientListRequest, ClientListResponse, CloudLogonResponse, Codec, CodecError,
    ConfigureMerchantRequest, ConfigureMerchantResponse, ControlPanelRequest,
    ControlPanelResponse, ControlPanelType, DialogType, DisplayResponse,
    GetLastTransactionRequest, GetLastTransactionResponse, GetPasswordResponse, JsonCodec, Key,
    LogonRequest, LogonResponse, LogonType, QueryCardRequest, QueryCardResponse,
    ReceiptResponse, ReceiptType, ReprintReceiptRequest, ReprintReceiptResponse, Request,
    Response, ResponseKind, ResponseVariant, SendKeyRequest, SetDialogRequest,
    SetDialogResponse, SettlementRequest, SettlementResponse, SettlementType, SlaveRequest,
    SlaveResponse, StatusRequest, StatusResponse, StatusType, TransactionRequest,
    TransactionResponse, TxnType,
};
pub use schedule::{EventLoop, Job, LoopHandle, Scheduler};
pub use tcp::{DEFAULT_CONNECT_TIMEOUT, TcpTransport};
pub use transport::{ErrorCause, EventSink, Transport, TransportError, TransportEvent};
