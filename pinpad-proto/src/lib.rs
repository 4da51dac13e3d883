//! Wire protocol for PIN-pad terminal communication.
//!
//! Inbound messages arrive on a TCP stream framed as `#` followed by a
//! 4-digit, zero-padded decimal length and the payload. The length counts
//! the whole frame, header included. [`Framer`] reassembles payloads from
//! arbitrarily split reads; a [`Codec`] turns payloads into typed
//! [`Response`] values and [`Request`] values into wire text.

mod codec;
mod frame;
mod message;

pub use codec::{Codec, CodecError, JsonCodec};
pub use frame::{
    DEFAULT_STALE_AFTER, FrameError, Framer, HEADER_LEN, MAX_FRAME, RECEIPT_ACK, START, frame,
};
pub use message::{
    AccountType, ChequeAuthRequest, ChequeAuthResponse, ChequeType, ClientEntry,
    ClientListRequest, ClientListResponse, CloudLogonResponse, ConfigureMerchantRequest,
    ConfigureMerchantResponse, ControlPanelRequest, ControlPanelResponse, ControlPanelType,
    DialogType, DisplayResponse, GetLastTransactionRequest, GetLastTransactionResponse,
    GetPasswordResponse, Key, LogonRequest, LogonResponse, LogonType, QueryCardRequest,
    QueryCardResponse, ReceiptResponse, ReceiptType, ReprintReceiptRequest,
    ReprintReceiptResponse, Request, Response, ResponseKind, ResponseVariant, SendKeyRequest,
    SetDialogRequest, SetDialogResponse, SettlementRequest, SettlementResponse, SettlementType,
    SlaveRequest, SlaveResponse, StatusRequest, StatusResponse, StatusType, TransactionRequest,
    TransactionResponse, TxnType,
};
