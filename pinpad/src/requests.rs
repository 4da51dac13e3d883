//! Typed request operations.
//!
//! Each method wraps its request and goes through [`Engine::do_request`],
//! so the one-in-flight rule and auto-connect apply to all of them.

use pinpad_proto::{
    ChequeAuthRequest, ClientListRequest, ConfigureMerchantRequest, ControlPanelRequest,
    GetLastTransactionRequest, Key, LogonRequest, QueryCardRequest, ReprintReceiptRequest, Request,
    SendKeyRequest, SettlementRequest, SlaveRequest, StatusRequest, TransactionRequest,
};

use crate::engine::Engine;
use crate::error::Result;

impl Engine {
    /// Logs the terminal on to its host.
    pub fn do_logon(&self, request: LogonRequest) -> Result<()> {
        self.do_request(Request::Logon(request))
    }

    /// Starts a card transaction.
    pub fn do_transaction(&self, request: TransactionRequest) -> Result<()> {
        self.do_request(Request::Transaction(request))
    }

    /// Asks for the outcome of the last transaction.
    pub fn do_get_last_transaction(&self, request: GetLastTransactionRequest) -> Result<()> {
        self.do_request(Request::GetLastTransaction(request))
    }

    /// Reprints a receipt.
    pub fn do_reprint_receipt(&self, request: ReprintReceiptRequest) -> Result<()> {
        self.do_request(Request::ReprintReceipt(request))
    }

    /// Forwards a key press to the terminal's current dialog.
    pub fn do_send_key(&self, request: SendKeyRequest) -> Result<()> {
        self.do_request(Request::SendKey(request))
    }

    /// Forwards a bare key press.
    pub fn do_send_key_code(&self, key: Key) -> Result<()> {
        self.do_send_key(SendKeyRequest {
            key,
            data: String::new(),
        })
    }

    /// Opens the terminal control panel.
    pub fn do_display_control_panel(&self, request: ControlPanelRequest) -> Result<()> {
        self.do_request(Request::ControlPanel(request))
    }

    /// Runs a settlement.
    pub fn do_settlement(&self, request: SettlementRequest) -> Result<()> {
        self.do_request(Request::Settlement(request))
    }

    /// Queries terminal status.
    pub fn do_status(&self, request: StatusRequest) -> Result<()> {
        self.do_request(Request::Status(request))
    }

    /// Reads the card without charging it.
    pub fn do_query_card(&self, request: QueryCardRequest) -> Result<()> {
        self.do_request(Request::QueryCard(request))
    }

    /// Authorises a cheque.
    pub fn do_cheque_auth(&self, request: ChequeAuthRequest) -> Result<()> {
        self.do_request(Request::ChequeAuth(request))
    }

    /// Sends a raw PIN-pad command.
    pub fn do_slave_command(&self, command: impl Into<String>) -> Result<()> {
        self.do_request(Request::Slave(SlaveRequest {
            raw_command: command.into(),
        }))
    }

    /// Configures merchant parameters on the terminal.
    pub fn do_config_merchant(&self, request: ConfigureMerchantRequest) -> Result<()> {
        self.do_request(Request::ConfigureMerchant(request))
    }

    /// Asks the terminal which POS clients are attached to it.
    pub fn do_client_list(&self) -> Result<()> {
        self.do_request(Request::ClientList(ClientListRequest::default()))
    }
}
