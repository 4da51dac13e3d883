//! Request and response records exchanged with the terminal.
//!
//! Amounts are carried in minor currency units (cents).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TxnType {
    /// Sale, optionally with cash out.
    #[default]
    Purchase,
    /// Refund to the card.
    Refund,
    /// Cash out only.
    CashOut,
    /// Void of a previous transaction.
    Void,
    /// Pre-authorisation.
    PreAuth,
    /// Completion of a pre-authorisation.
    Completion,
}

/// Card account selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AccountType {
    /// Let the cardholder choose on the terminal.
    #[default]
    Default,
    /// Cheque account.
    Cheque,
    /// Savings account.
    Savings,
    /// Credit account.
    Credit,
}

/// Logon variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogonType {
    /// Standard host logon.
    #[default]
    Standard,
    /// RSA key exchange logon.
    Rsa,
    /// Full terminal management download.
    TmsFull,
    /// Terminal parameter download.
    TmsParams,
    /// Diagnostics logon.
    Diagnostics,
}

/// Settlement variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SettlementType {
    /// Close the current batch.
    #[default]
    Settlement,
    /// Print totals without closing the batch.
    PreSettlement,
    /// Reprint the previous settlement.
    LastSettlement,
    /// Sub-totals for the current shift.
    SubTotals,
}

/// Status query variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StatusType {
    /// PIN-pad online status.
    #[default]
    Standard,
    /// Terminal application information.
    TerminalAppInfo,
}

/// Control panel page to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ControlPanelType {
    /// Full control panel.
    #[default]
    Full,
    /// Settlement page.
    Settlement,
    /// Journal viewer.
    JournalViewer,
    /// PIN-pad setup page.
    PinpadSetup,
}

/// Terminal dialog presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DialogType {
    /// Standard dialog.
    #[default]
    Standard,
    /// Touch-friendly dialog.
    Touch,
    /// Dialogs hidden.
    Hidden,
}

/// A key the POS can press on behalf of the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Key {
    /// OK / enter.
    #[default]
    Ok,
    /// Cancel.
    Cancel,
    /// Yes.
    Yes,
    /// No.
    No,
    /// Authorise.
    Authorise,
}

/// Cheque authorisation variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ChequeType {
    /// Personal guarantee.
    PersonalGuarantee,
    /// Business guarantee.
    #[default]
    BusinessGuarantee,
    /// Personal appraisal.
    PersonalAppraisal,
    /// Business appraisal.
    BusinessAppraisal,
}

/// Receipt audience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ReceiptType {
    /// Customer copy.
    #[default]
    Customer,
    /// Merchant copy.
    Merchant,
    /// Audit copy.
    Audit,
    /// Settlement report.
    Settlement,
    /// Logon report.
    Logon,
}

/// Host logon request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogonRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Logon variant.
    pub logon_type: LogonType,
}

/// Card transaction request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Transaction type.
    pub txn_type: TxnType,
    /// Purchase amount in cents.
    pub amt_purchase: u64,
    /// Cash-out amount in cents.
    pub amt_cash: u64,
    /// POS reference printed on the receipt.
    pub txn_ref: String,
    /// ISO 4217 currency code; empty for the terminal default.
    pub currency_code: String,
    /// Authorisation code, required for completions.
    pub auth_code: Option<String>,
    /// Account to debit.
    pub account_type: AccountType,
    /// Run in training mode.
    pub training_mode: bool,
    /// Allow the cardholder to add a tip.
    pub enable_tip: bool,
}

/// Request for the outcome of the last transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetLastTransactionRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Reference of the transaction to look up; empty for the most recent.
    pub txn_ref: String,
}

/// Request to reprint a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprintReceiptRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Return the last receipt instead of printing it.
    pub get_last: bool,
}

/// Simulated key press.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendKeyRequest {
    /// Key to press.
    pub key: Key,
    /// Entry data accompanying the key, if the prompt accepts input.
    pub data: String,
}

/// Request to open the terminal control panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPanelRequest {
    /// Page to open.
    pub panel: ControlPanelType,
    /// Respond as soon as the panel opens rather than when it closes.
    pub return_immediately: bool,
}

/// Settlement request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Settlement variant.
    pub settlement_type: SettlementType,
    /// Reset shift totals after settling.
    pub reset_totals: bool,
}

/// PIN-pad status query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Status variant.
    pub status_type: StatusType,
}

/// Card query without a financial transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCardRequest {
    /// Two-digit merchant code.
    pub merchant: String,
}

/// Cheque authorisation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChequeAuthRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// 6-digit branch code.
    pub branch_code: String,
    /// Cheque account number.
    pub account_number: String,
    /// Cheque serial number.
    pub serial_number: String,
    /// Cheque amount in cents.
    pub amount: u64,
    /// Authorisation variant.
    pub cheque_type: ChequeType,
    /// Reference attached to the authorisation.
    pub reference_number: String,
}

/// Raw command passed through to the PIN-pad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaveRequest {
    /// Command text, sent verbatim.
    pub raw_command: String,
}

/// Merchant configuration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureMerchantRequest {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Terminal identifier.
    pub terminal_id: String,
    /// Merchant identifier.
    pub merchant_id: String,
    /// Acquiring institution identifier.
    pub aiic: String,
    /// Network international identifier.
    pub nii: u32,
    /// Host timeout in seconds.
    pub timeout: u32,
}

/// Asks which POS clients are connected to the terminal host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ClientListRequest {}

/// Changes how the terminal presents its dialogs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetDialogRequest {
    /// Presentation to switch to.
    pub dialog_type: DialogType,
    /// Dialog title; empty keeps the terminal default.
    pub title: String,
}

impl SetDialogRequest {
    /// A request hiding every terminal dialog.
    pub fn hidden() -> Self {
        Self {
            dialog_type: DialogType::Hidden,
            title: String::new(),
        }
    }
}

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::exhaustive_enums, clippy::large_enum_variant)]
pub enum Request {
    /// Host logon.
    Logon(LogonRequest),
    /// Card transaction.
    Transaction(TransactionRequest),
    /// Last transaction lookup.
    GetLastTransaction(GetLastTransactionRequest),
    /// Receipt reprint.
    ReprintReceipt(ReprintReceiptRequest),
    /// Key press.
    SendKey(SendKeyRequest),
    /// Control panel.
    ControlPanel(ControlPanelRequest),
    /// Settlement.
    Settlement(SettlementRequest),
    /// Status query.
    Status(StatusRequest),
    /// Card query.
    QueryCard(QueryCardRequest),
    /// Cheque authorisation.
    ChequeAuth(ChequeAuthRequest),
    /// Raw PIN-pad command.
    Slave(SlaveRequest),
    /// Merchant configuration.
    ConfigureMerchant(ConfigureMerchantRequest),
    /// Connected client listing.
    ClientList(ClientListRequest),
    /// Dialog presentation change.
    SetDialog(SetDialogRequest),
}

impl Request {
    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Logon(_) => "logon",
            Self::Transaction(_) => "transaction",
            Self::GetLastTransaction(_) => "get_last_transaction",
            Self::ReprintReceipt(_) => "reprint_receipt",
            Self::SendKey(_) => "send_key",
            Self::ControlPanel(_) => "control_panel",
            Self::Settlement(_) => "settlement",
            Self::Status(_) => "status",
            Self::QueryCard(_) => "query_card",
            Self::ChequeAuth(_) => "cheque_auth",
            Self::Slave(_) => "slave",
            Self::ConfigureMerchant(_) => "configure_merchant",
            Self::ClientList(_) => "client_list",
            Self::SetDialog(_) => "set_dialog",
        }
    }

    /// Whether this request opens a terminal dialog that stays up until
    /// its paired response arrives.
    pub const fn starts_transaction(&self) -> bool {
        !matches!(
            self,
            Self::SendKey(_) | Self::Slave(_) | Self::ClientList(_) | Self::SetDialog(_)
        )
    }

    /// The response kind that concludes this request's terminal dialog.
    pub const fn paired_response(&self) -> Option<ResponseKind> {
        match self {
            Self::Logon(_) => Some(ResponseKind::Logon),
            Self::Transaction(_) => Some(ResponseKind::Transaction),
            Self::GetLastTransaction(_) => Some(ResponseKind::GetLastTransaction),
            Self::ReprintReceipt(_) => Some(ResponseKind::ReprintReceipt),
            Self::ControlPanel(_) => Some(ResponseKind::ControlPanel),
            Self::Settlement(_) => Some(ResponseKind::Settlement),
            Self::Status(_) => Some(ResponseKind::Status),
            Self::QueryCard(_) => Some(ResponseKind::QueryCard),
            Self::ChequeAuth(_) => Some(ResponseKind::ChequeAuth),
            Self::ConfigureMerchant(_) => Some(ResponseKind::ConfigureMerchant),
            Self::Slave(_) => Some(ResponseKind::Slave),
            Self::ClientList(_) => Some(ResponseKind::ClientList),
            Self::SetDialog(_) => Some(ResponseKind::SetDialog),
            Self::SendKey(_) => None,
        }
    }
}

/// Acknowledgement of a [`SetDialogRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetDialogResponse {
    /// Whether the terminal applied the change.
    pub success: bool,
}

/// Receipt to be printed by the POS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptResponse {
    /// Receipt audience.
    pub receipt_type: ReceiptType,
    /// Receipt text, one entry per printed line.
    pub lines: Vec<String>,
    /// Sent ahead of the transaction result so the POS can prepare its
    /// printer; carries no printable content.
    pub is_pre_print: bool,
}

/// Prompt shown on the terminal display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayResponse {
    /// Display text, one entry per line.
    pub lines: Vec<String>,
    /// OK key is active.
    pub ok_key: bool,
    /// Cancel key is active.
    pub cancel_key: bool,
    /// Yes key is active.
    pub accept_yes_key: bool,
    /// No key is active.
    pub decline_no_key: bool,
    /// Authorise key is active.
    pub auth_key: bool,
    /// The prompt accepts typed input.
    pub input_data: bool,
}

/// Logon outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogonResponse {
    /// Whether the logon succeeded.
    pub success: bool,
    /// Two-character host response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Terminal identifier.
    pub terminal_id: String,
}

/// Transaction outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionResponse {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Transaction type performed.
    pub txn_type: TxnType,
    /// Whether the transaction was approved.
    pub success: bool,
    /// Two-character host response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// POS reference echoed back.
    pub txn_ref: String,
    /// Purchase amount in cents.
    pub amt_purchase: u64,
    /// Cash-out amount in cents.
    pub amt_cash: u64,
    /// Tip amount in cents.
    pub amt_tip: u64,
    /// Authorisation code.
    pub auth_code: String,
    /// System trace audit number.
    pub stan: u32,
    /// Card scheme name.
    pub card_type: String,
    /// Account used.
    pub account_type: AccountType,
}

/// Outcome of the last transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetLastTransactionResponse {
    /// Whether the lookup succeeded.
    pub success: bool,
    /// Whether the last transaction itself was approved.
    pub last_transaction_success: bool,
    /// Two-character host response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Transaction type.
    pub txn_type: TxnType,
    /// POS reference.
    pub txn_ref: String,
    /// Purchase amount in cents.
    pub amt_purchase: u64,
}

/// Receipt reprint outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprintReceiptResponse {
    /// Whether the reprint succeeded.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Receipt text when the last receipt was requested.
    pub lines: Vec<String>,
}

/// Control panel outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPanelResponse {
    /// Whether the panel was shown.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
}

/// Settlement outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementResponse {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Whether the settlement succeeded.
    pub success: bool,
    /// Two-character host response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Raw settlement totals as reported by the host.
    pub settlement_data: String,
}

/// PIN-pad status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Whether the PIN-pad is online.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Terminal identifier.
    pub terminal_id: String,
    /// PIN-pad software version.
    pub software_version: String,
}

/// Card query outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCardResponse {
    /// Two-digit merchant code.
    pub merchant: String,
    /// Whether a card was read.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Track 2 data.
    pub track2: String,
    /// Card BIN.
    pub card_bin: u32,
    /// Account selected.
    pub account_type: AccountType,
}

/// Cheque authorisation outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChequeAuthResponse {
    /// Whether the cheque was authorised.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Reference number.
    pub reference_number: String,
    /// Authorised amount in cents.
    pub amount: u64,
}

/// Reply to a raw PIN-pad command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaveResponse {
    /// Reply text, verbatim.
    pub response: String,
}

/// Merchant configuration outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureMerchantResponse {
    /// Whether the configuration was applied.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
}

/// One POS client known to the terminal host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientEntry {
    /// Client name.
    pub name: String,
    /// Client IP address.
    pub ip_address: String,
    /// Client port.
    pub port: u16,
    /// Connection state as reported by the host.
    pub state: String,
}

/// Reply to a [`ClientListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientListResponse {
    /// Connected clients.
    pub clients: Vec<ClientEntry>,
}

/// Password entered on the terminal when the host asked for one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetPasswordResponse {
    /// Whether a password was entered.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
    /// Password text.
    pub password: String,
}

/// Outcome of a cloud pairing logon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudLogonResponse {
    /// Whether the logon succeeded.
    pub success: bool,
    /// Two-character response code.
    pub response_code: String,
    /// Human-readable response.
    pub response_text: String,
}

/// Inbound message from the terminal.
///
/// Besides the reply to each request kind, the terminal sends display
/// prompts and receipts on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::exhaustive_enums, clippy::large_enum_variant)]
pub enum Response {
    /// Dialog change acknowledgement.
    SetDialog(SetDialogResponse),
    /// Receipt notification.
    Receipt(ReceiptResponse),
    /// Display prompt notification.
    Display(DisplayResponse),
    /// Logon outcome.
    Logon(LogonResponse),
    /// Transaction outcome.
    Transaction(TransactionResponse),
    /// Last transaction outcome.
    GetLastTransaction(GetLastTransactionResponse),
    /// Reprint outcome.
    ReprintReceipt(ReprintReceiptResponse),
    /// Control panel outcome.
    ControlPanel(ControlPanelResponse),
    /// Settlement outcome.
    Settlement(SettlementResponse),
    /// Status.
    Status(StatusResponse),
    /// Card query outcome.
    QueryCard(QueryCardResponse),
    /// Cheque authorisation outcome.
    ChequeAuth(ChequeAuthResponse),
    /// Raw command reply.
    Slave(SlaveResponse),
    /// Merchant configuration outcome.
    ConfigureMerchant(ConfigureMerchantResponse),
    /// Connected client listing.
    ClientList(ClientListResponse),
    /// Password prompt outcome.
    GetPassword(GetPasswordResponse),
    /// Cloud logon outcome.
    CloudLogon(CloudLogonResponse),
}

/// Tag identifying a [`Response`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::exhaustive_enums)]
pub enum ResponseKind {
    /// [`Response::SetDialog`].
    SetDialog,
    /// [`Response::Receipt`].
    Receipt,
    /// [`Response::Display`].
    Display,
    /// [`Response::Logon`].
    Logon,
    /// [`Response::Transaction`].
    Transaction,
    /// [`Response::GetLastTransaction`].
    GetLastTransaction,
    /// [`Response::ReprintReceipt`].
    ReprintReceipt,
    /// [`Response::ControlPanel`].
    ControlPanel,
    /// [`Response::Settlement`].
    Settlement,
    /// [`Response::Status`].
    Status,
    /// [`Response::QueryCard`].
    QueryCard,
    /// [`Response::ChequeAuth`].
    ChequeAuth,
    /// [`Response::Slave`].
    Slave,
    /// [`Response::ConfigureMerchant`].
    ConfigureMerchant,
    /// [`Response::ClientList`].
    ClientList,
    /// [`Response::GetPassword`].
    GetPassword,
    /// [`Response::CloudLogon`].
    CloudLogon,
}

impl ResponseKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::SetDialog,
        Self::Receipt,
        Self::Display,
        Self::Logon,
        Self::Transaction,
        Self::GetLastTransaction,
        Self::ReprintReceipt,
        Self::ControlPanel,
        Self::Settlement,
        Self::Status,
        Self::QueryCard,
        Self::ChequeAuth,
        Self::Slave,
        Self::ConfigureMerchant,
        Self::ClientList,
        Self::GetPassword,
        Self::CloudLogon,
    ];

    /// Serialized `type` tag of this kind.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::SetDialog => "set_dialog",
            Self::Receipt => "receipt",
            Self::Display => "display",
            Self::Logon => "logon",
            Self::Transaction => "transaction",
            Self::GetLastTransaction => "get_last_transaction",
            Self::ReprintReceipt => "reprint_receipt",
            Self::ControlPanel => "control_panel",
            Self::Settlement => "settlement",
            Self::Status => "status",
            Self::QueryCard => "query_card",
            Self::ChequeAuth => "cheque_auth",
            Self::Slave => "slave",
            Self::ConfigureMerchant => "configure_merchant",
            Self::ClientList => "client_list",
            Self::GetPassword => "get_password",
            Self::CloudLogon => "cloud_logon",
        }
    }

    /// Looks up a kind by its serialized tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Response {
    /// The kind tag of this response.
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::SetDialog(_) => ResponseKind::SetDialog,
            Self::Receipt(_) => ResponseKind::Receipt,
            Self::Display(_) => ResponseKind::Display,
            Self::Logon(_) => ResponseKind::Logon,
            Self::Transaction(_) => ResponseKind::Transaction,
            Self::GetLastTransaction(_) => ResponseKind::GetLastTransaction,
            Self::ReprintReceipt(_) => ResponseKind::ReprintReceipt,
            Self::ControlPanel(_) => ResponseKind::ControlPanel,
            Self::Settlement(_) => ResponseKind::Settlement,
            Self::Status(_) => ResponseKind::Status,
            Self::QueryCard(_) => ResponseKind::QueryCard,
            Self::ChequeAuth(_) => ResponseKind::ChequeAuth,
            Self::Slave(_) => ResponseKind::Slave,
            Self::ConfigureMerchant(_) => ResponseKind::ConfigureMerchant,
            Self::ClientList(_) => ResponseKind::ClientList,
            Self::GetPassword(_) => ResponseKind::GetPassword,
            Self::CloudLogon(_) => ResponseKind::CloudLogon,
        }
    }
}

/// A payload type carried by exactly one [`Response`] variant.
///
/// Lets subscribers register for a concrete record type instead of
/// matching on [`Response`] themselves.
pub trait ResponseVariant: Sized + Send + 'static {
    /// Kind of the variant carrying `Self`.
    const KIND: ResponseKind;

    /// Unwraps the payload if `response` is of kind [`Self::KIND`].
    fn from_response(response: Response) -> Option<Self>;
}

macro_rules! response_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl ResponseVariant for $ty {
                const KIND: ResponseKind = ResponseKind::$variant;

                fn from_response(response: Response) -> Option<Self> {
                    match response {
                        Response::$variant(r) => Some(r),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Response {
                fn from(r: $ty) -> Self {
                    Self::$variant(r)
                }
            }
        )*
    };
}

response_variant! {
    SetDialog => SetDialogResponse,
    Receipt => ReceiptResponse,
    Display => DisplayResponse,
    Logon => LogonResponse,
    Transaction => TransactionResponse,
    GetLastTransaction => GetLastTransactionResponse,
    ReprintReceipt => ReprintReceiptResponse,
    ControlPanel => ControlPanelResponse,
    Settlement => SettlementResponse,
    Status => StatusResponse,
    QueryCard => QueryCardResponse,
    ChequeAuth => ChequeAuthResponse,
    Slave => SlaveResponse,
    ConfigureMerchant => ConfigureMerchantResponse,
    ClientList => ClientListResponse,
    GetPassword => GetPasswordResponse,
    CloudLogon => CloudLogonResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_requests_pair_with_their_response() {
        let req = Request::Transaction(TransactionRequest::default());
        assert!(req.starts_transaction());
        assert_eq!(req.paired_response(), Some(ResponseKind::Transaction));
    }

    #[test]
    fn key_presses_do_not_start_transactions() {
        let req = Request::SendKey(SendKeyRequest::default());
        assert!(!req.starts_transaction());
        assert_eq!(req.paired_response(), None);
        assert!(!Request::SetDialog(SetDialogRequest::hidden()).starts_transaction());
    }

    #[test]
    fn client_list_pairs_without_opening_a_dialog() {
        let req = Request::ClientList(ClientListRequest::default());
        assert!(!req.starts_transaction());
        assert_eq!(req.paired_response(), Some(ResponseKind::ClientList));
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"type":"client_list"}"#
        );
    }

    #[test]
    fn tags_match_serde_names() {
        let samples: Vec<Response> = vec![
            SetDialogResponse::default().into(),
            GetLastTransactionResponse::default().into(),
            ConfigureMerchantResponse::default().into(),
            ChequeAuthResponse::default().into(),
            ClientListResponse::default().into(),
            GetPasswordResponse::default().into(),
            CloudLogonResponse::default().into(),
        ];
        for resp in samples {
            let value = serde_json::to_value(&resp).unwrap();
            assert_eq!(value["type"], resp.kind().tag());
            assert_eq!(ResponseKind::from_tag(resp.kind().tag()), Some(resp.kind()));
        }
    }

    #[test]
    fn variant_projection() {
        let resp: Response = ReceiptResponse {
            is_pre_print: true,
            ..ReceiptResponse::default()
        }
        .into();
        assert!(DisplayResponse::from_response(resp.clone()).is_none());
        assert!(ReceiptResponse::from_response(resp).unwrap().is_pre_print);
    }
}
