//! CLI for driving a networked PIN-pad terminal.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pinpad::{
    ClientListRequest, ConnectionParams, ControlPanelRequest, ControlPanelType,
    GetLastTransactionRequest, Key, LogonRequest, LogonType, ReprintReceiptRequest, Request,
    ResponseKind, SettlementRequest, SettlementType, StatusRequest, StatusType,
    TransactionRequest, TxnType,
};
use tracing_subscriber::EnvFilter;

use crate::session::Session;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PINPAD_LOG";

#[derive(Parser)]
#[command(name = "pinpad", version, about = "Drive a networked PIN-pad terminal")]
struct Cli {
    #[command(flatten)]
    conn: ConnArgs,

    #[command(subcommand)]
    command: Command,
}

/// Where the terminal is and how long to wait for it.
#[derive(Args)]
struct ConnArgs {
    /// Terminal host [default: 127.0.0.1].
    #[arg(long, env = "PINPAD_HOST", global = true)]
    host: Option<String>,

    /// Terminal port [default: 2011].
    #[arg(long, env = "PINPAD_PORT", global = true)]
    port: Option<u16>,

    /// JSON file with connection parameters; flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable TCP keep-alive.
    #[arg(long, global = true)]
    keep_alive: bool,

    /// Seconds to wait for the terminal's final reply.
    #[arg(long, default_value_t = 120, global = true)]
    timeout: u64,
}

impl ConnArgs {
    fn params(&self) -> Result<ConnectionParams> {
        let mut params = match &self.config {
            Some(path) => ConnectionParams::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ConnectionParams::default(),
        };
        if let Some(host) = &self.host {
            params.host.clone_from(host);
        }
        if let Some(port) = self.port {
            params.port = port;
        }
        let keep_alive = params.keep_alive || self.keep_alive;
        Ok(params.keep_alive(keep_alive))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Query terminal status.
    Status {
        /// Report application details instead of online status.
        #[arg(long)]
        app_info: bool,
    },

    /// Log the terminal on to its host.
    Logon {
        /// Two-digit merchant code.
        #[arg(long, default_value = "00")]
        merchant: String,

        /// Logon variant.
        #[arg(long, value_enum, default_value_t = LogonArg::Standard)]
        kind: LogonArg,
    },

    /// Run a card transaction.
    #[command(visible_alias = "tx")]
    Txn {
        /// Purchase amount in cents.
        amount: u64,

        /// Cash-out amount in cents.
        #[arg(long, default_value_t = 0)]
        cash: u64,

        /// Transaction type.
        #[arg(long = "type", value_enum, default_value_t = TxnArg::Purchase)]
        txn_type: TxnArg,

        /// POS reference printed on the receipt.
        #[arg(long = "ref", default_value = "")]
        txn_ref: String,

        /// Two-digit merchant code.
        #[arg(long, default_value = "00")]
        merchant: String,
    },

    /// Fetch the outcome of the last transaction.
    LastTxn {
        /// Two-digit merchant code.
        #[arg(long, default_value = "00")]
        merchant: String,
    },

    /// Reprint the last receipt.
    Reprint {
        /// Two-digit merchant code.
        #[arg(long, default_value = "00")]
        merchant: String,
    },

    /// Run a settlement.
    Settle {
        /// Settlement variant.
        #[arg(long, value_enum, default_value_t = SettleArg::Settlement)]
        kind: SettleArg,

        /// Two-digit merchant code.
        #[arg(long, default_value = "00")]
        merchant: String,
    },

    /// Press a key on the terminal's current dialog.
    Key {
        /// Key to press.
        #[arg(value_enum)]
        key: KeyArg,
    },

    /// Send a raw PIN-pad command and print the reply.
    Slave {
        /// Command text.
        command: String,
    },

    /// Hide the terminal's dialogs.
    HideDialogs,

    /// Open the terminal control panel.
    Panel,

    /// List the POS clients attached to the terminal.
    Clients,

    /// Print everything the terminal sends until interrupted.
    Listen,

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TxnArg {
    Purchase,
    Refund,
    CashOut,
    Void,
    PreAuth,
    Completion,
}

impl From<TxnArg> for TxnType {
    fn from(arg: TxnArg) -> Self {
        match arg {
            TxnArg::Purchase => Self::Purchase,
            TxnArg::Refund => Self::Refund,
            TxnArg::CashOut => Self::CashOut,
            TxnArg::Void => Self::Void,
            TxnArg::PreAuth => Self::PreAuth,
            TxnArg::Completion => Self::Completion,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogonArg {
    Standard,
    Rsa,
    TmsFull,
    TmsParams,
    Diagnostics,
}

impl From<LogonArg> for LogonType {
    fn from(arg: LogonArg) -> Self {
        match arg {
            LogonArg::Standard => Self::Standard,
            LogonArg::Rsa => Self::Rsa,
            LogonArg::TmsFull => Self::TmsFull,
            LogonArg::TmsParams => Self::TmsParams,
            LogonArg::Diagnostics => Self::Diagnostics,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SettleArg {
    Settlement,
    PreSettlement,
    LastSettlement,
    SubTotals,
}

impl From<SettleArg> for SettlementType {
    fn from(arg: SettleArg) -> Self {
        match arg {
            SettleArg::Settlement => Self::Settlement,
            SettleArg::PreSettlement => Self::PreSettlement,
            SettleArg::LastSettlement => Self::LastSettlement,
            SettleArg::SubTotals => Self::SubTotals,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyArg {
    Ok,
    Cancel,
    Yes,
    No,
    Authorise,
}

impl From<KeyArg> for Key {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::Ok => Self::Ok,
            KeyArg::Cancel => Self::Cancel,
            KeyArg::Yes => Self::Yes,
            KeyArg::No => Self::No,
            KeyArg::Authorise => Self::Authorise,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    if let Err(e) = Cli::parse().dispatch().await {
        eprintln!("pinpad: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        let (request, done) = match self.command {
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "pinpad",
                    &mut std::io::stdout(),
                );
                return Ok(());
            }
            Command::Listen => return Session::open(self.conn.params()?)?.listen().await,
            Command::HideDialogs => {
                let session = Session::open(self.conn.params()?)?;
                let acked = session.engine().do_hide_dialogs()?;
                println!("{}", serde_json::json!({ "acknowledged": acked }));
                return Ok(());
            }
            Command::Key { key } => {
                let session = Session::open(self.conn.params()?)?;
                session.engine().do_send_key_code(key.into())?;
                return Ok(());
            }
            Command::Status { app_info } => (
                Request::Status(StatusRequest {
                    status_type: if app_info {
                        StatusType::TerminalAppInfo
                    } else {
                        StatusType::Standard
                    },
                    ..StatusRequest::default()
                }),
                ResponseKind::Status,
            ),
            Command::Logon { merchant, kind } => (
                Request::Logon(LogonRequest {
                    merchant,
                    logon_type: kind.into(),
                }),
                ResponseKind::Logon,
            ),
            Command::Txn {
                amount,
                cash,
                txn_type,
                txn_ref,
                merchant,
            } => (
                Request::Transaction(TransactionRequest {
                    merchant,
                    txn_type: txn_type.into(),
                    amt_purchase: amount,
                    amt_cash: cash,
                    txn_ref,
                    ..TransactionRequest::default()
                }),
                ResponseKind::Transaction,
            ),
            Command::LastTxn { merchant } => (
                Request::GetLastTransaction(GetLastTransactionRequest {
                    merchant,
                    ..GetLastTransactionRequest::default()
                }),
                ResponseKind::GetLastTransaction,
            ),
            Command::Reprint { merchant } => (
                Request::ReprintReceipt(ReprintReceiptRequest {
                    merchant,
                    get_last: true,
                }),
                ResponseKind::ReprintReceipt,
            ),
            Command::Settle { kind, merchant } => (
                Request::Settlement(SettlementRequest {
                    merchant,
                    settlement_type: kind.into(),
                    ..SettlementRequest::default()
                }),
                ResponseKind::Settlement,
            ),
            Command::Slave { command } => (
                Request::Slave(pinpad::SlaveRequest {
                    raw_command: command,
                }),
                ResponseKind::Slave,
            ),
            Command::Panel => (
                Request::ControlPanel(ControlPanelRequest {
                    panel: ControlPanelType::Full,
                    ..ControlPanelRequest::default()
                }),
                ResponseKind::ControlPanel,
            ),
            Command::Clients => (
                Request::ClientList(ClientListRequest::default()),
                ResponseKind::ClientList,
            ),
        };

        let timeout = std::time::Duration::from_secs(self.conn.timeout);
        Session::open(self.conn.params()?)?
            .request(request, done, timeout)
            .await
    }
}
