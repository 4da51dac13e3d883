//! A connected engine whose callbacks feed an async channel.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pinpad::{
    ChequeAuthResponse, ClientListResponse, CloudLogonResponse, ConfigureMerchantResponse,
    ConnectionParams, ControlPanelResponse, DisplayResponse, Engine, GetLastTransactionResponse,
    GetPasswordResponse, LogonResponse, QueryCardResponse, ReceiptResponse, ReprintReceiptResponse,
    Request, Response, ResponseKind, ResponseVariant, SettlementResponse, SlaveResponse,
    SocketEvent, StatusResponse, TransactionResponse,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// What the engine reports back to the CLI.
enum Event {
    Response(Response),
    Closed(String),
}

pub(crate) struct Session {
    engine: Engine,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Session {
    /// Builds an engine for `params`, wires every subscriber, and connects.
    pub(crate) fn open(params: ConnectionParams) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(host = %params.host, port = params.port, "opening session");
        let engine = Engine::builder().params(params).build();

        forward::<ReceiptResponse>(&engine, &tx);
        forward::<DisplayResponse>(&engine, &tx);
        forward::<LogonResponse>(&engine, &tx);
        forward::<TransactionResponse>(&engine, &tx);
        forward::<GetLastTransactionResponse>(&engine, &tx);
        forward::<ReprintReceiptResponse>(&engine, &tx);
        forward::<ControlPanelResponse>(&engine, &tx);
        forward::<SettlementResponse>(&engine, &tx);
        forward::<StatusResponse>(&engine, &tx);
        forward::<QueryCardResponse>(&engine, &tx);
        forward::<ChequeAuthResponse>(&engine, &tx);
        forward::<SlaveResponse>(&engine, &tx);
        forward::<ConfigureMerchantResponse>(&engine, &tx);
        forward::<ClientListResponse>(&engine, &tx);
        forward::<GetPasswordResponse>(&engine, &tx);
        forward::<CloudLogonResponse>(&engine, &tx);

        engine.on_socket_event(move |event| match event {
            SocketEvent::Sent(text) => debug!(%text, "sent"),
            SocketEvent::Received(text) => debug!(%text, "received"),
            SocketEvent::Failed { cause, message } => warn!(%cause, %message, "socket failure"),
            SocketEvent::Terminated(reason) => {
                info!(%reason, "connection closed");
                let _ = tx.send(Event::Closed(reason.clone()));
            }
            _ => {}
        });

        engine.connect().context("failed to connect to terminal")?;
        Ok(Self { engine, rx })
    }

    pub(crate) const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Issues `request` and prints every response until one of kind `done`.
    pub(crate) async fn request(
        mut self,
        request: Request,
        done: ResponseKind,
        timeout: Duration,
    ) -> Result<()> {
        self.engine.do_request(request)?;
        let deadline = Instant::now() + timeout;
        loop {
            let event = timeout_at(deadline, self.rx.recv())
                .await
                .map_err(|_| anyhow!("no {done} response within {}s", timeout.as_secs()))?
                .context("engine stopped")?;
            match event {
                Event::Response(response) => {
                    println!("{}", serde_json::to_string(&response)?);
                    if response.kind() == done {
                        break;
                    }
                }
                Event::Closed(reason) => return Err(anyhow!("terminal closed the connection: {reason}")),
            }
        }
        self.engine.disconnect();
        Ok(())
    }

    /// Prints responses until interrupted or disconnected.
    pub(crate) async fn listen(mut self) -> Result<()> {
        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(Event::Response(response)) => println!("{}", serde_json::to_string(&response)?),
                    Some(Event::Closed(reason)) => {
                        eprintln!("connection closed: {reason}");
                        return Ok(());
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        self.engine.disconnect();
        Ok(())
    }
}

/// Forwards responses of kind `T` into the channel.
fn forward<T>(engine: &Engine, tx: &mpsc::UnboundedSender<Event>)
where
    T: ResponseVariant + Into<Response>,
{
    let tx = tx.clone();
    engine.subscribe(move |r: T| {
        let _ = tx.send(Event::Response(r.into()));
    });
}
