//! In-memory ClearNode peer for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use clearnode::core::kernel::ws::{WsConnector, WsSink, WsStream};
use clearnode::{ClearNodeConfig, ClearNodeError, ConnectionStatus};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const CHALLENGE: &str = "3f7a1c2e-challenge";

const SERVER_TS: u64 = 1_700_000_000_000;

pub fn test_config() -> ClearNodeConfig {
    ClearNodeConfig::new(TEST_KEY.to_string()).node_url("ws://clearnode.test/ws")
}

pub fn res(id: u64, method: &str, result: Value) -> Value {
    json!({ "res": [id, method, result, SERVER_TS] })
}

pub fn err(id: u64, code: i64, message: &str) -> Value {
    json!({ "err": [id, code, message, SERVER_TS] })
}

/// What the peer does with one inbound request
pub enum Reply {
    Respond(Value),
    Frames(Vec<Value>),
    Ignore,
    Hangup,
}

pub type Handler = Arc<dyn Fn(&str, u64, &Value) -> Reply + Send + Sync>;

/// Records every status transition reported by a connection
#[derive(Clone, Default)]
pub struct StatusLog {
    seen: Arc<Mutex<Vec<(ConnectionStatus, Option<String>)>>>,
}

impl StatusLog {
    pub fn callback(&self) -> impl Fn(ConnectionStatus, Option<&str>) + Send + Sync + 'static {
        let seen = self.seen.clone();
        move |status: ConnectionStatus, error: Option<&str>| {
            seen.lock()
                .unwrap()
                .push((status, error.map(str::to_string)));
        }
    }

    pub fn entries(&self) -> Vec<(ConnectionStatus, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.entries().into_iter().map(|(status, _)| status).collect()
    }
}

/// Connector whose peer is a task answering requests through a handler
#[derive(Clone)]
pub struct MockConnector {
    handler: Handler,
    requests: Arc<Mutex<Vec<Value>>>,
    to_client: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
}

impl MockConnector {
    /// Every request, including the handshake, goes to `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, u64, &Value) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
            to_client: Arc::new(Mutex::new(None)),
        }
    }

    /// Completes the handshake and hands everything else to `handler`
    pub fn scripted<F>(handler: F) -> Self
    where
        F: Fn(&str, u64, &Value) -> Reply + Send + Sync + 'static,
    {
        Self::new(move |method: &str, id: u64, params: &Value| match method {
            "auth_request" => Reply::Respond(res(
                id,
                "auth_challenge",
                json!([{ "challenge_message": CHALLENGE }]),
            )),
            "auth_verify" => Reply::Respond(res(
                id,
                "auth_verify",
                json!({ "address": TEST_ADDRESS, "success": true }),
            )),
            _ => handler(method, id, params),
        })
    }

    /// Envelopes received so far, in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|envelope| envelope["req"][1].as_str().map(str::to_string))
            .collect()
    }

    /// Send an unsolicited frame to the client
    pub fn push(&self, frame: Value) {
        if let Some(tx) = self.to_client.lock().unwrap().as_ref() {
            let _ = tx.send(Message::Text(frame.to_string()));
        }
    }
}

pub struct MockSink {
    tx: mpsc::UnboundedSender<Message>,
}

pub struct MockStream {
    rx: mpsc::UnboundedReceiver<Message>,
}

#[async_trait]
impl WsSink for MockSink {
    async fn send_raw(&mut self, msg: Message) -> Result<(), ClearNodeError> {
        self.tx
            .send(msg)
            .map_err(|_| ClearNodeError::NetworkError("mock peer is gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), ClearNodeError> {
        let _ = self.tx.send(Message::Close(None));
        Ok(())
    }
}

#[async_trait]
impl WsStream for MockStream {
    async fn next_raw(&mut self) -> Option<Result<Message, ClearNodeError>> {
        match self.rx.recv().await? {
            Message::Close(_) => None,
            message => Some(Ok(message)),
        }
    }
}

#[async_trait]
impl WsConnector for MockConnector {
    type Sink = MockSink;
    type Stream = MockStream;

    async fn connect(&self, _url: &str) -> Result<(MockSink, MockStream), ClearNodeError> {
        let (client_tx, mut server_rx) = mpsc::unbounded_channel::<Message>();
        let (server_tx, client_rx) = mpsc::unbounded_channel::<Message>();
        *self.to_client.lock().unwrap() = Some(server_tx.clone());

        let handler = self.handler.clone();
        let requests = self.requests.clone();
        tokio::spawn(async move {
            while let Some(message) = server_rx.recv().await {
                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        let _ = server_tx.send(Message::Close(None));
                        return;
                    }
                    _ => continue,
                };

                let envelope: Value = serde_json::from_str(&text).unwrap();
                requests.lock().unwrap().push(envelope.clone());

                let id = envelope["req"][0].as_u64().unwrap();
                let method = envelope["req"][1].as_str().unwrap_or_default().to_string();
                let params = envelope["req"][2].clone();

                match handler(&method, id, &params) {
                    Reply::Respond(frame) => {
                        let _ = server_tx.send(Message::Text(frame.to_string()));
                    }
                    Reply::Frames(frames) => {
                        for frame in frames {
                            let _ = server_tx.send(Message::Text(frame.to_string()));
                        }
                    }
                    Reply::Ignore => {}
                    Reply::Hangup => {
                        let _ = server_tx.send(Message::Close(None));
                        return;
                    }
                }
            }
        });

        Ok((MockSink { tx: client_tx }, MockStream { rx: client_rx }))
    }
}

/// Connector whose transport never opens
pub struct FailingConnector;

#[async_trait]
impl WsConnector for FailingConnector {
    type Sink = MockSink;
    type Stream = MockStream;

    async fn connect(&self, url: &str) -> Result<(MockSink, MockStream), ClearNodeError> {
        Err(ClearNodeError::NetworkError(format!(
            "connection refused: {}",
            url
        )))
    }
}
