use super::auth::{authenticate, HandshakeParams};
use super::codec::{RpcFrame, RpcResponse, SignedRequest};
use super::registry::{FrameDisposition, Outbound, PendingRegistry};
use super::rpc::RpcMessageFactory;
use super::signer::EcdsaSigner;
use crate::core::config::ClearNodeConfig;
use crate::core::errors::ClearNodeError;
use crate::core::kernel::signer::MessageSigner;
use crate::core::kernel::ws::{WsConfig, WsConnector, WsSink, WsStream};
use crate::core::types::{ConnectionStatus, StatusCallback};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Message reported when the transport could not be opened
pub const TRANSPORT_FAILURE: &str = "WebSocket connection failed";

const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
}

/// Current status plus the callback that observes every transition.
///
/// Transitions are serialized: the callback sees them in the order they were
/// stored. The callback must not report a transition itself.
pub struct StatusTracker {
    state: Mutex<ConnectionState>,
    order: Mutex<()>,
    callback: StatusCallback,
}

impl StatusTracker {
    pub fn new(callback: StatusCallback) -> Self {
        Self {
            state: Mutex::new(ConnectionState::default()),
            order: Mutex::new(()),
            callback,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, status: ConnectionStatus, error: Option<&str>) {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.lock();
            state.status = status;
            if let Some(message) = error {
                state.last_error = Some(message.to_string());
            }
        }
        (self.callback)(status, error);
    }

    pub fn set(&self, status: ConnectionStatus) {
        debug!(%status, "Connection status changed");
        self.transition(status, None);
    }

    pub fn fail(&self, message: &str) {
        warn!(error = %message, "Connection failed");
        self.transition(ConnectionStatus::Error, Some(message));
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.lock().clone()
    }
}

/// An open, authenticated ClearNode connection.
///
/// Owns the transport's reader and writer tasks; dropping the connection
/// aborts both.
pub struct ClearNodeConnection {
    registry: Arc<PendingRegistry>,
    messages: RpcMessageFactory,
    signer: Arc<dyn MessageSigner>,
    status: Arc<StatusTracker>,
    events: broadcast::Sender<RpcResponse>,
    outbound: mpsc::Sender<Outbound>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    node_url: String,
}

impl ClearNodeConnection {
    pub fn registry(&self) -> &PendingRegistry {
        &self.registry
    }

    pub fn messages(&self) -> &RpcMessageFactory {
        &self.messages
    }

    pub fn signer(&self) -> &dyn MessageSigner {
        self.signer.as_ref()
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.status()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.last_error()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.snapshot()
    }

    /// Unsolicited frames: broadcasts and replies nobody is waiting for
    pub fn subscribe_events(&self) -> broadcast::Receiver<RpcResponse> {
        self.events.subscribe()
    }

    pub async fn request(
        &self,
        request: &SignedRequest,
        timeout: Option<Duration>,
    ) -> Result<RpcResponse, ClearNodeError> {
        self.registry.dispatch(request, timeout).await
    }

    /// Close the transport and wait for the reader to observe it
    #[instrument(skip(self), fields(node = %self.node_url))]
    pub async fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close).await;

        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }

        if let Some(mut reader) = self.reader.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
                reader.abort();
                if self.status.status() != ConnectionStatus::Disconnected {
                    self.status.set(ConnectionStatus::Disconnected);
                }
            }
        }
    }
}

impl Drop for ClearNodeConnection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

/// Open the transport, authenticate, and hand back a usable connection.
///
/// Reports `connecting`, `authenticating` and `connected` through `on_status`.
/// Any failure reports `error`, closes the transport and returns the error;
/// the caller must start over with a fresh `connect`.
#[instrument(skip_all, fields(node = %config.node_url))]
pub async fn connect<C: WsConnector>(
    connector: &C,
    config: &ClearNodeConfig,
    ws_config: &WsConfig,
    on_status: StatusCallback,
) -> Result<ClearNodeConnection, ClearNodeError> {
    let status = Arc::new(StatusTracker::new(on_status));
    status.set(ConnectionStatus::Connecting);

    let (sink, stream) = match connector.connect(&config.node_url).await {
        Ok(halves) => halves,
        Err(e) => {
            warn!(error = %e, "Transport open failed");
            status.fail(TRANSPORT_FAILURE);
            return Err(e);
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(ws_config.outbound_buffer_size.max(1));
    let (events, _) = broadcast::channel(ws_config.event_buffer_size.max(1));
    let registry = Arc::new(PendingRegistry::new(
        outbound_tx.clone(),
        config.request_timeout(),
    ));

    let writer = tokio::spawn(run_writer(sink, outbound_rx));
    let reader = tokio::spawn(run_reader(
        stream,
        registry.clone(),
        events.clone(),
        status.clone(),
        config.fail_pending_on_close,
    ));

    let signer = match EcdsaSigner::from_private_key(config.private_key()) {
        Ok(signer) => Arc::new(signer),
        Err(e) => {
            status.fail(&e.to_string());
            shutdown(outbound_tx, writer, reader).await;
            return Err(e);
        }
    };

    status.set(ConnectionStatus::Authenticating);

    let messages = RpcMessageFactory::new();
    let handshake = HandshakeParams {
        application: config.application.clone(),
        scope: config.scope.clone(),
        session_ttl_secs: config.session_ttl_secs,
    };

    if let Err(e) = authenticate(&registry, &messages, signer.as_ref(), &handshake).await {
        status.fail(&e.to_string());
        shutdown(outbound_tx, writer, reader).await;
        return Err(e);
    }

    status.set(ConnectionStatus::Connected);
    info!(address = %signer.address(), "Connected to ClearNode");

    Ok(ClearNodeConnection {
        registry,
        messages,
        signer,
        status,
        events,
        outbound: outbound_tx,
        reader: Some(reader),
        writer: Some(writer),
        node_url: config.node_url.clone(),
    })
}

async fn shutdown(outbound: mpsc::Sender<Outbound>, writer: JoinHandle<()>, mut reader: JoinHandle<()>) {
    let _ = outbound.send(Outbound::Close).await;
    let _ = writer.await;
    if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
        reader.abort();
    }
}

async fn run_writer<K: WsSink>(mut sink: K, mut outbound: mpsc::Receiver<Outbound>) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(message) => {
                if let Err(e) = sink.send_raw(message).await {
                    warn!(error = %e, "Failed to send frame");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }

    if let Err(e) = sink.close().await {
        warn!(error = %e, "Failed to close transport");
    }
}

async fn run_reader<S: WsStream>(
    mut stream: S,
    registry: Arc<PendingRegistry>,
    events: broadcast::Sender<RpcResponse>,
    status: Arc<StatusTracker>,
    fail_pending_on_close: bool,
) {
    loop {
        match stream.next_raw().await {
            Some(Ok(message)) => {
                if let FrameDisposition::Unmatched(RpcFrame::Response(response)) =
                    registry.handle_message(message)
                {
                    // no subscribers is fine
                    let _ = events.send(response);
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "Transport error");
                break;
            }
            None => break,
        }
    }

    // a handshake in flight can never complete once the peer is gone
    let handshaking = !status.status().is_usable();
    status.set(ConnectionStatus::Disconnected);

    if fail_pending_on_close || handshaking {
        let failed = registry.fail_all("transport closed");
        if failed > 0 {
            debug!(failed, "Failed pending requests on close");
        }
    }
}
