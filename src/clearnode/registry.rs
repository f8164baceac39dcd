//! Pending-request registry.
//!
//! Every request sent on a connection registers a one-shot completion under
//! its request id. The connection's reader task feeds each inbound frame to
//! [`PendingRegistry::handle_message`], which settles the matching entry.
//! Entries leave the map exactly once: on settlement, on timeout, or when the
//! awaiting future is dropped.

use super::codec::{ClearNodeCodec, RpcFrame, RpcResponse, SignedRequest};
use crate::core::errors::ClearNodeError;
use crate::core::kernel::codec::WsCodec;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

type Settlement = Result<RpcResponse, ClearNodeError>;

/// Command consumed by the connection's writer task
#[derive(Debug)]
pub enum Outbound {
    Frame(Message),
    Close,
}

/// What the registry did with an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDisposition {
    /// Settled the pending request with this id
    Settled(u64),
    /// Well-formed, but nothing is waiting for it
    Unmatched(RpcFrame),
    /// Not JSON, or not a correlatable envelope
    Ignored,
}

pub struct PendingRegistry {
    pending: Mutex<HashMap<u64, oneshot::Sender<Settlement>>>,
    outbound: mpsc::Sender<Outbound>,
    codec: ClearNodeCodec,
    default_timeout: Duration,
}

/// Removes the entry if the awaiting future is dropped before settlement
struct PendingGuard<'a> {
    registry: &'a PendingRegistry,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.registry.take(self.id).is_some() {
            trace!(request_id = self.id, "Pending request abandoned by caller");
        }
    }
}

impl PendingRegistry {
    pub fn new(outbound: mpsc::Sender<Outbound>, default_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            outbound,
            codec: ClearNodeCodec::new(),
            default_timeout,
        }
    }

    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Settlement>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, id: u64) -> Option<oneshot::Sender<Settlement>> {
        self.lock().remove(&id)
    }

    fn register(&self, id: u64) -> Result<oneshot::Receiver<Settlement>, ClearNodeError> {
        let (tx, rx) = oneshot::channel();
        match self.lock().entry(id) {
            Entry::Occupied(_) => Err(ClearNodeError::DuplicateRequestId(id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Submit a raw text frame and wait for its response with the default timeout
    pub async fn submit(&self, raw: String) -> Settlement {
        self.submit_with_timeout(raw, self.default_timeout).await
    }

    /// Submit a raw text frame; the request id is read from `req[0]`
    pub async fn submit_with_timeout(&self, raw: String, timeout: Duration) -> Settlement {
        let envelope: Value = serde_json::from_str(&raw)
            .map_err(|e| ClearNodeError::malformed(format!("outbound frame is not JSON: {}", e)))?;
        let id = envelope
            .get("req")
            .and_then(|req| req.get(0))
            .and_then(Value::as_u64)
            .ok_or_else(|| ClearNodeError::malformed("outbound frame has no request id"))?;

        self.submit_message(id, Message::Text(raw), timeout).await
    }

    /// Encode and submit a constructed request
    pub async fn dispatch(&self, request: &SignedRequest, timeout: Option<Duration>) -> Settlement {
        let message = self.codec.encode_request(request)?;
        self.submit_message(
            request.id(),
            message,
            timeout.unwrap_or(self.default_timeout),
        )
        .await
    }

    async fn submit_message(&self, id: u64, message: Message, timeout: Duration) -> Settlement {
        let mut rx = self.register(id)?;
        let guard = PendingGuard { registry: self, id };

        if self.outbound.send(Outbound::Frame(message)).await.is_err() {
            return Err(ClearNodeError::closed("transport is not running"));
        }
        trace!(request_id = id, "Request sent");

        let outcome = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(settlement)) => settlement,
            Ok(Err(_)) => Err(ClearNodeError::closed("pending request dropped")),
            Err(_) => {
                if self.take(id).is_some() {
                    debug!(request_id = id, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                    Err(ClearNodeError::timeout(id, timeout.as_millis() as u64))
                } else {
                    // settled between the deadline and the removal
                    rx.try_recv().unwrap_or_else(|_| {
                        Err(ClearNodeError::timeout(id, timeout.as_millis() as u64))
                    })
                }
            }
        };

        drop(guard);
        outcome
    }

    /// Route one inbound text frame
    pub fn handle_frame(&self, text: &str) -> FrameDisposition {
        self.handle_message(Message::Text(text.to_string()))
    }

    /// Route one inbound message to the pending request it answers
    pub fn handle_message(&self, message: Message) -> FrameDisposition {
        let frame = match self.codec.decode_message(message) {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameDisposition::Ignored,
            Err(e) => {
                trace!(error = %e, "Ignoring undecodable frame");
                return FrameDisposition::Ignored;
            }
        };

        let id = frame.request_id();
        let Some(tx) = self.take(id) else {
            trace!(request_id = id, "No pending request for frame");
            return FrameDisposition::Unmatched(frame);
        };

        let settlement = match frame {
            RpcFrame::Response(response) => Ok(response),
            RpcFrame::Error(failure) => Err(failure.into()),
        };
        // the caller may have stopped waiting; nothing else to do then
        let _ = tx.send(settlement);
        debug!(request_id = id, "Request settled");
        FrameDisposition::Settled(id)
    }

    /// Fail every pending request with `ConnectionClosed`
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (id, tx) in drained {
            trace!(request_id = id, "Failing pending request");
            let _ = tx.send(Err(ClearNodeError::closed(reason)));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
