//! Control channel of the edge tier.
//!
//! A single task owns the receiving end of an `mpsc` queue and handles each
//! [`ControlMessage`] in order. Requests that expect an answer carry their
//! own `oneshot` reply sender.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slidecache_core::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::EdgeCacheService;

/// Store name to entry count, for every open store.
pub type CacheInfo = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResult {
    pub success: bool,
}

#[derive(Debug)]
pub enum ControlMessage {
    AdoptNewVersion,
    GetCacheInfo { reply: oneshot::Sender<Result<CacheInfo, Error>> },
    ClearAllCaches { reply: oneshot::Sender<ClearResult> },
}

impl ControlMessage {
    /// Wire discriminator of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::AdoptNewVersion => "adopt-new-version",
            ControlMessage::GetCacheInfo { .. } => "get-cache-info",
            ControlMessage::ClearAllCaches { .. } => "clear-all-caches",
        }
    }
}

/// Sending side of the control channel.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlHandle {
    /// Fire-and-forget promotion of the waiting generation.
    pub async fn adopt_new_version(&self) -> Result<(), Error> {
        self.tx.send(ControlMessage::AdoptNewVersion).await.map_err(|_| Error::ControlClosed)
    }

    pub async fn cache_info(&self) -> Result<CacheInfo, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(ControlMessage::GetCacheInfo { reply }).await.map_err(|_| Error::ControlClosed)?;
        rx.await.map_err(|_| Error::ControlClosed)?
    }

    pub async fn clear_all_caches(&self) -> Result<ClearResult, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(ControlMessage::ClearAllCaches { reply }).await.map_err(|_| Error::ControlClosed)?;
        rx.await.map_err(|_| Error::ControlClosed)
    }
}

/// Start the control task. It stops once every handle is dropped.
pub fn spawn(edge: EdgeCacheService, buffer: usize) -> (ControlHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ControlMessage>(buffer.max(1));
    let task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            tracing::debug!(message = message.kind(), "control message");
            handle(&edge, message).await;
        }
        tracing::debug!("control channel closed");
    });
    (ControlHandle { tx }, task)
}

async fn handle(edge: &EdgeCacheService, message: ControlMessage) {
    match message {
        ControlMessage::AdoptNewVersion => match edge.adopt_new_version().await {
            Ok(promoted) => tracing::info!(promoted, "adopt-new-version handled"),
            Err(err) => tracing::warn!(error = %err, "adopt-new-version failed"),
        },
        ControlMessage::GetCacheInfo { reply } => {
            let info = edge.db().store_counts().await.map(|counts| counts.into_iter().collect::<CacheInfo>());
            if reply.send(info).is_err() {
                tracing::debug!("get-cache-info requester went away");
            }
        }
        ControlMessage::ClearAllCaches { reply } => {
            let success = match edge.db().delete_all_stores().await {
                Ok(deleted) => {
                    tracing::info!(deleted, "all caches cleared");
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "clear-all-caches failed");
                    false
                }
            };
            if reply.send(ClearResult { success }).is_err() {
                tracing::debug!("clear-all-caches requester went away");
            }
        }
    }
}
