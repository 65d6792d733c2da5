//! In-process broker backed by a bounded `tokio::sync::mpsc` channel.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{Broker, BrokerError, MessageHandler};

/// Default channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Single-process broker for wiring the scheduler and sender together in
/// one runtime and for tests.
///
/// Only one consumer runs at a time; a second `consume` call waits until the
/// first one returns.
pub struct MemoryBroker {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Publishers wait once `capacity` messages are queued.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Pop the next queued payload without waiting. Used by tests to
    /// inspect what was published.
    pub async fn try_take(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.try_recv().ok()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        self.tx.send(payload).await.map_err(|_| BrokerError::Closed)
    }

    async fn consume(
        &self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError> {
        let mut rx = self.rx.lock().await;

        loop {
            let payload = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                received = rx.recv() => match received {
                    Some(payload) => payload,
                    None => return Err(BrokerError::Closed),
                },
            };

            handler.handle(&payload).await.map_err(BrokerError::Handler)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
