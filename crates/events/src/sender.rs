//! Consuming side of the notification pipeline.
//!
//! [`Sender`] decodes every message delivered by the broker and appends it
//! to the delivery log. Any failure is fatal: the consume loop stops and
//! the owning process exits so the message can be redelivered.

use std::sync::Arc;

use async_trait::async_trait;
use calendar_core::error::{BoxError, StorageError};
use calendar_core::event::NotificationMessage;
use calendar_core::storage::DeliveryLog;
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, BrokerError, MessageHandler};

#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("failed to decode notification message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to record delivery of event {id}: {source}")]
    Log {
        id: String,
        #[source]
        source: StorageError,
    },
}

pub struct Sender {
    log: Arc<dyn DeliveryLog>,
}

impl Sender {
    pub fn new(log: Arc<dyn DeliveryLog>) -> Self {
        Self { log }
    }

    /// Decode one payload and record it.
    pub async fn deliver(&self, payload: &[u8]) -> Result<NotificationMessage, SenderError> {
        let message: NotificationMessage = serde_json::from_slice(payload)?;

        self.log
            .add_sender_log(&message)
            .await
            .map_err(|source| SenderError::Log {
                id: message.id.clone(),
                source,
            })?;

        tracing::info!(
            event_id = %message.id,
            name = %message.name,
            time = %message.time,
            owner_id = %message.owner_id,
            "Notification received"
        );
        Ok(message)
    }

    /// Consume from `broker` until `cancel` fires or a delivery fails.
    pub async fn run(
        &self,
        broker: &dyn Broker,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError> {
        broker.consume(self, cancel).await
    }
}

#[async_trait]
impl MessageHandler for Sender {
    async fn handle(&self, payload: &[u8]) -> Result<(), BoxError> {
        self.deliver(payload).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use calendar_core::storage::conformance::{anchor, base_date};
    use calendar_core::storage::MemoryDeliveryLog;

    use super::*;
    use crate::broker::MemoryBroker;

    /// Delivery log whose writes always fail.
    struct BrokenLog;

    #[async_trait]
    impl DeliveryLog for BrokenLog {
        async fn add_sender_log(&self, _message: &NotificationMessage) -> Result<(), StorageError> {
            Err(StorageError::backend(std::io::Error::other("disk full")))
        }
    }

    fn message(id: &str) -> NotificationMessage {
        NotificationMessage {
            id: id.into(),
            name: "standup".into(),
            time: anchor(base_date()),
            owner_id: "owner".into(),
        }
    }

    #[tokio::test]
    async fn records_decoded_message() {
        let log = Arc::new(MemoryDeliveryLog::new());
        let sender = Sender::new(log.clone());

        let payload = serde_json::to_vec(&message("evt-1")).unwrap();
        let delivered = sender.deliver(&payload).await.unwrap();
        assert_eq!(delivered, message("evt-1"));

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "evt-1");
        assert_eq!(entries[0].name, "standup");
        assert_eq!(entries[0].time, base_date());
        assert_eq!(entries[0].owner_id, "owner");
    }

    #[tokio::test]
    async fn accepts_wire_field_names() {
        let log = Arc::new(MemoryDeliveryLog::new());
        let sender = Sender::new(log.clone());

        let payload = br#"{"ID":"42","Name":"demo","Time":"2300-01-01T00:00:00Z","OwnerID":"u1"}"#;
        let delivered = sender.deliver(payload).await.unwrap();
        assert_eq!(delivered.id, "42");
        assert_eq!(delivered.time, anchor(base_date()));
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_and_not_logged() {
        let log = Arc::new(MemoryDeliveryLog::new());
        let sender = Sender::new(log.clone());

        let err = sender.deliver(b"not json").await.unwrap_err();
        assert_matches!(err, SenderError::Decode(_));
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn log_failure_is_reported_with_event_id() {
        let sender = Sender::new(Arc::new(BrokenLog));
        let payload = serde_json::to_vec(&message("evt-9")).unwrap();

        let err = sender.deliver(&payload).await.unwrap_err();
        assert_matches!(err, SenderError::Log { ref id, .. } if id == "evt-9");
    }

    #[tokio::test]
    async fn duplicates_are_logged_twice() {
        let log = Arc::new(MemoryDeliveryLog::new());
        let sender = Sender::new(log.clone());
        let broker = MemoryBroker::new();

        let payload = serde_json::to_vec(&message("evt-1")).unwrap();
        broker.publish(payload.clone()).await.unwrap();
        broker.publish(payload).await.unwrap();
        broker.publish(b"{broken".to_vec()).await.unwrap();

        // The malformed third message stops the loop.
        let result = sender.run(&broker, CancellationToken::new()).await;
        assert_matches!(result, Err(BrokerError::Handler(_)));
        assert_eq!(log.entries().await.len(), 2);
    }
}
