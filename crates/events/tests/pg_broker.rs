//! PostgreSQL broker tests. Run with `--features postgres-tests`.
#![cfg(feature = "postgres-tests")]

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use calendar_core::event::NotificationMessage;
use calendar_core::storage::conformance::{anchor, base_date};
use calendar_core::storage::MemoryDeliveryLog;
use calendar_events::{Broker, BrokerError, PgBroker, Sender};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

fn broker(pool: &PgPool) -> PgBroker {
    PgBroker::from_pool(pool.clone(), "notifications", Duration::from_millis(10))
}

fn payload(id: &str) -> Vec<u8> {
    serde_json::to_vec(&NotificationMessage {
        id: id.into(),
        name: "standup".into(),
        time: anchor(base_date()),
        owner_id: "owner".into(),
    })
    .unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn consumed_messages_are_acknowledged_in_order(pool: PgPool) {
    let broker = broker(&pool);
    broker.publish(payload("a")).await.unwrap();
    broker.publish(payload("b")).await.unwrap();
    assert_eq!(broker.depth().await.unwrap(), 2);

    let log = Arc::new(MemoryDeliveryLog::new());
    let sender = Sender::new(log.clone());
    let cancel = CancellationToken::new();

    let consumer = {
        let cancel = cancel.clone();
        let broker = PgBroker::from_pool(pool.clone(), "notifications", Duration::from_millis(10));
        tokio::spawn(async move { sender.run(&broker, cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while log.entries().await.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    cancel.cancel();
    consumer.await.unwrap().unwrap();

    let ids: Vec<String> = log.entries().await.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(broker.depth().await.unwrap(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_message_stays_queued(pool: PgPool) {
    let broker = broker(&pool);
    broker.publish(b"not json".to_vec()).await.unwrap();

    let log = Arc::new(MemoryDeliveryLog::new());
    let sender = Sender::new(log.clone());
    let result = sender.run(&broker, CancellationToken::new()).await;

    assert_matches!(result, Err(BrokerError::Handler(_)));
    assert!(log.entries().await.is_empty());
    assert_eq!(broker.depth().await.unwrap(), 1);
}
