//! Scheduler -> broker -> sender wired together in one process.

use std::sync::Arc;
use std::time::Duration;

use calendar_core::event::Event;
use calendar_core::storage::{EventStorage, MemoryDeliveryLog, MemoryStorage};
use calendar_events::{MemoryBroker, NotificationScheduler, SchedulerConfig, Sender};
use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn due_event_reaches_delivery_log_exactly_once() {
    let storage = Arc::new(MemoryStorage::default());
    let broker = Arc::new(MemoryBroker::new());
    let log = Arc::new(MemoryDeliveryLog::new());

    let start = (Utc::now() + ChronoDuration::minutes(30)).fixed_offset();
    let due = Event {
        id: String::new(),
        title: "standup".into(),
        start_time: start,
        end_time: start + ChronoDuration::hours(1),
        description: "daily".into(),
        owner_id: "owner-1".into(),
        notify_before: 1,
        is_sent: false,
    };
    let id = storage.add_event(due).await.unwrap();

    // Far in the future with a short reminder: not due yet.
    let later_start = (Utc::now() + ChronoDuration::days(10)).fixed_offset();
    let later = Event {
        id: String::new(),
        title: "review".into(),
        start_time: later_start,
        end_time: later_start + ChronoDuration::hours(1),
        description: String::new(),
        owner_id: "owner-1".into(),
        notify_before: 2,
        is_sent: false,
    };
    storage.add_event(later).await.unwrap();

    let scheduler = NotificationScheduler::new(
        storage.clone(),
        broker.clone(),
        SchedulerConfig {
            check_interval: Duration::from_millis(20),
            ..SchedulerConfig::default()
        },
    );
    let sender = Sender::new(log.clone());

    let cancel = CancellationToken::new();
    let scheduler_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };
    let sender_task = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { sender.run(broker.as_ref(), cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while log.entries().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("notification delivered");

    // Several more notify ticks must not publish the event again.
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    scheduler_task.await.unwrap();
    sender_task.await.unwrap().unwrap();

    let entries = log.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(entries[0].name, "standup");
    assert_eq!(entries[0].time, start.with_timezone(&Utc));
    assert_eq!(entries[0].owner_id, "owner-1");

    let pending = storage
        .get_events_by_notifier(10, Utc::now() + ChronoDuration::days(30))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1, "only the later event is still pending");
    assert_eq!(pending[0].title, "review");
}
