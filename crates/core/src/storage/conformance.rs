//! Backend-agnostic behaviour checks for [`EventStorage`] implementations.
//!
//! Each function expects a fresh, empty store and panics on the first
//! violated expectation. The memory backend runs them as unit tests; the
//! PostgreSQL backend runs them from `calendar-db`'s integration tests.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use super::EventStorage;
use crate::error::StorageError;
use crate::event::Event;
use crate::types::{Anchor, Timestamp};

/// 2300-01-01T00:00:00Z, a Monday far enough in the future for every
/// "start must be in the future" check.
pub fn base_date() -> Timestamp {
    Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0)
        .single()
        .expect("valid base date")
}

/// Express a UTC instant as a zero-offset calendar anchor.
pub fn anchor(t: Timestamp) -> Anchor {
    t.fixed_offset()
}

/// A one-hour event starting at `start` without notification.
pub fn sample_event(start: Timestamp) -> Event {
    Event {
        id: String::new(),
        title: "test".into(),
        start_time: anchor(start),
        end_time: anchor(start + Duration::hours(1)),
        description: "description".into(),
        owner_id: "testId".into(),
        notify_before: 0,
        is_sent: false,
    }
}

fn ids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}

pub async fn rejects_invalid_times(store: &dyn EventStorage) {
    let base = base_date();

    let mut reversed = sample_event(base + Duration::hours(1));
    reversed.end_time = anchor(base);
    let mut empty = sample_event(base);
    empty.end_time = anchor(base);
    let past = sample_event(Utc::now() - Duration::minutes(1));

    for bad in [reversed, empty, past] {
        let err = store.add_event(bad.clone()).await.unwrap_err();
        assert!(
            matches!(err, StorageError::IncorrectEventTime(_)),
            "add: expected IncorrectEventTime, got {err:?}"
        );

        // Time validation runs before the existence check.
        let err = store.update_event("missing", bad).await.unwrap_err();
        assert!(
            matches!(err, StorageError::IncorrectEventTime(_)),
            "update: expected IncorrectEventTime, got {err:?}"
        );
    }

    let week = store.get_events_for_week(anchor(base)).await.unwrap();
    assert!(week.is_empty(), "rejected events must not be stored");
}

pub async fn add_assigns_id_and_round_trips(store: &dyn EventStorage) {
    let base = base_date();
    let input = sample_event(base + Duration::hours(1));

    let id = store.add_event(input.clone()).await.unwrap();
    assert!(!id.is_empty(), "store must assign an id");

    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(day.len(), 1);

    let expected = Event { id, ..input };
    assert_eq!(day[0], expected);

    let next_day = store
        .get_events_for_day(anchor(base + Duration::days(1)))
        .await
        .unwrap();
    assert!(next_day.is_empty());
}

pub async fn duplicate_id_leaves_original_untouched(store: &dyn EventStorage) {
    let base = base_date();
    let mut original = sample_event(base + Duration::hours(1));
    original.id = "fixed-id".into();
    assert_eq!(store.add_event(original.clone()).await.unwrap(), "fixed-id");

    let mut clash = sample_event(base + Duration::hours(5));
    clash.id = "fixed-id".into();
    clash.title = "intruder".into();
    let err = store.add_event(clash).await.unwrap_err();
    assert!(
        matches!(err, StorageError::DuplicateEventId { ref id } if id == "fixed-id"),
        "expected DuplicateEventId, got {err:?}"
    );

    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(day, vec![original]);
}

pub async fn update_replaces_fields_and_keeps_id(store: &dyn EventStorage) {
    let base = base_date();
    let id = store
        .add_event(sample_event(base + Duration::hours(1)))
        .await
        .unwrap();

    let updated = Event {
        id: "ignored".into(),
        title: "updated title".into(),
        start_time: anchor(base + Duration::hours(2) + Duration::minutes(21)),
        end_time: anchor(base + Duration::hours(2) + Duration::minutes(33)),
        description: "updated description".into(),
        owner_id: "someone else".into(),
        notify_before: 100,
        is_sent: false,
    };
    store.update_event(&id, updated.clone()).await.unwrap();

    let week = store.get_events_for_week(anchor(base)).await.unwrap();
    assert_eq!(week, vec![Event { id, ..updated }]);
}

pub async fn caller_offset_survives_round_trip(store: &dyn EventStorage) {
    let base = base_date();
    let plus_two = FixedOffset::east_opt(2 * 3600).expect("valid offset");
    let minus_five = FixedOffset::east_opt(-5 * 3600).expect("valid offset");

    let mut event = sample_event(base);
    event.id = "zoned".into();
    event.start_time = (base + Duration::hours(1)).with_timezone(&plus_two);
    event.end_time = (base + Duration::hours(2)).with_timezone(&minus_five);
    store.add_event(event.clone()).await.unwrap();

    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(day, vec![event.clone()]);
    assert_eq!(day[0].start_time.offset(), &plus_two);
    assert_eq!(day[0].end_time.offset(), &minus_five);
    assert_eq!(day[0].start_time.to_rfc3339(), "2300-01-01T03:00:00+02:00");

    // Updates replace the stored offsets too.
    event.start_time = event.start_time.with_timezone(&minus_five);
    store.update_event("zoned", event).await.unwrap();
    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(day[0].start_time.offset(), &minus_five);
}

pub async fn update_and_remove_missing_event(store: &dyn EventStorage) {
    let base = base_date();
    let err = store
        .update_event("___not_exists___", sample_event(base))
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorageError::NotFoundEvent { ref id } if id == "___not_exists___"),
        "update: expected NotFoundEvent, got {err:?}"
    );

    let err = store.remove_event("___not_exists___").await.unwrap_err();
    assert!(
        matches!(err, StorageError::NotFoundEvent { .. }),
        "remove: expected NotFoundEvent, got {err:?}"
    );
}

pub async fn remove_deletes_event(store: &dyn EventStorage) {
    let base = base_date();
    let id = store
        .add_event(sample_event(base + Duration::hours(1)))
        .await
        .unwrap();

    store.remove_event(&id).await.unwrap();

    let week = store.get_events_for_week(anchor(base)).await.unwrap();
    assert!(week.is_empty());
    assert!(store.remove_event(&id).await.is_err());
}

pub async fn day_range_is_half_open(store: &dyn EventStorage) {
    let base = base_date();
    let at_midnight = store.add_event(sample_event(base)).await.unwrap();
    let last_second = store
        .add_event(sample_event(base + Duration::days(1) - Duration::seconds(1)))
        .await
        .unwrap();
    let next_midnight = store
        .add_event(sample_event(base + Duration::days(1)))
        .await
        .unwrap();

    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(ids(&day), vec![at_midnight.as_str(), last_second.as_str()]);

    let next = store
        .get_events_for_day(anchor(base + Duration::days(1)))
        .await
        .unwrap();
    assert_eq!(ids(&next), vec![next_midnight.as_str()]);

    // In UTC+3 the day of 2300-01-01 ends at 21:00 UTC.
    let plus_three = FixedOffset::east_opt(3 * 3600).expect("valid offset");
    let local_day = base.with_timezone(&plus_three);
    let local = store.get_events_for_day(local_day).await.unwrap();
    assert_eq!(ids(&local), vec![at_midnight.as_str()]);
    let previous_local: DateTime<FixedOffset> = local_day - Duration::days(1);
    assert!(store
        .get_events_for_day(previous_local)
        .await
        .unwrap()
        .is_empty());
}

pub async fn period_anchors_must_be_aligned(store: &dyn EventStorage) {
    let monday = |y, m, d| {
        anchor(
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
                .single()
                .expect("valid date"),
        )
    };

    for ok in [monday(2021, 12, 6), monday(2300, 1, 8), monday(2300, 1, 29)] {
        assert!(store.get_events_for_week(ok).await.is_ok(), "{ok} is a Monday");
    }
    assert!(store.get_events_for_month(monday(2300, 1, 1)).await.is_ok());

    let err = store
        .get_events_for_week(monday(2300, 1, 2))
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorageError::IncorrectStartDate { .. }),
        "week: expected IncorrectStartDate, got {err:?}"
    );
    let err = store
        .get_events_for_month(monday(2300, 1, 2))
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorageError::IncorrectStartDate { .. }),
        "month: expected IncorrectStartDate, got {err:?}"
    );
}

pub async fn daily_events_counted_per_period(store: &dyn EventStorage) {
    let base = base_date();
    for day in 0..60 {
        let mut event = sample_event(base + Duration::days(day));
        event.end_time = event.start_time + Duration::hours(2);
        store.add_event(event).await.unwrap();
    }

    let day = store.get_events_for_day(anchor(base)).await.unwrap();
    assert_eq!(day.len(), 1);

    let week = store.get_events_for_week(anchor(base)).await.unwrap();
    assert_eq!(week.len(), 7);

    let january = store.get_events_for_month(anchor(base)).await.unwrap();
    assert_eq!(january.len(), 31);

    // 2300 is not a leap year.
    let february = store
        .get_events_for_month(anchor(base + Duration::days(31)))
        .await
        .unwrap();
    assert_eq!(february.len(), 28);

    let starts: Vec<Timestamp> = january.iter().map(Event::start_utc).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted, "range results are ordered by start time");
}

pub async fn notifier_skips_sent_events(store: &dyn EventStorage) {
    let now = Utc::now();
    let mut event = sample_event(now + Duration::hours(2));
    event.notify_before = 1;
    let id = store.add_event(event).await.unwrap();

    let early = store
        .get_events_by_notifier(100, now + Duration::minutes(30))
        .await
        .unwrap();
    assert!(early.is_empty(), "window has not opened yet");

    let cutoff = now + Duration::hours(1) + Duration::minutes(1);
    let due = store.get_events_by_notifier(100, cutoff).await.unwrap();
    assert_eq!(ids(&due), vec![id.as_str()]);

    store.mark_sent_events(&[id.clone()]).await.unwrap();

    for later in [cutoff, cutoff + Duration::days(1)] {
        let again = store.get_events_by_notifier(100, later).await.unwrap();
        assert!(again.is_empty(), "sent events are never selected again");
    }

    // The event itself is still there, only flagged.
    let day = store.get_events_for_day(anchor(now + Duration::hours(2))).await.unwrap();
    assert!(day.iter().any(|e| e.id == id));
}

pub async fn notifier_honours_limit_and_order(store: &dyn EventStorage) {
    let base = base_date();
    let mut expected = Vec::new();
    for hour in (0..5).rev() {
        let mut event = sample_event(base + Duration::hours(hour));
        event.notify_before = 1;
        expected.push(store.add_event(event).await.unwrap());
    }
    let silent = sample_event(base + Duration::minutes(30));
    store.add_event(silent).await.unwrap();
    expected.reverse();

    let cutoff = base + Duration::days(1);
    let first = store.get_events_by_notifier(3, cutoff).await.unwrap();
    assert_eq!(ids(&first), expected[..3].iter().map(String::as_str).collect::<Vec<_>>());

    let again = store.get_events_by_notifier(3, cutoff).await.unwrap();
    assert_eq!(first, again, "selection is deterministic on a stable store");

    let all = store.get_events_by_notifier(100, cutoff).await.unwrap();
    assert_eq!(all.len(), 5, "events without notify_before are excluded");
}

pub async fn mark_sent_only_touches_listed_ids(store: &dyn EventStorage) {
    let base = base_date();
    let mut a = sample_event(base + Duration::hours(1));
    a.notify_before = 2;
    let mut b = sample_event(base + Duration::hours(3));
    b.notify_before = 2;
    let a = store.add_event(a).await.unwrap();
    let b = store.add_event(b).await.unwrap();

    store
        .mark_sent_events(&[a.clone(), "no-such-event".into()])
        .await
        .unwrap();
    store.mark_sent_events(&[]).await.unwrap();

    let due = store
        .get_events_by_notifier(100, base + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(ids(&due), vec![b.as_str()]);
}

pub async fn update_rearms_notification(store: &dyn EventStorage) {
    let base = base_date();
    let mut event = sample_event(base + Duration::hours(4));
    event.notify_before = 1;
    let id = store.add_event(event.clone()).await.unwrap();
    store.mark_sent_events(&[id.clone()]).await.unwrap();

    event.start_time = anchor(base + Duration::hours(6));
    event.end_time = anchor(base + Duration::hours(7));
    store.update_event(&id, event).await.unwrap();

    let due = store
        .get_events_by_notifier(100, base + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(ids(&due), vec![id.as_str()]);
}
