//! Integration tests for the event endpoints.

mod common;

use axum::http::StatusCode;
use calendar_core::storage::EventStorage;
use common::{body_json, body_text, post, post_json};
use serde_json::json;

fn sample_event(start: &str, end: &str) -> serde_json::Value {
    json!({
        "title": "standup",
        "startTime": start,
        "endTime": end,
        "description": "daily sync",
        "ownerId": "owner-1",
        "notifyBefore": 2
    })
}

// ---------------------------------------------------------------------------
// POST /add
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_returns_bare_id() {
    let (app, storage) = common::build_test_app();
    let mut body = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");
    body["id"] = json!("123");

    let response = post_json(app, "/add", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "123");
    assert_eq!(storage.len().await, 1);
}

#[tokio::test]
async fn add_assigns_id_when_missing() {
    let (app, storage) = common::build_test_app();
    let body = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");

    let response = post_json(app, "/add", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_text(response).await;
    assert!(!id.is_empty());

    let stored = storage
        .get_events_in_range(calendar_core::calendar::TimeWindow {
            start: "2300-01-01T00:00:00Z".parse().unwrap(),
            end: "2300-01-02T00:00:00Z".parse().unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].owner_id, "owner-1");
    assert_eq!(stored[0].notify_before, 2);
}

#[tokio::test]
async fn add_accepts_body_without_content_type() {
    let (app, _) = common::build_test_app();
    let body = r#"{"id":"raw","startTime":"2300-01-02T15:04:05Z","endTime":"2300-01-03T15:04:05Z","ownerID":"legacy"}"#;

    let response = post(app, "/add", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "raw");
}

#[tokio::test]
async fn add_with_past_start_is_500_with_message() {
    let (app, storage) = common::build_test_app();
    let body = sample_event("2001-01-02T15:04:05Z", "2002-01-02T15:04:05Z");

    let response = post_json(app, "/add", body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(text.starts_with("add event: incorrect event time"), "{text}");
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn malformed_body_is_500() {
    let (app, _) = common::build_test_app();
    let response = post(app, "/add", "{not json").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("invalid request body"));
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let (app, _) = common::build_test_app();
    let mut body = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");
    body["id"] = json!("dup");

    let first = post_json(app.clone(), "/add", body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json(app, "/add", body).await;
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(second).await,
        "add event: event with same ID exists: dup"
    );
}

// ---------------------------------------------------------------------------
// POST /update, /remove
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_replaces_event() {
    let (app, _) = common::build_test_app();
    let mut body = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");
    body["id"] = json!("42");
    post_json(app.clone(), "/add", body).await;

    let replacement = json!({
        "title": "retro",
        "startTime": "2300-01-01T14:00:00Z",
        "endTime": "2300-01-01T15:00:00Z"
    });
    let response = post_json(
        app.clone(),
        "/update",
        json!({ "id": "42", "event": replacement }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(app, "/events/day", json!({ "date": "2300-01-01T00:00:00Z" })).await;
    let events = body_json(response).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["id"], "42");
    assert_eq!(events[0]["title"], "retro");
    assert_eq!(events[0]["startTime"], "2300-01-01T14:00:00Z");
    assert_eq!(events[0]["ownerId"], "");
    assert_eq!(events[0]["notifyBefore"], 0);
    assert!(events[0].get("isSent").is_none());
}

#[tokio::test]
async fn update_missing_event_names_the_id() {
    let (app, _) = common::build_test_app();
    let event = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");

    let response = post_json(app, "/update", json!({ "id": "42", "event": event })).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "update event 42: event not found: 42"
    );
}

#[tokio::test]
async fn remove_deletes_then_reports_missing() {
    let (app, storage) = common::build_test_app();
    let mut body = sample_event("2300-01-01T10:00:00Z", "2300-01-01T11:00:00Z");
    body["id"] = json!("gone");
    post_json(app.clone(), "/add", body).await;

    let response = post_json(app.clone(), "/remove", json!({ "id": "gone" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(storage.is_empty().await);

    let response = post_json(app, "/remove", json!({ "id": "gone" })).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "remove event gone: event not found: gone"
    );
}

// ---------------------------------------------------------------------------
// POST /events/{day,week,month}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn period_queries_return_sorted_arrays() {
    let (app, _) = common::build_test_app();
    for (id, start, end) in [
        ("c", "2300-01-20T09:00:00Z", "2300-01-20T10:00:00Z"),
        ("a", "2300-01-01T09:00:00Z", "2300-01-01T10:00:00Z"),
        ("b", "2300-01-03T09:00:00Z", "2300-01-03T10:00:00Z"),
    ] {
        let mut body = sample_event(start, end);
        body["id"] = json!(id);
        let response = post_json(app.clone(), "/add", body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let ids = |events: serde_json::Value| -> Vec<String> {
        events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect()
    };

    let date = json!({ "date": "2300-01-01T00:00:00Z" });
    let day = body_json(post_json(app.clone(), "/events/day", date.clone()).await).await;
    assert_eq!(ids(day), vec!["a"]);

    // 2300-01-01 is a Monday.
    let week = body_json(post_json(app.clone(), "/events/week", date.clone()).await).await;
    assert_eq!(ids(week), vec!["a", "b"]);

    let month = body_json(post_json(app.clone(), "/events/month", date).await).await;
    assert_eq!(ids(month), vec!["a", "b", "c"]);

    let empty = body_json(
        post_json(app, "/events/day", json!({ "date": "2300-02-01T00:00:00Z" })).await,
    )
    .await;
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn misaligned_period_anchor_is_500() {
    let (app, _) = common::build_test_app();

    let response = post_json(
        app.clone(),
        "/events/week",
        json!({ "date": "2300-01-02T00:00:00Z" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response)
        .await
        .contains("date should be a first day of requested period"));

    let response = post_json(app, "/events/month", json!({ "date": "2300-01-15T00:00:00Z" })).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn day_query_honours_anchor_offset() {
    let (app, _) = common::build_test_app();
    let mut body = sample_event("2300-01-01T22:30:00Z", "2300-01-01T23:00:00Z");
    body["id"] = json!("late");
    post_json(app.clone(), "/add", body).await;

    // Local day 2300-01-02 at UTC+3 starts at 2300-01-01T21:00Z.
    let response = post_json(
        app,
        "/events/day",
        json!({ "date": "2300-01-02T00:00:00+03:00" }),
    )
    .await;
    let events = body_json(response).await;
    assert_eq!(events[0]["id"], "late");
}

#[tokio::test]
async fn added_event_comes_back_with_its_offset() {
    let (app, _) = common::build_test_app();
    let mut body = sample_event("2300-01-01T03:00:00+02:00", "2300-01-01T04:00:00+02:00");
    body["id"] = json!("zoned");

    let response = post_json(app.clone(), "/add", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        app,
        "/events/day",
        json!({ "date": "2300-01-01T00:00:00+02:00" }),
    )
    .await;
    let events = body_json(response).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0], body);
}
