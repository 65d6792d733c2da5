//! Handlers for event CRUD and calendar period queries.
//!
//! All endpoints are `POST` with a JSON body, mirroring the RPC-style API
//! the calendar has always exposed.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use calendar_core::event::Event;
use calendar_core::types::Anchor;

use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Request bodies
   -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub id: String,
    pub event: Event,
}

#[derive(Debug, Deserialize)]
pub struct RemoveEventRequest {
    pub id: String,
}

/// First instant of the requested period, with the caller's UTC offset.
#[derive(Debug, Deserialize)]
pub struct PeriodRequest {
    pub date: Anchor,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// POST /add
///
/// Responds with the stored id as plain text.
pub async fn add_event(
    State(state): State<AppState>,
    JsonBody(event): JsonBody<Event>,
) -> AppResult<String> {
    let id = state
        .storage
        .add_event(event)
        .await
        .map_err(|e| AppError::storage("add event", e))?;
    tracing::info!(event_id = %id, "Event created");
    Ok(id)
}

/// POST /update
pub async fn update_event(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateEventRequest>,
) -> AppResult<StatusCode> {
    state
        .storage
        .update_event(&req.id, req.event)
        .await
        .map_err(|e| AppError::storage(format!("update event {}", req.id), e))?;
    tracing::info!(event_id = %req.id, "Event updated");
    Ok(StatusCode::OK)
}

/// POST /remove
pub async fn remove_event(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RemoveEventRequest>,
) -> AppResult<StatusCode> {
    state
        .storage
        .remove_event(&req.id)
        .await
        .map_err(|e| AppError::storage(format!("remove event {}", req.id), e))?;
    tracing::info!(event_id = %req.id, "Event removed");
    Ok(StatusCode::OK)
}

/// POST /events/day
pub async fn events_for_day(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PeriodRequest>,
) -> AppResult<Json<Vec<Event>>> {
    let events = state
        .storage
        .get_events_for_day(req.date)
        .await
        .map_err(|e| AppError::storage(format!("list events for day {}", req.date), e))?;
    Ok(Json(events))
}

/// POST /events/week
///
/// `date` must fall on the store's first weekday.
pub async fn events_for_week(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PeriodRequest>,
) -> AppResult<Json<Vec<Event>>> {
    let events = state
        .storage
        .get_events_for_week(req.date)
        .await
        .map_err(|e| AppError::storage(format!("list events for week {}", req.date), e))?;
    Ok(Json(events))
}

/// POST /events/month
///
/// `date` must be the first day of a month.
pub async fn events_for_month(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PeriodRequest>,
) -> AppResult<Json<Vec<Event>>> {
    let events = state
        .storage
        .get_events_for_month(req.date)
        .await
        .map_err(|e| AppError::storage(format!("list events for month {}", req.date), e))?;
    Ok(Json(events))
}
