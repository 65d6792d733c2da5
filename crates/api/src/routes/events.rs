use axum::routing::post;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Event routes, mounted at the root.
///
/// ```text
/// POST   /add                add_event
/// POST   /update             update_event
/// POST   /remove             remove_event
/// POST   /events/day         events_for_day
/// POST   /events/week        events_for_week
/// POST   /events/month       events_for_month
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(events::add_event))
        .route("/update", post(events::update_event))
        .route("/remove", post(events::remove_event))
        .route("/events/day", post(events::events_for_day))
        .route("/events/week", post(events::events_for_week))
        .route("/events/month", post(events::events_for_month))
}
