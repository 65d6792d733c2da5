use chrono::{DateTime, FixedOffset, Utc};

/// Instants produced by the system itself: cutoffs, receipt times.
pub type Timestamp = DateTime<Utc>;

/// A caller-supplied time that keeps the UTC offset it was written with.
/// Ordering and equality compare the underlying instant.
pub type EventTime = DateTime<FixedOffset>;

/// A calendar anchor as supplied by callers. Day boundaries are computed in
/// the offset carried by the value.
pub type Anchor = EventTime;

/// RFC 3339 (de)serialization for [`EventTime`] that writes a zero offset
/// as `Z` and otherwise keeps the caller's offset.
pub mod rfc3339 {
    use chrono::{DateTime, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EventTime;

    pub fn serialize<S>(time: &EventTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<EventTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw).map_err(serde::de::Error::custom)
    }
}
