// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar events as exchanged with the Google Calendar API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Start or end of a timed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date_time: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A candidate event to be created on the user's primary calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[validate(length(min = 1, max = 1024))]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl CalendarEvent {
    /// Field validation plus start/end ordering.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if self.end.date_time <= self.start.date_time {
            return Err(format!("event '{}' ends before it starts", self.summary));
        }
        Ok(())
    }
}

/// An event as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ListedEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub start: serde_json::Value,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub end: serde_json::Value,
    #[serde(default)]
    pub color_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(start: &str, end: &str) -> CalendarEvent {
        serde_json::from_value(json!({
            "summary": "Deep work",
            "start": {"dateTime": start, "timeZone": "America/Los_Angeles"},
            "end": {"dateTime": end},
            "colorId": "5"
        }))
        .unwrap()
    }

    #[test]
    fn test_google_wire_shape() {
        let value = serde_json::to_value(event(
            "2026-10-19T09:00:00-07:00",
            "2026-10-19T10:30:00-07:00",
        ))
        .unwrap();

        assert_eq!(value["start"]["dateTime"], "2026-10-19T09:00:00-07:00");
        assert_eq!(value["start"]["timeZone"], "America/Los_Angeles");
        assert_eq!(value["colorId"], "5");
        assert!(value["end"].get("timeZone").is_none());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_check() {
        assert!(event("2026-10-19T09:00:00Z", "2026-10-19T10:00:00Z")
            .check()
            .is_ok());
        assert!(event("2026-10-19T10:00:00Z", "2026-10-19T09:00:00Z")
            .check()
            .is_err());

        let mut empty = event("2026-10-19T09:00:00Z", "2026-10-19T10:00:00Z");
        empty.summary.clear();
        assert!(empty.check().is_err());
    }
}
