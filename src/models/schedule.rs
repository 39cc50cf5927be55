// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly schedule template owned by a user.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Day of the week, stored and transmitted as uppercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const WORKWEEK: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct TaskDuration {
    #[validate(range(max = 24))]
    pub hours: u32,
    #[validate(range(max = 59))]
    pub minutes: u32,
}

/// A preferred task the generator may place freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub summary: String,
    #[validate(nested)]
    pub duration: TaskDuration,
    pub on_weekends: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<TimeOfDay>,
    /// Times per week
    #[validate(range(min = 1, max = 7))]
    pub frequency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// A fixed appointment. Never moved by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct MandatoryTask {
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub summary: String,
    #[serde(with = "wall_clock")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_time: NaiveTime,
    pub start_day: Weekday,
    pub end_day: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Editable part of a schedule, as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTemplate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(with = "wall_clock")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_time: NaiveTime,
    pub active_days: Vec<Weekday>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub mandatory_tasks: Vec<MandatoryTask>,
}

impl Default for ScheduleTemplate {
    fn default() -> Self {
        Self {
            name: "My Schedule".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            active_days: Weekday::WORKWEEK.to_vec(),
            tasks: Vec::new(),
            mandatory_tasks: Vec::new(),
        }
    }
}

impl ScheduleTemplate {
    /// Field validation plus the checks the derive cannot express.
    pub fn check(&mut self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        for task in &self.tasks {
            task.validate().map_err(|e| format!("task '{}': {e}", task.id))?;
        }
        for task in &self.mandatory_tasks {
            task.validate().map_err(|e| format!("mandatory task '{}': {e}", task.id))?;
        }

        if self.end_time <= self.start_time {
            return Err("endTime must be after startTime".to_string());
        }

        // Ordered set: dedupe while keeping Monday..Sunday order.
        self.active_days.sort();
        self.active_days.dedup();
        if self.active_days.is_empty() {
            return Err("at least one active day is required".to_string());
        }

        Ok(())
    }
}

/// Stored schedule, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(flatten)]
    pub template: ScheduleTemplate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// `HH:MM` wall-clock times (seconds accepted on input).
pub mod wall_clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| format!("invalid wall-clock time '{raw}', expected HH:MM"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let template = ScheduleTemplate::default();
        assert_eq!(template.start_time.format("%H:%M").to_string(), "09:00");
        assert_eq!(template.end_time.format("%H:%M").to_string(), "17:00");
        assert_eq!(template.active_days, Weekday::WORKWEEK.to_vec());
        assert!(template.tasks.is_empty());
        assert!(template.mandatory_tasks.is_empty());
    }

    #[test]
    fn test_parses_client_payload() {
        let mut template: ScheduleTemplate = serde_json::from_value(json!({
            "name": "Work",
            "startTime": "08:30",
            "endTime": "18:00",
            "activeDays": ["FRIDAY", "MONDAY", "MONDAY"],
            "tasks": [{
                "id": "t1",
                "summary": "Gym",
                "duration": {"hours": 1, "minutes": 30},
                "onWeekends": true,
                "preferredTime": "morning",
                "frequency": 3,
                "priority": "high"
            }],
            "mandatoryTasks": [{
                "id": "m1",
                "summary": "Standup",
                "startTime": "09:00",
                "endTime": "09:15",
                "startDay": "MONDAY",
                "endDay": "MONDAY"
            }]
        }))
        .unwrap();

        template.check().unwrap();
        assert_eq!(template.active_days, vec![Weekday::Monday, Weekday::Friday]);
        assert_eq!(template.tasks[0].preferred_time, Some(TimeOfDay::Morning));
        assert_eq!(template.mandatory_tasks[0].color, None);
    }

    #[test]
    fn test_serializes_wall_clock_and_uppercase_days() {
        let value = serde_json::to_value(ScheduleTemplate::default()).unwrap();
        assert_eq!(value["startTime"], "09:00");
        assert_eq!(value["activeDays"][0], "MONDAY");
    }

    #[test]
    fn test_check_rejects_inverted_window() {
        let mut template = ScheduleTemplate {
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ..ScheduleTemplate::default()
        };
        assert!(template.check().is_err());
    }

    #[test]
    fn test_check_rejects_bad_frequency() {
        let mut template = ScheduleTemplate::default();
        template.tasks.push(Task {
            id: "t".to_string(),
            summary: "Read".to_string(),
            duration: TaskDuration {
                hours: 0,
                minutes: 30,
            },
            on_weekends: false,
            preferred_time: None,
            frequency: 0,
            color: None,
            priority: None,
        });
        assert!(template.check().is_err());
    }

    #[test]
    fn test_wall_clock_parse() {
        assert!(wall_clock::parse("07:05").is_ok());
        assert!(wall_clock::parse("07:05:30").is_ok());
        assert!(wall_clock::parse("7pm").is_err());
    }
}
