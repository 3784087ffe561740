//! Profile data model.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A task on the user's to-do list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// Shopping and task lists. Order is display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lists {
    #[serde(default)]
    pub shopping: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A calendar entry.
///
/// `date` is kept exactly as stored; use [`CalendarEvent::starts_at`] for a
/// parsed timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub date: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, date: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            kind: kind.into(),
        }
    }

    /// Parse `date` as a naive ISO-8601 timestamp, falling back to RFC 3339
    /// (offset dropped, wall-clock time kept).
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let raw = self.date.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }
}

/// A smart-home device and its last known status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub status: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Device {
    pub fn new(name: impl Into<String>, status: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmartHome {
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// The persisted user profile.
///
/// Stored as JSON under [`crate::config::PROFILE_KEY`]. The five core fields
/// are required when deserializing, so a document that lacks one never
/// becomes a `Profile`. Unknown top-level keys are carried in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub preferences: Map<String, Value>,
    pub lists: Lists,
    pub calendar: Vec<CalendarEvent>,
    pub smart_home: SmartHome,
    /// Reserved for historical transcripts; never written by the chat session.
    #[serde(default)]
    pub conversations: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Tasks that are not done, in display order.
    pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
        self.lists.tasks.iter().filter(|t| !t.done)
    }

    /// Look up a preference value by setting name.
    pub fn preference(&self, key: &str) -> Option<&Value> {
        self.preferences.get(key)
    }
}

impl Default for Profile {
    /// The first-run profile written when the store has no entry.
    fn default() -> Self {
        let mut preferences = Map::new();
        preferences.insert("theme".to_string(), Value::String("auto".to_string()));

        Self {
            name: "Lucy".to_string(),
            preferences,
            lists: Lists {
                shopping: vec!["Milk".to_string(), "Eggs".to_string(), "Bread".to_string()],
                tasks: vec![Task::new("Call dentist"), Task::new("Review Q4 report")],
            },
            calendar: vec![
                CalendarEvent::new("Team Meeting", "2025-11-18T10:00:00", "work"),
                CalendarEvent::new("Dinner with Sarah", "2025-11-18T19:00:00", "personal"),
            ],
            smart_home: SmartHome {
                devices: vec![
                    Device::new("Living Room Lights", "on", "light"),
                    Device::new("Thermostat", "72°F", "climate"),
                    Device::new("Front Door", "locked", "security"),
                ],
            },
            conversations: Vec::new(),
            extra: Map::new(),
        }
    }
}
