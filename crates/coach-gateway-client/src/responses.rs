//! Boundary decoding of gateway payloads.
//!
//! The gateway's agents disagree on field names. Each decoder here maps the
//! known aliases onto one canonical shape so callers never probe raw JSON.

use serde::Serialize;
use serde_json::Value;

/// Liveness probe result. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PingStatus {
    #[must_use]
    pub fn up(data: Option<Value>) -> Self {
        Self {
            ok: true,
            data,
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "Gateway unreachable".to_string()
        } else {
            error
        };
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// `/nudge/send` response.
///
/// | field     | aliases, in order                         |
/// |-----------|-------------------------------------------|
/// | `text`    | `text`, `message`, `nudge`, `content`     |
/// | `id`      | `id`, `event_id`, `notification_id`       |
/// | `sent_at` | `sent_at`, `when`, `timestamp`            |
/// | `channel` | `channel`, `medium`                       |
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nudge {
    pub text: String,
    pub id: Option<String>,
    pub sent_at: Option<String>,
    pub channel: Option<String>,
    pub raw: Value,
}

pub const DEFAULT_NUDGE_TEXT: &str = "Nudge sent.";

impl Nudge {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self {
            text: first_text(&value, &["text", "message", "nudge", "content"])
                .unwrap_or_else(|| DEFAULT_NUDGE_TEXT.to_string()),
            id: first_text(&value, &["id", "event_id", "notification_id"]),
            sent_at: first_text(&value, &["sent_at", "when", "timestamp"]),
            channel: first_text(&value, &["channel", "medium"]),
            raw: value,
        }
    }
}

/// `/schedule/commit` response: `events` is read from `events`, `items`, or
/// `scheduled`, whichever comes first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleResult {
    pub events: Vec<ScheduledItem>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduledItem {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub when: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub calories: Option<f64>,
}

impl ScheduledItem {
    fn from_value(value: &Value) -> Self {
        Self {
            id: first_text(value, &["id"]),
            kind: first_text(value, &["type"]),
            title: first_text(value, &["title"]),
            when: first_text(value, &["when"]),
            status: first_text(value, &["status"]),
            notes: first_text(value, &["notes"]),
            calories: value.get("calories").and_then(Value::as_f64),
        }
    }

    /// Title, or a label derived from the event kind.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if let Some(title) = self.title.as_deref() {
            return title;
        }
        match self.kind.as_deref() {
            Some("meal") => "Meal",
            Some("workout") => "Workout",
            _ => "Item",
        }
    }
}

impl ScheduleResult {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let events = ["events", "items", "scheduled"]
            .iter()
            .find_map(|key| value.get(*key).filter(|entry| is_truthy(entry)))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(ScheduledItem::from_value).collect())
            .unwrap_or_default();
        Self {
            events,
            message: first_text(value, &["message"]),
        }
    }
}

// Mirrors the gateway's loose "first present value" convention: empty
// strings, zero, false and null are skipped.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        number @ Value::Number(_) if is_truthy(number) => Some(number.to_string()),
        _ => None,
    })
}
