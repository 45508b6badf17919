//! Request documents sent to the gateway and the slice of the plan document the
//! client reads back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// Fields the gateway understands but this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deficit_kcal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_minutes: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Goal {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            deficit_kcal: None,
            target_minutes: None,
            extra: Map::new(),
        }
    }
}

impl Default for Goal {
    fn default() -> Self {
        Self::new("general_health")
    }
}

/// Caller input for `/plan/today`. The user id is injected by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub profile: UserProfile,
    pub goal: Goal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
}

impl PlanRequest {
    #[must_use]
    pub fn equipment_or_empty(&self) -> &[String] {
        self.equipment.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleEventKind {
    Meal,
    Workout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    #[serde(rename = "type")]
    pub kind: ScheduleEventKind,
    /// Floating local time, `YYYY-MM-DDTHH:MM:SS`.
    pub when: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudgeRequest {
    pub tone: String,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub event_id: String,
    pub rating: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandit_arm: Option<String>,
}

impl FeedbackRequest {
    /// Rating clamped to `1..=5`; zero means "not given" and becomes 5.
    #[must_use]
    pub fn normalized_rating(&self) -> i64 {
        if self.rating == 0 {
            5
        } else {
            self.rating.clamp(1, 5)
        }
    }

    #[must_use]
    pub fn normalized_reason(&self) -> &str {
        let trimmed = self.reason.trim();
        if trimmed.is_empty() { "ok" } else { trimmed }
    }

    #[must_use]
    pub fn bandit_arm(&self) -> Option<&str> {
        self.bandit_arm
            .as_deref()
            .map(str::trim)
            .filter(|arm| !arm.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanItem {
    pub name: Option<String>,
    pub fields: Map<String, Value>,
}

/// Meals and workouts read out of a gateway plan document. Missing or
/// non-array sections read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub meals: Vec<PlanItem>,
    pub workouts: Vec<PlanItem>,
}

impl Plan {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            meals: plan_items(value.get("meals")),
            workouts: plan_items(value.get("workouts")),
        }
    }
}

fn plan_items(section: Option<&Value>) -> Vec<PlanItem> {
    let Some(Value::Array(items)) = section else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(fields) => PlanItem {
                name: fields
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(ToString::to_string),
                fields: fields.clone(),
            },
            _ => PlanItem::default(),
        })
        .collect()
}
