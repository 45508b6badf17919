use coach_client_core::{Plan, PlanItem};
use coach_gateway_client::{Nudge, PingStatus, ScheduleResult};
use serde_json::Value;

pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn ping_summary(status: &PingStatus, gateway: &str) -> String {
    if status.ok {
        format!("Gateway OK ({gateway})")
    } else {
        format!(
            "Gateway unreachable ({gateway}): {}",
            status.error.as_deref().unwrap_or("unknown error")
        )
    }
}

pub fn plan_summary(plan: &Value) -> String {
    let plan = Plan::from_value(plan);
    let mut lines = vec![format!("Meals ({})", plan.meals.len())];
    lines.extend(plan.meals.iter().map(|meal| {
        item_line(
            meal,
            "Meal",
            field_number(meal, "calories").map(|kcal| format!("{kcal} kcal")),
        )
    }));
    lines.push(format!("Workouts ({})", plan.workouts.len()));
    lines.extend(plan.workouts.iter().map(|workout| {
        item_line(
            workout,
            "Workout",
            field_number(workout, "duration_min").map(|minutes| format!("{minutes} min")),
        )
    }));
    lines.join("\n")
}

fn item_line(item: &PlanItem, fallback: &str, detail: Option<String>) -> String {
    let name = item.name.as_deref().unwrap_or(fallback);
    match detail {
        Some(detail) => format!("  - {name} · {detail}"),
        None => format!("  - {name}"),
    }
}

fn field_number(item: &PlanItem, key: &str) -> Option<String> {
    item.fields
        .get(key)
        .filter(|value| value.is_number())
        .map(ToString::to_string)
}

pub fn schedule_summary(result: &ScheduleResult) -> String {
    if result.events.is_empty() {
        return "No items were scheduled.".to_string();
    }
    let mut lines = vec![format!("Scheduled items ({})", result.events.len())];
    for event in &result.events {
        let mut line = format!(
            "  - {}  {}",
            event.when.as_deref().unwrap_or("-"),
            event.display_title()
        );
        for detail in [event.status.as_deref(), event.notes.as_deref()]
            .into_iter()
            .flatten()
        {
            line.push_str(&format!(" · {detail}"));
        }
        if let Some(calories) = event.calories {
            line.push_str(&format!(" · {calories} kcal"));
        }
        if let Some(id) = event.id.as_deref() {
            line.push_str(&format!(" · ID: {id}"));
        }
        lines.push(line);
    }
    if let Some(message) = result.message.as_deref() {
        lines.push(message.to_string());
    }
    lines.join("\n")
}

pub fn nudge_summary(nudge: &Nudge, tone: &str, goal: &str) -> String {
    let mut header = format!("Nudge sent (tone: {tone}, goal: {goal}");
    if let Some(channel) = nudge.channel.as_deref() {
        header.push_str(&format!(", via {channel}"));
    }
    if let Some(sent_at) = nudge.sent_at.as_deref() {
        header.push_str(&format!(", at {sent_at}"));
    }
    if let Some(id) = nudge.id.as_deref() {
        header.push_str(&format!(", ID: {id}"));
    }
    header.push(')');
    format!("{header}\n\n{}", nudge.text)
}
