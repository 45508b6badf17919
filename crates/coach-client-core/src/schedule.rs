use chrono::{Local, NaiveDate};
use serde_json::Value;

use crate::model::{Plan, ScheduleEvent, ScheduleEventKind};
use crate::time::{is_hh_mm, iso_on_date_at, parse_times};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleInputError {
    #[error("Please generate a plan first.")]
    MissingPlan,
    #[error("Enter meal times as HH:MM (comma-separated).")]
    NoMealTimes,
}

/// Builds today's events from the cached plan.
pub fn build_schedule_events(
    cached_plan: Option<&Value>,
    meal_times: &str,
    workout_time: Option<&str>,
) -> Result<Vec<ScheduleEvent>, ScheduleInputError> {
    build_schedule_events_on(
        Local::now().date_naive(),
        cached_plan,
        meal_times,
        workout_time,
    )
}

/// One meal event per valid time, titled by cycling through the plan's meal
/// names, plus one workout event when `workout_time` is a valid `HH:MM`.
pub fn build_schedule_events_on(
    date: NaiveDate,
    cached_plan: Option<&Value>,
    meal_times: &str,
    workout_time: Option<&str>,
) -> Result<Vec<ScheduleEvent>, ScheduleInputError> {
    let plan = cached_plan
        .map(Plan::from_value)
        .ok_or(ScheduleInputError::MissingPlan)?;
    let times = parse_times(meal_times);
    if times.is_empty() {
        return Err(ScheduleInputError::NoMealTimes);
    }

    let mut events = times
        .iter()
        .enumerate()
        .map(|(index, time)| {
            let title = plan
                .meals
                .get(index % plan.meals.len().max(1))
                .and_then(|meal| meal.name.clone())
                .unwrap_or_else(|| format!("Meal {}", index + 1));
            ScheduleEvent {
                kind: ScheduleEventKind::Meal,
                when: iso_on_date_at(date, time),
                title,
            }
        })
        .collect::<Vec<_>>();

    if let Some(time) = workout_time.map(str::trim).filter(|time| is_hh_mm(time)) {
        let title = plan
            .workouts
            .first()
            .and_then(|workout| workout.name.clone())
            .unwrap_or_else(|| "Workout".to_string());
        events.push(ScheduleEvent {
            kind: ScheduleEventKind::Workout,
            when: iso_on_date_at(date, time),
            title,
        });
    }

    Ok(events)
}
