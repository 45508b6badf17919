use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use coach_client_core::{
    FeedbackRequest, Goal, KeyValueStore, NudgeRequest, PlanRequest, ResultCache, ScheduleEvent,
    SettingsStore, UserProfile, build_schedule_events,
};

use crate::error::GatewayError;
use crate::executor::{RequestExecutor, RequestOptions};
use crate::responses::{Nudge, PingStatus, is_truthy};

pub const HEALTH_PATH: &str = "/health";
pub const ROOT_PATH: &str = "/";
pub const PLAN_TODAY_PATH: &str = "/plan/today";
pub const SCHEDULE_COMMIT_PATH: &str = "/schedule/commit";
pub const NUDGE_SEND_PATH: &str = "/nudge/send";
pub const FEEDBACK_PATH: &str = "/feedback";

/// Upper bound on the whole liveness probe, both attempts included.
pub const PING_FAILSAFE_MS: u64 = 3_000;

#[derive(Debug, Serialize)]
struct PlanTodayBody<'a> {
    user_id: &'a str,
    profile: &'a UserProfile,
    goal: &'a Goal,
    equipment: &'a [String],
}

#[derive(Debug, Serialize)]
struct ScheduleCommitBody<'a> {
    user_id: &'a str,
    events: &'a [ScheduleEvent],
}

#[derive(Debug, Serialize)]
struct NudgeSendBody<'a> {
    user_id: &'a str,
    tone: &'a str,
    goal: &'a str,
}

#[derive(Debug, Serialize)]
struct FeedbackBody<'a> {
    user_id: &'a str,
    event_id: &'a str,
    rating: i64,
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bandit_arm: Option<&'a str>,
}

/// Named gateway operations over one [`RequestExecutor`].
///
/// Settings are read at call time, so a saved gateway URL or user id applies
/// to the next call without rebuilding the client. Operations are independent
/// and may run concurrently; plan and schedule results land in separate cache
/// entries, last write wins.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    settings: SettingsStore,
    cache: ResultCache,
    executor: RequestExecutor,
    ping_failsafe: Duration,
}

impl GatewayClient {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings: SettingsStore::new(store.clone()),
            cache: ResultCache::new(store),
            executor: RequestExecutor::new(),
            ping_failsafe: Duration::from_millis(PING_FAILSAFE_MS),
        }
    }

    #[must_use]
    pub fn with_executor(mut self, executor: RequestExecutor) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn with_ping_failsafe(mut self, failsafe: Duration) -> Self {
        self.ping_failsafe = failsafe;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Executes one request against the configured gateway.
    pub async fn fetch_json(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let base_url = self.settings.gateway_base();
        self.executor.fetch_json(&base_url, path, options).await
    }

    /// Tries `/health`, then `/`. Every failure is folded into the returned
    /// status.
    pub async fn ping(&self) -> PingStatus {
        match tokio::time::timeout(self.ping_failsafe, self.probe()).await {
            Ok(status) => status,
            Err(_) => PingStatus::down("Ping timeout"),
        }
    }

    async fn probe(&self) -> PingStatus {
        let base_url = self.settings.gateway_base();
        let options = || RequestOptions::get().with_timeout(self.ping_failsafe);

        match self.executor.send(&base_url, HEALTH_PATH, options()).await {
            Ok(response) if response.status.is_success() => {
                match serde_json::from_str::<Value>(&response.text) {
                    Ok(data) if is_truthy(&data) => return PingStatus::up(Some(data)),
                    _ => tracing::debug!("health endpoint returned no usable document; probing root"),
                }
            }
            Ok(response) => {
                tracing::debug!(status = response.status.as_u16(), "health endpoint not ok; probing root");
            }
            Err(error) => {
                tracing::debug!(error = %error, "health endpoint unreachable; probing root");
            }
        }

        match self.executor.send(&base_url, ROOT_PATH, options()).await {
            Ok(response) if response.status.is_success() => PingStatus::up(None),
            Ok(response) => PingStatus::down(format!("Status {}", response.status.as_u16())),
            Err(error) => PingStatus::down(error.to_string()),
        }
    }

    /// Requests today's plan and caches the response.
    pub async fn plan_today(&self, request: &PlanRequest) -> Result<Value, GatewayError> {
        let user_id = self.settings.get().user_id;
        let body = encode(&PlanTodayBody {
            user_id: &user_id,
            profile: &request.profile,
            goal: &request.goal,
            equipment: request.equipment_or_empty(),
        })?;

        let plan = self
            .fetch_json(PLAN_TODAY_PATH, RequestOptions::post(body))
            .await?;
        if let Err(error) = self.cache.cache_plan(&plan) {
            tracing::warn!(error = %error, "plan received but could not be cached");
        }
        Ok(plan)
    }

    /// Commits events and caches the gateway's schedule response.
    pub async fn commit_schedule(&self, events: &[ScheduleEvent]) -> Result<Value, GatewayError> {
        let user_id = self.settings.get().user_id;
        let body = encode(&ScheduleCommitBody {
            user_id: &user_id,
            events,
        })?;

        let schedule = self
            .fetch_json(SCHEDULE_COMMIT_PATH, RequestOptions::post(body))
            .await?;
        if let Err(error) = self.cache.cache_schedule(&schedule) {
            tracing::warn!(error = %error, "schedule received but could not be cached");
        }
        Ok(schedule)
    }

    /// Builds today's events from the cached plan and commits them.
    pub async fn schedule_from_cache(
        &self,
        meal_times: &str,
        workout_time: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let plan = self.cache.cached_plan();
        let events = build_schedule_events(plan.as_ref(), meal_times, workout_time)?;
        tracing::debug!(events = events.len(), "committing schedule built from cached plan");
        self.commit_schedule(&events).await
    }

    pub async fn send_nudge(&self, request: &NudgeRequest) -> Result<Nudge, GatewayError> {
        let user_id = self.settings.get().user_id;
        let body = encode(&NudgeSendBody {
            user_id: &user_id,
            tone: &request.tone,
            goal: &request.goal,
        })?;

        self.fetch_json(NUDGE_SEND_PATH, RequestOptions::post(body))
            .await
            .map(Nudge::from_value)
    }

    /// Rating is clamped to `1..=5`, a blank reason becomes `"ok"`, and an
    /// empty bandit arm is left out of the body.
    pub async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<Value, GatewayError> {
        let user_id = self.settings.get().user_id;
        let body = encode(&FeedbackBody {
            user_id: &user_id,
            event_id: request.event_id.trim(),
            rating: request.normalized_rating(),
            reason: request.normalized_reason(),
            bandit_arm: request.bandit_arm(),
        })?;

        self.fetch_json(FEEDBACK_PATH, RequestOptions::post(body))
            .await
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(body).map_err(|error| GatewayError::Encode(error.to_string()))
}
