use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Goal, UserProfile};
use crate::storage::{KeyValueStore, StoreError};

pub const PLAN_KEY: &str = "hc.lastPlan.v1";
pub const SCHEDULE_KEY: &str = "hc.lastSchedule.v1";
pub const PROFILE_KEY: &str = "hc.profile.v1";

/// Last profile the user planned with, used to prefill the next run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// Last plan and schedule responses, kept so a later session can resume
/// without calling the gateway again. Reads never fail; unreadable entries
/// come back as `None`.
#[derive(Debug, Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn cache_plan(&self, plan: &Value) -> Result<(), StoreError> {
        self.write_json(PLAN_KEY, plan)
    }

    #[must_use]
    pub fn cached_plan(&self) -> Option<Value> {
        self.read_json(PLAN_KEY)
    }

    pub fn cache_schedule(&self, schedule: &Value) -> Result<(), StoreError> {
        self.write_json(SCHEDULE_KEY, schedule)
    }

    #[must_use]
    pub fn cached_schedule(&self) -> Option<Value> {
        self.read_json(SCHEDULE_KEY)
    }

    /// Best effort; a failed write is logged and otherwise ignored.
    pub fn save_profile(&self, profile: &StoredProfile) {
        if let Err(error) = self.write_json(PROFILE_KEY, profile) {
            tracing::warn!(error = %error, "failed to persist profile");
        }
    }

    #[must_use]
    pub fn load_profile(&self) -> Option<StoredProfile> {
        self.read_json(PROFILE_KEY)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get_item(key)?;
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(key, error = %error, "cached entry unreadable; treating as absent");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|error| StoreError::Encode {
            key: key.to_string(),
            message: error.to_string(),
        })?;
        self.store.set_item(key, &encoded)
    }
}
