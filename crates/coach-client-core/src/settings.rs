use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{KeyValueStore, StoreError};

pub const SETTINGS_KEY: &str = "hc.settings.v1";
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER_ID: &str = "demo-user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub gateway_url: String,
    pub user_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SettingsPatch {
    #[must_use]
    pub fn gateway_url(mut self, value: impl Into<String>) -> Self {
        self.gateway_url = Some(value.into());
        self
    }

    #[must_use]
    pub fn user_id(mut self, value: impl Into<String>) -> Self {
        self.user_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateway_url.is_none() && self.user_id.is_none()
    }

    /// Reads whatever string-typed fields a stored document carries. Wrongly
    /// typed or unknown fields are ignored one by one.
    fn from_stored(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };
        Self {
            gateway_url: field("gatewayUrl"),
            user_id: field("userId"),
        }
    }

    #[must_use]
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(gateway_url) = self.gateway_url {
            settings.gateway_url = gateway_url;
        }
        if let Some(user_id) = self.user_id {
            settings.user_id = user_id;
        }
        settings
    }
}

/// Gateway URL and user id, persisted under [`SETTINGS_KEY`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted fields merged over the defaults. Missing or corrupt state
    /// yields the defaults.
    #[must_use]
    pub fn get(&self) -> Settings {
        let Some(raw) = self.store.get_item(SETTINGS_KEY) else {
            return Settings::default();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => SettingsPatch::from_stored(&value).apply(Settings::default()),
            Err(error) => {
                tracing::debug!(error = %error, "stored settings unreadable; using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let merged = patch.apply(self.get());
        let encoded = serde_json::to_string(&merged).map_err(|error| StoreError::Encode {
            key: SETTINGS_KEY.to_string(),
            message: error.to_string(),
        })?;
        self.store.set_item(SETTINGS_KEY, &encoded)?;
        tracing::debug!(gateway_url = %merged.gateway_url, user_id = %merged.user_id, "settings saved");
        Ok(merged)
    }

    pub fn reset(&self) -> Result<Settings, StoreError> {
        self.store.remove_item(SETTINGS_KEY)?;
        Ok(self.get())
    }

    /// Gateway URL without trailing slashes.
    #[must_use]
    pub fn gateway_base(&self) -> String {
        self.get()
            .gateway_url
            .trim()
            .trim_end_matches('/')
            .to_string()
    }
}
