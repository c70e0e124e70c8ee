//! Sync settings.

use crate::collaborators::SettingsStore;
use crate::endpoints::SyncEndpoints;
use crate::{EndpointError, EndpointResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use sync_queue_store::ItemStore;
use tracing::info;

/// Store key of the persisted setting overrides.
pub const SETTINGS_KEY: &str = "meta:sync_settings";

/// Every known setting with its default.
pub fn default_settings() -> Map<String, Value> {
    let defaults = json!({
        "dequeue_max_bytes": 500_000,
        "upload_max_bytes": 600_000,
        "upload_max_rows": 500,
        "sync_wait_time": 10,
        "sync_wait_threshold": 5,
        "enqueue_wait_time": 10,
        "max_queue_size": 1_000,
        "max_queue_lag": 900,
        "queue_max_writes_sec": 100,
        "post_types_blacklist": [],
        "post_meta_whitelist": [],
        "comment_meta_whitelist": [],
        "disable": 0,
        "render_filtered_content": 0,
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Apply the update coercion rules to raw request params.
///
/// - `false` values are ignored, `true` becomes `1`
/// - numbers and numeric strings become integers
/// - the string `"empty"` becomes `[]`
pub fn coerce_settings_update(params: &Value) -> EndpointResult<Map<String, Value>> {
    let Value::Object(params) = params else {
        return Err(EndpointError::InvalidArgument(
            "settings must be an object".to_string(),
        ));
    };

    let mut update = Map::new();
    for (key, value) in params {
        if value == &Value::Bool(false) {
            continue;
        }
        update.insert(key.clone(), coerce_value(value));
    }
    Ok(update)
}

fn coerce_value(value: &Value) -> Value {
    match value {
        Value::Bool(true) => json!(1),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => json!(i),
            (None, Some(f)) => json!(f.trunc() as i64),
            _ => value.clone(),
        },
        Value::String(s) if s == "empty" => json!([]),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return json!(i);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => json!(f.trunc() as i64),
                _ => value.clone(),
            }
        }
        _ => value.clone(),
    }
}

/// Settings persisted in the item store, merged over [`default_settings`].
///
/// Unknown keys are rejected, as are values whose shape does not match the
/// default (integer settings take integers, list settings take arrays).
pub struct StoreSettings {
    store: Arc<dyn ItemStore>,
}

impl StoreSettings {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn overrides(&self) -> EndpointResult<Map<String, Value>> {
        match self.store.get(SETTINGS_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Map::new()),
        }
    }
}

impl SettingsStore for StoreSettings {
    fn get_settings(&self) -> EndpointResult<Map<String, Value>> {
        let mut settings = default_settings();
        for (key, value) in self.overrides()? {
            if settings.contains_key(&key) {
                settings.insert(key, value);
            }
        }
        Ok(settings)
    }

    fn update_settings(&self, update: &Map<String, Value>) -> EndpointResult<()> {
        let defaults = default_settings();
        for (key, value) in update {
            let Some(default) = defaults.get(key) else {
                return Err(EndpointError::InvalidArgument(format!(
                    "unknown setting: {key}"
                )));
            };
            let shape_ok = match default {
                Value::Array(_) => value.is_array(),
                Value::Number(_) => value.is_i64() || value.is_u64(),
                _ => true,
            };
            if !shape_ok {
                return Err(EndpointError::InvalidArgument(format!(
                    "setting {key} has the wrong type: {value}"
                )));
            }
        }

        let mut overrides = self.overrides()?;
        for (key, value) in update {
            overrides.insert(key.clone(), value.clone());
        }
        self.store
            .put(SETTINGS_KEY, &serde_json::to_vec(&overrides)?)?;
        info!(keys = ?update.keys().collect::<Vec<_>>(), "Updated sync settings");
        Ok(())
    }
}

impl SyncEndpoints {
    pub fn get_settings(&self) -> EndpointResult<Value> {
        Ok(Value::Object(self.settings.get_settings()?))
    }

    /// Coerce and persist an update, then return the full settings as they
    /// now stand.
    ///
    /// Stricter than a free-form option store: an unknown key, or a value
    /// whose shape does not match the setting's default, rejects the whole
    /// update and nothing is written.
    pub fn set_settings(&self, params: Value) -> EndpointResult<Value> {
        let update = coerce_settings_update(&params)?;
        self.settings.update_settings(&update)?;
        self.get_settings()
    }
}
