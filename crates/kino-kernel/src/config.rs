//! Kernel configuration
//!
//! Two structures reach the kernel:
//! - [`KernelConfig`]: the caller's base configuration (at minimum a `src`)
//! - [`CustomConfig`]: engine tuning, deep-merged over compiled-in defaults
//!
//! Field names inside [`CustomConfig`] belong to the wrapped engine's own
//! schema and are passed through untouched.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Compiled-in engine defaults. Only ever cloned, never merged into.
static DEFAULT_CUSTOM_CONFIG: Lazy<Value> = Lazy::new(|| {
    json!({
        "debug": false,
        "enableWorker": true,
        "lowLatencyMode": false,
        "autoStartLoad": true,
        "startLevel": -1,
        "maxBufferLength": 30,
        "maxMaxBufferLength": 600,
        "manifestLoadingMaxRetry": 1,
        "levelLoadingMaxRetry": 4,
        "fragLoadingMaxRetry": 6,
        "abrEwmaDefaultEstimate": 500000
    })
});

/// Fresh copy of the compiled-in custom configuration
pub fn default_custom_config() -> Value {
    DEFAULT_CUSTOM_CONFIG.clone()
}

/// Recursively merge `source` into `target`.
///
/// Objects merge key by key; arrays and scalars from `source` replace
/// whatever `target` held.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = target.get_mut(key) {
                        deep_merge(existing, value);
                    }
                } else {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Base kernel configuration supplied by the host player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelConfig(Map<String, Value>);

impl KernelConfig {
    /// Build from a JSON value, which must be a plain object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::invalid_argument(format!(
                "config of kino-kernel must be an object, but not {}",
                describe(&other)
            ))),
        }
    }

    /// Config carrying only a source URI
    pub fn with_src(src: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("src".to_string(), Value::String(src.into()));
        Self(map)
    }

    /// Source URI, if present and a string
    pub fn src(&self) -> Option<&str> {
        self.0.get("src").and_then(Value::as_str)
    }

    /// Source URI or an [`Error::InvalidConfig`]
    pub fn require_src(&self) -> Result<&str> {
        self.src()
            .ok_or_else(|| Error::InvalidConfig("config has no string `src`".to_string()))
    }

    /// Look up any other field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying JSON object
    pub fn as_value(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for KernelConfig {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Engine configuration after merging caller overrides over the defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomConfig(Value);

impl CustomConfig {
    /// Merge a sparse override tree over a fresh copy of the defaults.
    ///
    /// `null` means no overrides. Any other non-object is rejected.
    pub fn merged(overrides: Value) -> Result<Self> {
        let mut merged = default_custom_config();
        match &overrides {
            Value::Null => {}
            Value::Object(_) => deep_merge(&mut merged, &overrides),
            other => {
                return Err(Error::invalid_argument(format!(
                    "custom config of kino-kernel must be an object, but not {}",
                    describe(other)
                )))
            }
        }
        Ok(Self(merged))
    }

    /// Parse a JSON override document and merge it over the defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("custom config is not valid JSON: {}", e)))?;
        Self::merged(overrides)
    }

    /// Overrides tuned for low-latency live streams
    pub fn low_latency_overrides() -> Value {
        json!({
            "lowLatencyMode": true,
            "maxBufferLength": 6,
            "startLevel": 0
        })
    }

    /// Overrides tuned for video on demand
    pub fn vod_overrides() -> Value {
        json!({
            "maxBufferLength": 60,
            "maxMaxBufferLength": 600
        })
    }

    /// Look up a top-level engine option
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the merged tree
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the merged tree
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for CustomConfig {
    fn default() -> Self {
        Self(default_custom_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_config_rejects_non_objects() {
        for value in [json!(null), json!(1), json!("a.m3u8"), json!([1, 2]), json!(true)] {
            let err = KernelConfig::from_value(value).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_kernel_config_src() {
        let config = KernelConfig::from_value(json!({ "src": "a.m3u8", "box": "native" })).unwrap();
        assert_eq!(config.src(), Some("a.m3u8"));
        assert_eq!(config.get("box"), Some(&json!("native")));

        let config = KernelConfig::from_value(json!({ "src": 3 })).unwrap();
        assert!(config.src().is_none());
        assert!(matches!(config.require_src(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_kernel_config_with_src() {
        let config = KernelConfig::with_src("https://cdn.example.com/live.m3u8");
        assert_eq!(config.require_src().unwrap(), "https://cdn.example.com/live.m3u8");
        assert_eq!(config.as_value().len(), 1);

        let parsed = json!({ "src": "https://cdn.example.com/live.m3u8" });
        assert_eq!(KernelConfig::from_value(parsed).unwrap(), config);
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut target = json!({ "a": 1, "nested": { "x": 1, "y": 2 }, "list": [1, 2, 3] });
        deep_merge(
            &mut target,
            &json!({ "nested": { "y": 20, "z": 30 }, "list": [9], "b": "new" }),
        );
        assert_eq!(
            target,
            json!({ "a": 1, "nested": { "x": 1, "y": 20, "z": 30 }, "list": [9], "b": "new" })
        );
    }

    #[test]
    fn test_deep_merge_object_replaces_scalar() {
        let mut target = json!({ "a": 1 });
        deep_merge(&mut target, &json!({ "a": { "b": 2 } }));
        assert_eq!(target, json!({ "a": { "b": 2 } }));

        deep_merge(&mut target, &json!({ "a": null }));
        assert_eq!(target, json!({ "a": null }));
    }

    #[test]
    fn test_merged_does_not_touch_defaults() {
        let before = default_custom_config();
        let merged = CustomConfig::merged(json!({ "debug": true, "maxBufferLength": 12 })).unwrap();
        assert_eq!(merged.get("debug"), Some(&json!(true)));
        assert_eq!(merged.get("maxBufferLength"), Some(&json!(12)));
        assert_eq!(merged.get("enableWorker"), Some(&json!(true)));
        assert_eq!(default_custom_config(), before);

        // The taken tree is independent of the shared template
        let mut value = merged.into_value();
        value["enableWorker"] = json!(false);
        assert_eq!(value["maxBufferLength"], json!(12));
        assert_eq!(default_custom_config()["enableWorker"], json!(true));
    }

    #[test]
    fn test_merged_null_and_invalid() {
        assert_eq!(CustomConfig::merged(Value::Null).unwrap(), CustomConfig::default());
        assert!(matches!(
            CustomConfig::merged(json!("fast")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_presets() {
        let low = CustomConfig::merged(CustomConfig::low_latency_overrides()).unwrap();
        assert_eq!(low.get("lowLatencyMode"), Some(&json!(true)));
        assert_eq!(low.get("maxBufferLength"), Some(&json!(6)));

        let vod = CustomConfig::merged(CustomConfig::vod_overrides()).unwrap();
        assert_eq!(vod.get("maxBufferLength"), Some(&json!(60)));
        assert_eq!(vod.get("lowLatencyMode"), Some(&json!(false)));
    }

    #[test]
    fn test_from_json_str() {
        let config = CustomConfig::from_json_str(r#"{ "debug": true }"#).unwrap();
        assert_eq!(config.get("debug"), Some(&json!(true)));
        assert!(matches!(
            CustomConfig::from_json_str("{ debug"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
