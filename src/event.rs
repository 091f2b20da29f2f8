//! Analytics event model and wire serialization.
//!
//! An [`Event`] is immutable once created: the timestamp and session id are
//! stamped at track time and never change afterwards, even if the session
//! rotates later. The wire payload is a flat JSON object containing exactly
//! the allowlisted fields for the active protocol version; device metadata is
//! flattened into the event rather than nested.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "properties")]
use std::collections::BTreeMap;

/// Maximum accepted event name length, enforced at the track boundary.
pub const MAX_EVENT_NAME_LEN: usize = 100;

/// A single analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Name of the event (e.g. "purchase", "button_clicked")
    pub event_name: String,
    /// Capture time as an RFC 3339 UTC string, fixed at creation
    pub timestamp: String,
    /// Session id active when the event was created (32 lowercase hex chars)
    pub session_id: String,
    /// Screen the event occurred on, omitted from the payload when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    /// Persisted user identity, only present after an explicit `identify()`
    #[cfg(feature = "identify")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Caller-supplied properties (legacy wire schema only)
    #[cfg(feature = "properties")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyValue>>,
    /// Device/app metadata, flattened into the payload
    #[serde(flatten)]
    pub metadata: EventMetadata,
}

impl Event {
    /// Create a new event stamped with the current time and the given session.
    pub fn new(
        name: impl Into<String>,
        session_id: impl Into<String>,
        screen: Option<String>,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            event_name: name.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            session_id: session_id.into(),
            screen,
            #[cfg(feature = "identify")]
            user_id: None,
            #[cfg(feature = "properties")]
            properties: None,
            metadata,
        }
    }
}

/// Device/app metadata attached to every event.
///
/// Collected once at SDK construction and carried as opaque pass-through
/// fields; the delivery pipeline never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub platform: String,
    pub os_version: String,
    pub app_version: String,
    pub locale: String,
}

impl EventMetadata {
    /// Detect metadata for the current process.
    ///
    /// The application version cannot be discovered from inside a library, so
    /// the host supplies it (defaults to "unknown" via [`Config`]).
    ///
    /// [`Config`]: crate::config::Config
    pub fn detect(app_version: impl Into<String>) -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            os_version: os_version_string(),
            app_version: app_version.into(),
            locale: locale_string(),
        }
    }
}

#[cfg(target_os = "linux")]
fn os_version_string() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(not(target_os = "linux"))]
fn os_version_string() -> String {
    "unknown".to_string()
}

fn locale_string() -> String {
    std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()
        .and_then(|v| v.split('.').next().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A caller-supplied property value (legacy wire schema).
///
/// Recursive tagged union covering everything the collector accepts; values
/// serialize to their natural JSON forms.
#[cfg(feature = "properties")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

#[cfg(feature = "properties")]
impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

#[cfg(feature = "properties")]
impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

#[cfg(feature = "properties")]
impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

#[cfg(feature = "properties")]
impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

#[cfg(feature = "properties")]
impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> EventMetadata {
        EventMetadata {
            platform: "linux".to_string(),
            os_version: "6.1.0".to_string(),
            app_version: "1.2.3".to_string(),
            locale: "en_US".to_string(),
        }
    }

    #[test]
    fn test_event_round_trip() {
        let event = Event::new("purchase", "a".repeat(32), None, sample_metadata());
        let json = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_event_round_trip_with_screen() {
        let event = Event::new(
            "view_product",
            "b".repeat(32),
            Some("ProductDetail".to_string()),
            sample_metadata(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_metadata_is_flattened() {
        let event = Event::new("e", "c".repeat(32), None, sample_metadata());
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["platform"], "linux");
        assert_eq!(value["os_version"], "6.1.0");
        assert_eq!(value["app_version"], "1.2.3");
        assert_eq!(value["locale"], "en_US");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let event = Event::new("e", "d".repeat(32), None, sample_metadata());
        let parsed = chrono::DateTime::parse_from_rfc3339(&event.timestamp).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[cfg(not(any(feature = "identify", feature = "properties")))]
    #[test]
    fn test_strict_payload_allowlist() {
        let event = Event::new(
            "e",
            "e".repeat(32),
            Some("Home".to_string()),
            sample_metadata(),
        );
        let value = serde_json::to_value(&event).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

        let mut expected = vec![
            "app_version",
            "event_name",
            "locale",
            "os_version",
            "platform",
            "screen",
            "session_id",
            "timestamp",
        ];
        expected.sort_unstable();
        let mut actual = keys.clone();
        actual.sort_unstable();
        assert_eq!(actual, expected);

        for forbidden in ["user_id", "properties", "metadata", "custom"] {
            assert!(value.get(forbidden).is_none(), "payload leaked `{forbidden}`");
        }
    }

    #[test]
    fn test_screen_omitted_when_absent() {
        let event = Event::new("e", "f".repeat(32), None, sample_metadata());
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("screen").is_none());
    }

    #[cfg(feature = "properties")]
    #[test]
    fn test_property_value_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("plan".to_string(), PropertyValue::from("pro"));
        map.insert("seats".to_string(), PropertyValue::from(12_i64));
        map.insert("discount".to_string(), PropertyValue::from(0.25));
        map.insert("trial".to_string(), PropertyValue::from(false));
        map.insert("tags".to_string(), PropertyValue::List(vec![
            PropertyValue::from("a"),
            PropertyValue::Null,
        ]));

        let json = serde_json::to_string(&map).unwrap();
        let decoded: BTreeMap<String, PropertyValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, decoded);
    }

    #[cfg(feature = "properties")]
    #[test]
    fn test_property_value_serializes_to_natural_json() {
        assert_eq!(
            serde_json::to_value(PropertyValue::from("x")).unwrap(),
            serde_json::json!("x")
        );
        assert_eq!(
            serde_json::to_value(PropertyValue::from(3_i64)).unwrap(),
            serde_json::json!(3)
        );
        assert_eq!(
            serde_json::to_value(PropertyValue::Null).unwrap(),
            serde_json::Value::Null
        );
    }
}
