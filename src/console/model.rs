//! Device configuration and live status data model.
//!
//! The configuration arrives from the firmware as loosely-typed JSON, so it is
//! parsed as a `serde_json::Value` and normalized field by field instead of
//! being deserialized strictly. A device record with a missing or mistyped
//! field still loads with a sensible default.

use std::collections::HashMap;
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Highest bus address, and the maximum number of configured devices.
pub const MAX_DEVICES: usize = 15;

/// Configuration format version assumed when the firmware omits one.
pub const DEFAULT_FORMAT: i64 = 1;

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Bus address as stored by the firmware.
///
/// The firmware keeps whatever number it was given. A fractional address is
/// carried unchanged and flagged by validation instead of being replaced by
/// another device's address.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Address(f64);

impl Address {
    pub fn new(address: i64) -> Self {
        Self(address as f64)
    }

    /// `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The address as an integer, `None` when it is fractional.
    pub fn as_integer(&self) -> Option<i64> {
        (self.0.fract() == 0.0 && self.0.abs() <= MAX_EXACT_INTEGER).then_some(self.0 as i64)
    }
}

impl From<i64> for Address {
    fn from(address: i64) -> Self {
        Self::new(address)
    }
}

impl PartialEq<i64> for Address {
    fn eq(&self, other: &i64) -> bool {
        self.as_integer() == Some(*other)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_integer() {
            Some(address) => write!(f, "{}", address),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(address) => serializer.serialize_i64(address),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Address::from_f64(value).ok_or_else(|| de::Error::custom("address must be finite"))
    }
}

/// One physical device's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub enabled: bool,
    pub address: Address,
    pub name: String,
    pub calibration: f64,
    pub reversed: bool,
}

impl DeviceConfig {
    /// Name used as the join key against live status.
    pub fn status_key(&self) -> &str {
        self.name.trim()
    }
}

/// Full device configuration as persisted by the firmware.
///
/// `format` and `network` are opaque to the console and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub format: i64,
    pub network: Value,
    pub devices: Vec<DeviceConfig>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT,
            network: Value::Object(Map::new()),
            devices: Vec::new(),
        }
    }
}

impl Configuration {
    /// Normalize a raw `/config` document.
    ///
    /// Missing or mistyped fields are replaced with defaults and devices are
    /// sorted by ascending address. Never fails.
    pub fn normalize(raw: &Value) -> Self {
        let format = raw
            .get("format")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_FORMAT);

        let network = match raw.get("network") {
            Some(value) if !is_falsy(value) => value.clone(),
            _ => Value::Object(Map::new()),
        };

        let mut devices: Vec<DeviceConfig> = raw
            .get("devices")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .enumerate()
                    .map(|(idx, device)| normalize_device(device, idx))
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort keeps the server order for equal addresses
        devices.sort_by(|a, b| a.address.value().total_cmp(&b.address.value()));

        Self {
            format,
            network,
            devices,
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_full(&self) -> bool {
        self.devices.len() >= MAX_DEVICES
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn normalize_device(raw: &Value, idx: usize) -> DeviceConfig {
    let address = raw
        .get("address")
        .and_then(Value::as_f64)
        .and_then(Address::from_f64)
        .unwrap_or_else(|| Address::new(idx as i64 + 1));

    let name = match raw.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => format!("Device {}", address),
    };

    let calibration = raw
        .get("calibration")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .unwrap_or(1.0);

    DeviceConfig {
        enabled: raw.get("enabled").and_then(Value::as_bool).unwrap_or(true),
        address,
        name,
        calibration,
        reversed: raw.get("reversed").and_then(Value::as_bool).unwrap_or(false),
    }
}

// =============================================================================
// Live status
// =============================================================================

/// One device's live electrical reading from `/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetrics {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub volts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amps: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pf: Option<f64>,
    /// Line frequency; reported by newer firmware only
    #[serde(default, deserialize_with = "lenient_number")]
    pub hz: Option<f64>,
}

/// Response of `GET /status`. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_metrics")]
    pub devices: Vec<DeviceMetrics>,
}

impl StatusSnapshot {
    /// Index metrics by trimmed device name.
    ///
    /// Nameless entries are skipped. When two entries share a name the later
    /// one in the server's list wins.
    pub fn by_name(&self) -> HashMap<String, DeviceMetrics> {
        let mut map = HashMap::new();
        for metrics in &self.devices {
            let Some(name) = metrics.name.as_deref().map(str::trim) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            map.insert(name.to_string(), metrics.clone());
        }
        map
    }
}

/// Accept a JSON number or a numeric string; everything else is absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Accept a JSON string; any other type is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Accept a list of metric objects. A non-list is empty and entries that are
/// not objects are dropped.
fn lenient_metrics<'de, D>(deserializer: D) -> Result<Vec<DeviceMetrics>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

// =============================================================================
// Save status
// =============================================================================

/// Persistence state of the local configuration, surfaced as status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Loading,
    Loaded,
    LoadFailed,
    Invalid,
    Unsaved,
    Saving,
    Saved,
    SaveFailed,
}

/// Display variant for a [`SaveStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVariant {
    Saving,
    Ok,
    Error,
}

impl StatusVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusVariant::Saving => "saving",
            StatusVariant::Ok => "ok",
            StatusVariant::Error => "error",
        }
    }
}

impl SaveStatus {
    pub fn text(&self) -> &'static str {
        match self {
            SaveStatus::Loading => "Loading...",
            SaveStatus::Loaded => "Loaded",
            SaveStatus::LoadFailed => "Config load failed",
            SaveStatus::Invalid => "Fix highlighted fields",
            SaveStatus::Unsaved => "Unsaved changes",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved",
            SaveStatus::SaveFailed => "Save failed",
        }
    }

    pub fn variant(&self) -> StatusVariant {
        match self {
            SaveStatus::Loading | SaveStatus::Unsaved | SaveStatus::Saving => StatusVariant::Saving,
            SaveStatus::Loaded | SaveStatus::Saved => StatusVariant::Ok,
            SaveStatus::LoadFailed | SaveStatus::Invalid | SaveStatus::SaveFailed => {
                StatusVariant::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_empty_document() {
        let config = Configuration::normalize(&json!({}));
        assert_eq!(config.format, 1);
        assert_eq!(config.network, json!({}));
        assert!(config.devices.is_empty());
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn normalize_fills_device_defaults() {
        let config = Configuration::normalize(&json!({ "devices": [{}] }));
        assert_eq!(
            config.devices,
            vec![DeviceConfig {
                enabled: true,
                address: Address::new(1),
                name: "Device 1".to_string(),
                calibration: 1.0,
                reversed: false,
            }]
        );
    }

    #[test]
    fn normalize_keeps_opaque_fields_and_sorts() {
        let config = Configuration::normalize(&json!({
            "format": 3,
            "network": { "hostname": "auramon" },
            "devices": [
                { "address": 7, "name": "Dryer", "calibration": 1.02, "enabled": false },
                { "address": 2, "name": "Oven", "reversed": true },
                { "name": 42 }
            ]
        }));

        assert_eq!(config.format, 3);
        assert_eq!(config.network["hostname"], "auramon");
        let addresses: Vec<f64> = config.devices.iter().map(|d| d.address.value()).collect();
        // Third device takes its positional address (index 2 -> 3)
        assert_eq!(addresses, vec![2.0, 3.0, 7.0]);
        assert_eq!(config.devices[1].name, "Device 3");
        assert!(config.devices[0].reversed);
        assert!(!config.devices[2].enabled);
        assert_eq!(config.devices[2].calibration, 1.02);
    }

    #[test]
    fn normalize_replaces_mistyped_calibration() {
        let config = Configuration::normalize(&json!({
            "devices": [{ "address": 4, "calibration": "fast" }]
        }));
        assert_eq!(config.devices[0].calibration, 1.0);
        assert_eq!(config.devices[0].name, "Device 4");
    }

    #[test]
    fn normalize_keeps_float_encoded_addresses() {
        let config = Configuration::normalize(&json!({
            "devices": [
                { "address": 1, "name": "Mains" },
                { "address": 3.0, "name": "Oven" },
                { "address": 2.5, "name": "Odd" }
            ]
        }));

        let names: Vec<&str> = config.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Mains", "Odd", "Oven"]);
        assert_eq!(config.devices[2].address, 3);
        assert_eq!(config.devices[1].address.value(), 2.5);
        assert_eq!(config.devices[1].address.as_integer(), None);

        let saved = serde_json::to_value(&config).unwrap();
        assert_eq!(saved["devices"][2]["address"], json!(3));
        assert_eq!(saved["devices"][1]["address"], json!(2.5));
    }

    #[test]
    fn fractional_address_names_the_default() {
        let config = Configuration::normalize(&json!({ "devices": [{ "address": 4.5 }] }));
        assert_eq!(config.devices[0].name, "Device 4.5");
        assert_eq!(Address::new(4).to_string(), "4");
    }

    #[test]
    fn status_metrics_accept_numeric_strings() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "version": "1.4.0",
            "devices": [
                { "name": "Oven", "volts": "231.5", "amps": 2, "pf": null },
                { "name": "Pump", "volts": true }
            ],
            "stats": { "runSeconds": 12 }
        }))
        .unwrap();

        assert_eq!(snapshot.version.as_deref(), Some("1.4.0"));
        assert_eq!(snapshot.devices[0].volts, Some(231.5));
        assert_eq!(snapshot.devices[0].amps, Some(2.0));
        assert_eq!(snapshot.devices[0].pf, None);
        assert_eq!(snapshot.devices[1].volts, None);
    }

    #[test]
    fn status_tolerates_mistyped_fields() {
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "version": 12, "devices": null })).unwrap();
        assert_eq!(snapshot, StatusSnapshot::default());

        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "devices": [7, { "name": 7, "volts": 230 }, { "name": "Oven", "amps": 1.5 }]
        }))
        .unwrap();
        assert_eq!(snapshot.devices.len(), 2);
        assert_eq!(snapshot.devices[0].name, None);
        assert_eq!(snapshot.devices[0].volts, Some(230.0));
        assert_eq!(snapshot.by_name()["Oven"].amps, Some(1.5));

        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "devices": { "name": "Oven" } })).unwrap();
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn status_join_is_last_write_wins() {
        let snapshot = StatusSnapshot {
            version: None,
            devices: vec![
                DeviceMetrics {
                    name: Some("Oven".to_string()),
                    volts: Some(230.0),
                    ..Default::default()
                },
                DeviceMetrics {
                    name: Some(" Oven ".to_string()),
                    volts: Some(240.0),
                    ..Default::default()
                },
                DeviceMetrics {
                    name: Some(String::new()),
                    volts: Some(1.0),
                    ..Default::default()
                },
            ],
        };

        let map = snapshot.by_name();
        assert_eq!(map.len(), 1);
        assert_eq!(map["Oven"].volts, Some(240.0));
    }

    #[test]
    fn save_status_texts() {
        assert_eq!(SaveStatus::Invalid.text(), "Fix highlighted fields");
        assert_eq!(SaveStatus::Invalid.variant(), StatusVariant::Error);
        assert_eq!(SaveStatus::Unsaved.variant().as_str(), "saving");
        assert_eq!(SaveStatus::Saved.variant().as_str(), "ok");
    }
}
