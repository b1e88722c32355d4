//! Floor-plan entities: sensors, their connectivity health and map assets.
//!
//! Wire names are camelCase. Bookkeeping timestamps (`created_at`,
//! `updated_at`) are persisted in the dataset file but never sent to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical sensor placed on the floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    /// Business identifier, e.g. `S-001`
    pub sensor_id: String,
    /// Local x coordinate (0..1 or SVG units, not range-checked)
    pub x: f64,
    /// Local y coordinate (0..1 or SVG units, not range-checked)
    pub y: f64,
    /// Last reported temperature in degrees Celsius
    pub temperature_c: f64,
    /// Battery level in percent, if the sensor reports one
    pub battery_pct: Option<u8>,
    /// Time of the last report
    pub last_seen_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Sensor {
    pub fn new(
        sensor_id: impl Into<String>,
        x: f64,
        y: f64,
        temperature_c: f64,
        last_seen_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sensor_id: sensor_id.into(),
            x,
            y,
            temperature_c,
            battery_pct: None,
            last_seen_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_battery(mut self, battery_pct: u8) -> Self {
        self.battery_pct = Some(battery_pct);
        self
    }

    pub fn to_view(&self) -> SensorView {
        SensorView {
            sensor_id: self.sensor_id.clone(),
            x: self.x,
            y: self.y,
            temperature_c: self.temperature_c,
            battery_pct: self.battery_pct,
            last_seen_at: self.last_seen_at,
        }
    }
}

/// Client-facing projection of a [`Sensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorView {
    pub sensor_id: String,
    pub x: f64,
    pub y: f64,
    pub temperature_c: f64,
    pub battery_pct: Option<u8>,
    pub last_seen_at: DateTime<Utc>,
}

/// Connectivity status of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Connected,
    Disconnected,
}

/// Materialized health snapshot, one per sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorHealth {
    pub sensor_id: String,
    pub status: HealthStatus,
    /// Mirrors [`Sensor::last_seen_at`]
    pub last_seen_at: DateTime<Utc>,
    /// Estimated reporting latency in seconds
    pub latency_sec: u32,
}

impl SensorHealth {
    pub fn new(
        sensor_id: impl Into<String>,
        status: HealthStatus,
        last_seen_at: DateTime<Utc>,
        latency_sec: u32,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            status,
            last_seen_at,
            latency_sec,
        }
    }
}

/// Per-status health totals. Both keys are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCounts {
    pub connected: u64,
    pub disconnected: u64,
}

impl HealthCounts {
    pub fn record(&mut self, status: HealthStatus) {
        match status {
            HealthStatus::Connected => self.connected += 1,
            HealthStatus::Disconnected => self.disconnected += 1,
        }
    }
}

/// Image format of a floor-plan asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Svg,
    Png,
    Jpg,
}

/// A floor-plan image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapAsset {
    #[serde(default)]
    pub id: u64,
    pub asset_type: AssetType,
    /// `[x, y, w, h]`, only meaningful for SVG
    pub view_box: Option<[f64; 4]>,
    /// Relative or absolute location of the image
    pub url: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl MapAsset {
    pub fn to_view(&self) -> MapAssetView {
        MapAssetView {
            asset_type: self.asset_type,
            view_box: self.view_box,
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapAssetView {
    pub asset_type: AssetType,
    pub view_box: Option<[f64; 4]>,
    pub url: String,
}

/// Orientation of the floor-plan coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateMeta {
    pub origin: &'static str,
    pub x_axis: &'static str,
    pub y_axis: &'static str,
}

/// Screen-style axes: origin top-left, y grows downwards.
pub const COORDINATE_META: CoordinateMeta = CoordinateMeta {
    origin: "top-left",
    x_axis: "right",
    y_axis: "down",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_view_is_camel_case() {
        let sensor = Sensor::new("S-001", 0.12, 0.45, 23.5, Utc::now()).with_battery(85);
        let json = serde_json::to_value(sensor.to_view()).unwrap();

        assert_eq!(json["sensorId"], "S-001");
        assert_eq!(json["temperatureC"], 23.5);
        assert_eq!(json["batteryPct"], 85);
        assert!(json.get("lastSeenAt").is_some());
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_health_status_wire_names() {
        let json = serde_json::to_string(&HealthStatus::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");

        let health = SensorHealth::new("S-002", HealthStatus::Connected, Utc::now(), 12);
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "connected");
        assert_eq!(json["latencySec"], 12);
    }

    #[test]
    fn test_health_counts_record() {
        let mut counts = HealthCounts::default();
        counts.record(HealthStatus::Connected);
        counts.record(HealthStatus::Connected);
        counts.record(HealthStatus::Disconnected);

        assert_eq!(counts.connected, 2);
        assert_eq!(counts.disconnected, 1);
    }

    #[test]
    fn test_coordinate_meta_serialization() {
        let json = serde_json::to_value(COORDINATE_META).unwrap();
        assert_eq!(json["origin"], "top-left");
        assert_eq!(json["xAxis"], "right");
        assert_eq!(json["yAxis"], "down");
    }
}
