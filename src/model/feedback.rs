//! Hot/cold feedback aggregates and the resolved result sent to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Window applied when the caller does not ask for one.
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// Trailing interval an aggregate covers, serialized as `{"minutes": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedbackWindow {
    pub minutes: i64,
}

impl FeedbackWindow {
    pub fn minutes(minutes: i64) -> Self {
        Self { minutes }
    }
}

impl Default for FeedbackWindow {
    fn default() -> Self {
        Self::minutes(DEFAULT_WINDOW_MINUTES)
    }
}

/// One upstream feedback aggregate.
///
/// A record without a sensor is a global (cross-sensor) figure. Records are
/// never mutated once written; newer figures arrive as new rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: u64,
    /// Business id of the sensor, `None` for a global aggregate
    pub sensor_id: Option<String>,
    pub cold_count: u32,
    pub hot_count: u32,
    #[serde(default)]
    pub window: FeedbackWindow,
    /// When upstream last refreshed this aggregate
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn is_global(&self) -> bool {
        self.sensor_id.is_none()
    }
}

/// A feedback row that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub sensor_id: Option<String>,
    pub cold_count: u32,
    pub hot_count: u32,
    pub window: FeedbackWindow,
    pub updated_at: DateTime<Utc>,
}

impl NewFeedback {
    /// Per-sensor aggregate with the default window.
    pub fn for_sensor(
        sensor_id: impl Into<String>,
        cold_count: u32,
        hot_count: u32,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            cold_count,
            hot_count,
            window: FeedbackWindow::default(),
            updated_at,
        }
    }

    /// Global aggregate with the default window.
    pub fn global(cold_count: u32, hot_count: u32, updated_at: DateTime<Utc>) -> Self {
        Self {
            sensor_id: None,
            cold_count,
            hot_count,
            window: FeedbackWindow::default(),
            updated_at,
        }
    }
}

/// What `/api/feedback` answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    /// Always `null` for composite sums
    pub sensor_id: Option<String>,
    pub cold_count: u64,
    pub hot_count: u64,
    pub window: FeedbackWindow,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackResult {
    /// Well-formed empty answer for a window with no data.
    pub fn zero(window: FeedbackWindow, now: DateTime<Utc>) -> Self {
        Self {
            sensor_id: None,
            cold_count: 0,
            hot_count: 0,
            window,
            updated_at: now,
        }
    }
}

impl From<&FeedbackRecord> for FeedbackResult {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            sensor_id: record.sensor_id.clone(),
            cold_count: u64::from(record.cold_count),
            hot_count: u64::from(record.hot_count),
            window: record.window,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_shape() {
        let now = Utc::now();
        let json = serde_json::to_value(FeedbackResult::zero(FeedbackWindow::minutes(30), now))
            .unwrap();

        assert!(json["sensorId"].is_null());
        assert_eq!(json["coldCount"], 0);
        assert_eq!(json["hotCount"], 0);
        assert_eq!(json["window"]["minutes"], 30);
        assert!(json["updatedAt"].as_str().is_some());
    }

    #[test]
    fn test_record_window_defaults_to_fifteen_minutes() {
        let json = serde_json::json!({
            "id": 7,
            "sensorId": null,
            "coldCount": 4,
            "hotCount": 2,
            "updatedAt": "2024-05-01T10:00:00Z"
        });
        let record: FeedbackRecord = serde_json::from_value(json).unwrap();

        assert!(record.is_global());
        assert_eq!(record.window, FeedbackWindow::minutes(DEFAULT_WINDOW_MINUTES));
    }
}
