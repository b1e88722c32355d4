//! In-memory dataset backed by an optional JSON file.

use super::{FeedbackStore, LatestPerSensor, SiteStore, StoreError};
use crate::model::{
    AssetType, FeedbackRecord, HealthCounts, HealthStatus, MapAsset, NewFeedback, Sensor,
    SensorHealth,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Every table of the sensor map, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub map_assets: Vec<MapAsset>,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
    #[serde(default)]
    pub health: Vec<SensorHealth>,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
}

impl Dataset {
    /// Small demo floor: one SVG plan, a fresh and a stale sensor, and one
    /// feedback row per sensor.
    pub fn sample(now: DateTime<Utc>) -> Self {
        let fresh_seen = now - Duration::seconds(20);
        let stale_seen = now - Duration::minutes(30);

        Self {
            map_assets: vec![MapAsset {
                id: 1,
                asset_type: AssetType::Svg,
                view_box: Some([0.0, 0.0, 1000.0, 700.0]),
                url: "/assets/maps/placeholder.svg".to_string(),
                created_at: now,
                updated_at: now,
            }],
            sensors: vec![
                Sensor::new("S-001", 0.12, 0.45, 23.5, fresh_seen).with_battery(85),
                Sensor::new("S-002", 0.72, 0.15, 26.1, stale_seen),
            ],
            health: vec![
                SensorHealth::new("S-001", HealthStatus::Connected, fresh_seen, 12),
                SensorHealth::new("S-002", HealthStatus::Disconnected, stale_seen, 999),
            ],
            feedback: vec![
                sample_record(1, "S-001", 2, 1, now - Duration::minutes(1), now),
                sample_record(2, "S-002", 1, 0, now - Duration::minutes(2), now),
            ],
        }
    }
}

fn sample_record(
    id: u64,
    sensor_id: &str,
    cold_count: u32,
    hot_count: u32,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> FeedbackRecord {
    FeedbackRecord {
        id,
        sensor_id: Some(sensor_id.to_string()),
        cold_count,
        hot_count,
        window: Default::default(),
        updated_at,
        created_at,
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    dataset: RwLock<Dataset>,
    /// Where [`MemoryStore::save`] writes to
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: RwLock::new(dataset),
            persist_path: None,
        }
    }

    /// Open a dataset file. A missing file yields an empty store that will
    /// be written to `path` on save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dataset = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| StoreError::IoError(e.to_string()))?;
            serde_json::from_str(&content).map_err(|e| StoreError::ParseError(e.to_string()))?
        } else {
            tracing::warn!("Dataset {} not found, starting empty", path.display());
            Dataset::default()
        };

        tracing::debug!(
            sensors = dataset.sensors.len(),
            feedback = dataset.feedback.len(),
            "Loaded dataset from {}",
            path.display()
        );

        Ok(Self {
            dataset: RwLock::new(dataset),
            persist_path: Some(path),
        })
    }

    /// Back the store with `path`, replacing whatever is there on save.
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    /// Write the dataset to its backing file, if it has one.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let json = {
            let dataset = self.read()?;
            serde_json::to_string_pretty(&*dataset)
                .map_err(|e| StoreError::SerializeError(e.to_string()))?
        };

        std::fs::write(path, json).map_err(|e| StoreError::IoError(e.to_string()))
    }

    /// Copy of the current dataset.
    pub fn snapshot(&self) -> Result<Dataset, StoreError> {
        Ok(self.read()?.clone())
    }

    /// Insert a sensor, replacing any sensor with the same id.
    pub fn upsert_sensor(&self, sensor: Sensor) -> Result<(), StoreError> {
        let mut dataset = self.write()?;
        let existing = dataset
            .sensors
            .iter()
            .position(|s| s.sensor_id == sensor.sensor_id);

        match existing {
            Some(index) => {
                let created_at = dataset.sensors[index].created_at;
                dataset.sensors[index] = Sensor {
                    created_at,
                    updated_at: Utc::now(),
                    ..sensor
                };
            }
            None => dataset.sensors.push(sensor),
        }
        Ok(())
    }

    /// Set the health snapshot of a sensor (one row per sensor).
    pub fn upsert_health(&self, health: SensorHealth) -> Result<(), StoreError> {
        let mut dataset = self.write()?;
        dataset.health.retain(|h| h.sensor_id != health.sensor_id);
        dataset.health.push(health);
        Ok(())
    }

    /// Append a feedback row and return it with its assigned id.
    pub fn insert_feedback(&self, feedback: NewFeedback) -> Result<FeedbackRecord, StoreError> {
        let mut dataset = self.write()?;
        let id = dataset.feedback.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = FeedbackRecord {
            id,
            sensor_id: feedback.sensor_id,
            cold_count: feedback.cold_count,
            hot_count: feedback.hot_count,
            window: feedback.window,
            updated_at: feedback.updated_at,
            created_at: Utc::now(),
        };
        dataset.feedback.push(record.clone());
        Ok(record)
    }

    /// Append a map asset and return it with its assigned id.
    pub fn insert_map_asset(
        &self,
        asset_type: AssetType,
        view_box: Option<[f64; 4]>,
        url: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<MapAsset, StoreError> {
        let mut dataset = self.write()?;
        let id = dataset.map_assets.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let asset = MapAsset {
            id,
            asset_type,
            view_box,
            url: url.into(),
            created_at: Utc::now(),
            updated_at,
        };
        dataset.map_assets.push(asset.clone());
        Ok(asset)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Dataset>, StoreError> {
        self.dataset
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Dataset>, StoreError> {
        self.dataset
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl FeedbackStore for MemoryStore {
    fn global_latest(&self) -> Result<Option<FeedbackRecord>, StoreError> {
        let dataset = self.read()?;
        Ok(dataset
            .feedback
            .iter()
            .filter(|r| r.is_global())
            .max_by_key(|r| (r.updated_at, r.id))
            .cloned())
    }

    fn latest_per_sensor_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<LatestPerSensor, StoreError> {
        let dataset = self.read()?;
        let mut latest = LatestPerSensor::new();

        for record in dataset.feedback.iter().filter(|r| r.updated_at >= since) {
            let Some(ref sensor_id) = record.sensor_id else {
                continue;
            };
            latest
                .entry(sensor_id.clone())
                .and_modify(|seen| *seen = (*seen).max(record.updated_at))
                .or_insert(record.updated_at);
        }

        Ok(latest)
    }

    fn select_latest(&self, latest: &LatestPerSensor) -> Result<Vec<FeedbackRecord>, StoreError> {
        let dataset = self.read()?;
        let mut selected: Vec<FeedbackRecord> = dataset
            .feedback
            .iter()
            .filter(|r| match r.sensor_id {
                Some(ref sensor_id) => latest.get(sensor_id) == Some(&r.updated_at),
                None => false,
            })
            .cloned()
            .collect();

        selected.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id).then(a.id.cmp(&b.id)));
        Ok(selected)
    }
}

impl SiteStore for MemoryStore {
    fn latest_map_asset(&self) -> Result<Option<MapAsset>, StoreError> {
        let dataset = self.read()?;
        Ok(dataset
            .map_assets
            .iter()
            .max_by_key(|a| (a.updated_at, a.id))
            .cloned())
    }

    fn sensors(&self, seen_since: Option<DateTime<Utc>>) -> Result<Vec<Sensor>, StoreError> {
        let dataset = self.read()?;
        let mut sensors: Vec<Sensor> = dataset
            .sensors
            .iter()
            .filter(|s| seen_since.map_or(true, |since| s.last_seen_at >= since))
            .cloned()
            .collect();
        sensors.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id));
        Ok(sensors)
    }

    fn sensor_health(&self) -> Result<Vec<SensorHealth>, StoreError> {
        let dataset = self.read()?;
        let mut health = dataset.health.clone();
        health.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id));
        Ok(health)
    }

    fn health_counts(&self) -> Result<HealthCounts, StoreError> {
        let dataset = self.read()?;
        let mut counts = HealthCounts::default();
        for health in &dataset.health {
            counts.record(health.status);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dataset_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("sensor-map-store-test")
            .join(format!("{name}-{}.json", std::process::id()))
    }

    #[test]
    fn test_global_latest_breaks_ties_by_id() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.insert_feedback(NewFeedback::global(1, 1, now)).unwrap();
        let second = store.insert_feedback(NewFeedback::global(5, 6, now)).unwrap();
        store
            .insert_feedback(NewFeedback::global(9, 9, now - Duration::minutes(3)))
            .unwrap();

        let latest = store.global_latest().unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.cold_count, 5);
    }

    #[test]
    fn test_latest_per_sensor_ignores_globals_and_old_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let since = now - Duration::minutes(15);

        store
            .insert_feedback(NewFeedback::for_sensor("S-001", 1, 0, now - Duration::minutes(10)))
            .unwrap();
        store
            .insert_feedback(NewFeedback::for_sensor("S-001", 2, 0, now - Duration::minutes(4)))
            .unwrap();
        store
            .insert_feedback(NewFeedback::for_sensor("S-002", 3, 0, now - Duration::minutes(20)))
            .unwrap();
        store.insert_feedback(NewFeedback::global(9, 9, now)).unwrap();

        let latest = store.latest_per_sensor_since(since).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["S-001"], now - Duration::minutes(4));
    }

    #[test]
    fn test_select_latest_joins_on_sensor_and_timestamp() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .insert_feedback(NewFeedback::for_sensor("S-001", 1, 0, now - Duration::minutes(10)))
            .unwrap();
        let fresh = store
            .insert_feedback(NewFeedback::for_sensor("S-001", 2, 0, now - Duration::minutes(4)))
            .unwrap();

        let latest = store
            .latest_per_sensor_since(now - Duration::minutes(15))
            .unwrap();
        let selected = store.select_latest(&latest).unwrap();

        assert_eq!(selected, vec![fresh]);
    }

    #[test]
    fn test_sensors_filtered_by_last_seen() {
        let now = Utc::now();
        let store = MemoryStore::from_dataset(Dataset::sample(now));

        let all = store.sensors(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sensor_id, "S-001");

        let recent = store.sensors(Some(now - Duration::minutes(10))).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].sensor_id, "S-001");
    }

    #[test]
    fn test_upsert_sensor_replaces_by_id() {
        let now = Utc::now();
        let store = MemoryStore::from_dataset(Dataset::sample(now));
        let created_at = store.snapshot().unwrap().sensors[1].created_at;

        store
            .upsert_sensor(Sensor::new("S-002", 0.7, 0.2, 19.0, now))
            .unwrap();

        let sensors = store.sensors(None).unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[1].temperature_c, 19.0);
        assert_eq!(sensors[1].last_seen_at, now);
        assert_eq!(sensors[1].created_at, created_at);
    }

    #[test]
    fn test_health_counts() {
        let store = MemoryStore::from_dataset(Dataset::sample(Utc::now()));
        let counts = store.health_counts().unwrap();

        assert_eq!(counts.connected, 1);
        assert_eq!(counts.disconnected, 1);
    }

    #[test]
    fn test_upsert_health_keeps_one_row_per_sensor() {
        let store = MemoryStore::from_dataset(Dataset::sample(Utc::now()));
        store
            .upsert_health(SensorHealth::new(
                "S-002",
                HealthStatus::Connected,
                Utc::now(),
                3,
            ))
            .unwrap();

        let health = store.sensor_health().unwrap();
        assert_eq!(health.len(), 2);
        assert_eq!(health[1].status, HealthStatus::Connected);
        assert_eq!(store.health_counts().unwrap().connected, 2);
    }

    #[test]
    fn test_latest_map_asset() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(store.latest_map_asset().unwrap().is_none());

        store
            .insert_map_asset(AssetType::Png, None, "/old.png", now - Duration::hours(1))
            .unwrap();
        store
            .insert_map_asset(AssetType::Svg, Some([0.0, 0.0, 10.0, 10.0]), "/new.svg", now)
            .unwrap();

        let asset = store.latest_map_asset().unwrap().unwrap();
        assert_eq!(asset.url, "/new.svg");
        assert_eq!(asset.asset_type, AssetType::Svg);
    }

    #[test]
    fn test_save_and_open() {
        let path = temp_dataset_path("save-open");
        let _ = std::fs::remove_file(&path);

        let store = MemoryStore::open(&path).unwrap();
        assert!(store.snapshot().unwrap().sensors.is_empty());

        store
            .upsert_sensor(Sensor::new("S-010", 0.5, 0.5, 21.0, Utc::now()))
            .unwrap();
        store
            .insert_feedback(NewFeedback::for_sensor("S-010", 4, 1, Utc::now()))
            .unwrap();
        store.save().unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        let dataset = reopened.snapshot().unwrap();
        assert_eq!(dataset.sensors.len(), 1);
        assert_eq!(dataset.feedback.len(), 1);
        assert_eq!(dataset.feedback[0].cold_count, 4);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_open_rejects_malformed_file() {
        let path = temp_dataset_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = MemoryStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::ParseError(_)));

        let _ = std::fs::remove_file(&path);
    }
}
