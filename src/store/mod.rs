//! Read access to the sensor-map dataset.
//!
//! The feedback resolver only needs [`FeedbackStore`]; the HTTP layer works
//! against the wider [`SiteStore`]. [`MemoryStore`] implements both over a
//! JSON dataset file.

pub mod memory;

use crate::model::{FeedbackRecord, HealthCounts, MapAsset, Sensor, SensorHealth};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub use memory::{Dataset, MemoryStore};

/// Latest `updated_at` per sensor id.
pub type LatestPerSensor = BTreeMap<String, DateTime<Utc>>;

/// The three reads feedback resolution is built from.
pub trait FeedbackStore {
    /// Most recent global record, ordered by `updated_at` then `id`, both descending.
    fn global_latest(&self) -> Result<Option<FeedbackRecord>, StoreError>;

    /// For every sensor with a record at or after `since`, the newest such
    /// `updated_at`. Global records are ignored.
    fn latest_per_sensor_since(&self, since: DateTime<Utc>)
        -> Result<LatestPerSensor, StoreError>;

    /// Records whose `(sensor_id, updated_at)` pair appears in `latest`.
    fn select_latest(&self, latest: &LatestPerSensor) -> Result<Vec<FeedbackRecord>, StoreError>;
}

/// Everything the HTTP API reads.
pub trait SiteStore: FeedbackStore + Send + Sync {
    /// Newest floor-plan asset by `updated_at`, ties broken by highest id.
    fn latest_map_asset(&self) -> Result<Option<MapAsset>, StoreError>;

    /// Sensors ordered by id, optionally only those seen at or after `seen_since`.
    fn sensors(&self, seen_since: Option<DateTime<Utc>>) -> Result<Vec<Sensor>, StoreError>;

    /// Health rows ordered by sensor id.
    fn sensor_health(&self) -> Result<Vec<SensorHealth>, StoreError>;

    fn health_counts(&self) -> Result<HealthCounts, StoreError>;
}

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing state cannot be read (e.g. a poisoned lock)
    Unavailable(String),
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "Store unavailable: {e}"),
            StoreError::IoError(e) => write!(f, "IO error: {e}"),
            StoreError::ParseError(e) => write!(f, "Parse error: {e}"),
            StoreError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
