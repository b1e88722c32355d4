//! Data model for the sensor map.

pub mod feedback;
pub mod types;

pub use feedback::{
    FeedbackRecord, FeedbackResult, FeedbackWindow, NewFeedback, DEFAULT_WINDOW_MINUTES,
};
pub use types::{
    AssetType, CoordinateMeta, HealthCounts, HealthStatus, MapAsset, MapAssetView, Sensor,
    SensorHealth, SensorView, COORDINATE_META,
};
