//! Sensor Map API - read-mostly HTTP API over a floor plan of sensors.
//!
//! Sensors sit on a floor-plan map and report temperature, connectivity
//! health and periodic hot/cold comfort feedback. This crate serves that
//! dataset to a browser front end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Sensor Map API                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐   │
//! │  │   server    │──▶│ FeedbackResolver │──▶│              │   │
//! │  │   (axum)    │   └──────────────────┘   │  SiteStore   │   │
//! │  │             │─────────────────────────▶│  (memory +   │   │
//! │  └─────────────┘                          │   JSON file) │   │
//! │                                           └──────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use sensor_map_api::{FeedbackResolver, MemoryStore, NewFeedback};
//!
//! let store = MemoryStore::new();
//! let now = Utc::now();
//! store
//!     .insert_feedback(NewFeedback::for_sensor("S-001", 2, 1, now - Duration::minutes(1)))
//!     .unwrap();
//!
//! let result = FeedbackResolver::new(&store).resolve_at(None, now).unwrap();
//! assert_eq!(result.cold_count, 2);
//! assert_eq!(result.window.minutes, 15);
//! ```

pub mod config;
pub mod feedback;
pub mod model;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use feedback::{FeedbackResolver, ResolveError};
pub use model::{
    FeedbackRecord, FeedbackResult, FeedbackWindow, MapAsset, NewFeedback, Sensor, SensorHealth,
    DEFAULT_WINDOW_MINUTES,
};
pub use store::{Dataset, FeedbackStore, MemoryStore, SiteStore, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
