//! Feedback resolution.
//!
//! A global aggregate always wins, however old it is. Without one, the
//! newest record of every sensor inside the trailing window is summed:
//!
//! ```text
//! global_latest() ──Some──▶ return it
//!       │ None
//!       ▼
//! latest_per_sensor_since(now - window)   sensor ─▶ max(updated_at)
//!       │ empty ──▶ zero result
//!       ▼
//! select_latest(pairs) ──▶ one row per sensor ──▶ sum cold/hot, max updated_at
//! ```

use crate::model::{FeedbackRecord, FeedbackResult, FeedbackWindow};
use crate::store::{FeedbackStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Message returned for a window that is not a whole number of minutes.
pub const INVALID_WINDOW_MESSAGE: &str = "window must be integer minutes";

/// Parse the `window` request parameter. Absent means the default window.
pub fn parse_window(raw: Option<&str>) -> Result<FeedbackWindow, ResolveError> {
    match raw {
        None => Ok(FeedbackWindow::default()),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(FeedbackWindow::minutes)
            .map_err(|_| ResolveError::InvalidWindow),
    }
}

/// Start of the trailing window ending at `now`.
pub fn window_start(
    window: FeedbackWindow,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ResolveError> {
    Duration::try_minutes(window.minutes)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or(ResolveError::InvalidWindow)
}

/// Resolves the feedback figure shown for the whole floor.
pub struct FeedbackResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: FeedbackStore + ?Sized> FeedbackResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve against the current time.
    pub fn resolve(&self, window: Option<&str>) -> Result<FeedbackResult, ResolveError> {
        self.resolve_at(window, Utc::now())
    }

    /// Resolve with an explicit `now`. Same store contents and same `now`
    /// always give the same result.
    pub fn resolve_at(
        &self,
        window: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<FeedbackResult, ResolveError> {
        let window = parse_window(window)?;
        let since = window_start(window, now)?;

        if let Some(global) = self.store.global_latest()? {
            tracing::debug!(id = global.id, "Using global feedback aggregate");
            return Ok(FeedbackResult::from(&global));
        }

        let latest = self.store.latest_per_sensor_since(since)?;
        if latest.is_empty() {
            tracing::debug!(minutes = window.minutes, "No sensor feedback inside window");
            return Ok(FeedbackResult::zero(window, now));
        }

        let selected = self.store.select_latest(&latest)?;
        tracing::debug!(
            sensors = latest.len(),
            rows = selected.len(),
            "Summing latest feedback per sensor"
        );
        Ok(sum_latest(&selected, window, now))
    }
}

/// Keep one record per sensor: the newest, then the highest id.
pub fn latest_per_sensor<'r>(
    records: impl IntoIterator<Item = &'r FeedbackRecord>,
) -> BTreeMap<&'r str, &'r FeedbackRecord> {
    let mut best: BTreeMap<&'r str, &'r FeedbackRecord> = BTreeMap::new();

    for record in records {
        let Some(sensor_id) = record.sensor_id.as_deref() else {
            continue;
        };
        best.entry(sensor_id)
            .and_modify(|current| {
                if (record.updated_at, record.id) > (current.updated_at, current.id) {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    best
}

/// Cross-sensor sum of the selected rows.
///
/// `updated_at` is the newest contributing row, or `now` if nothing contributes.
pub fn sum_latest(
    selected: &[FeedbackRecord],
    window: FeedbackWindow,
    now: DateTime<Utc>,
) -> FeedbackResult {
    let per_sensor = latest_per_sensor(selected);

    let mut result = FeedbackResult::zero(window, now);
    let mut newest: Option<DateTime<Utc>> = None;

    for record in per_sensor.values() {
        result.cold_count += u64::from(record.cold_count);
        result.hot_count += u64::from(record.hot_count);
        newest = newest.max(Some(record.updated_at));
    }

    if let Some(newest) = newest {
        result.updated_at = newest;
    }
    result
}

/// Resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The window parameter is not a usable number of minutes
    InvalidWindow,
    Store(StoreError),
}

impl ResolveError {
    /// Error code reported to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidWindow => "BAD_REQUEST",
            ResolveError::Store(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        ResolveError::Store(err)
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::InvalidWindow => f.write_str(INVALID_WINDOW_MESSAGE),
            ResolveError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::InvalidWindow => None,
            ResolveError::Store(e) => Some(e),
        }
    }
}
