//! Hot/cold feedback resolution.
//!
//! Turns the stored per-sensor and global feedback aggregates into the one
//! figure the floor-plan view displays.

pub mod resolver;

pub use resolver::{
    latest_per_sensor, parse_window, sum_latest, window_start, FeedbackResolver, ResolveError,
    INVALID_WINDOW_MESSAGE,
};
