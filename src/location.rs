//! Latest-fix location tracker
//!
//! Keeps only the single most-recent position: for emergency response the
//! question is "where is the device right now", so there is no history, no
//! smoothing, and no distance-delta validation. Memory stays O(1).

use crate::types::LocationState;
use chrono::Utc;

/// Single-slot tracker for the most recent GPS fix
#[derive(Debug, Clone, Default)]
pub struct LocationTracker {
    state: Option<LocationState>,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite the stored fix and stamp the receipt time
    pub fn update(&mut self, latitude: f64, longitude: f64) {
        self.state = Some(LocationState {
            latitude,
            longitude,
            updated_at: Utc::now(),
        });
    }

    /// The latest fix, or `None` only before the first fix has ever arrived
    pub fn get(&self) -> Option<LocationState> {
        self.state
    }
}
