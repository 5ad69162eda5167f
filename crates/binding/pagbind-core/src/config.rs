//! Binding configuration.

use serde::{Deserialize, Serialize};

use crate::error::BindingError;

/// Who moves `progress` forward while an animation plays.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressDriver {
    /// The native player runs its own clock; its update callbacks are written
    /// back into the state. Snapshot bindings treat this as `Caller`.
    #[default]
    Native,
    /// The binding's fixed-rate clock advances `progress` by one frame per tick
    /// while `is_playing` is set, wrapping from 1.0 back to 0.0.
    Clock,
    /// Nobody but the caller writes `progress`.
    Caller,
}

/// Accepted range for [`BindingConfig::tick_hz`].
pub const MIN_TICK_HZ: f32 = 1.0;
pub const MAX_TICK_HZ: f32 = 1000.0;
pub const DEFAULT_TICK_HZ: f32 = 60.0;

/// Configuration shared by live and snapshot bindings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub progress_driver: ProgressDriver,
    /// Tick rate of the progress clock in Hz, within
    /// [`MIN_TICK_HZ`]..=[`MAX_TICK_HZ`].
    pub tick_hz: f32,
    /// Offscreen surface width for snapshot bindings; 0 uses the composition width.
    pub snapshot_width: u32,
    /// Offscreen surface height for snapshot bindings; 0 uses the composition height.
    pub snapshot_height: u32,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            progress_driver: ProgressDriver::Native,
            tick_hz: DEFAULT_TICK_HZ,
            snapshot_width: 0,
            snapshot_height: 0,
        }
    }
}

impl BindingConfig {
    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, BindingError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the clock cannot run with.
    pub fn validate(&self) -> Result<(), BindingError> {
        if !tick_hz_in_range(self.tick_hz) {
            return Err(BindingError::Config {
                reason: format!(
                    "tick_hz must be within {MIN_TICK_HZ}..={MAX_TICK_HZ}, got {}",
                    self.tick_hz
                ),
            });
        }
        Ok(())
    }

    pub fn with_driver(mut self, driver: ProgressDriver) -> Self {
        self.progress_driver = driver;
        self
    }

    pub fn with_snapshot_size(mut self, width: u32, height: u32) -> Self {
        self.snapshot_width = width;
        self.snapshot_height = height;
        self
    }

    /// Seconds between two clock ticks. An out-of-range rate runs at
    /// [`DEFAULT_TICK_HZ`].
    #[inline]
    pub fn tick_period(&self) -> f32 {
        if tick_hz_in_range(self.tick_hz) {
            1.0 / self.tick_hz
        } else {
            1.0 / DEFAULT_TICK_HZ
        }
    }
}

#[inline]
fn tick_hz_in_range(hz: f32) -> bool {
    hz.is_finite() && (MIN_TICK_HZ..=MAX_TICK_HZ).contains(&hz)
}
