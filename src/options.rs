use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for photo normalization and background isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaOptions {
    /// Maximum width of a normalized image in pixels (default: 2000)
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,

    /// Maximum height of a normalized image in pixels (default: 2000)
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,

    /// JPEG quality between 0 and 1 (default: 0.9)
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// Upper bound on one background-isolation call (default: 30000)
    #[serde(default = "default_isolation_timeout_ms")]
    pub isolation_timeout_ms: u64,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            quality: default_quality(),
            isolation_timeout_ms: default_isolation_timeout_ms(),
        }
    }
}

impl MediaOptions {
    /// Quality on the encoder's 1..=100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        let q = if self.quality.is_finite() {
            self.quality
        } else {
            default_quality()
        };
        ((q.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
    }

    pub fn isolation_timeout(&self) -> Duration {
        Duration::from_millis(self.isolation_timeout_ms)
    }
}

fn default_max_dimension() -> u32 {
    2000
}

fn default_quality() -> f32 {
    0.9
}

fn default_isolation_timeout_ms() -> u64 {
    30_000
}
