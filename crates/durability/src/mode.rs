//! Durability mode configuration
//!
//! Controls when bulk index data reaches disk. Metadata commits are always
//! synchronous regardless of mode.

use std::time::Duration;

/// Durability mode for index data
///
/// # Modes
///
/// | Mode | Data flush | Data Loss Window |
/// |------|------------|------------------|
/// | Always | Before each mutating command replies | Zero |
/// | Standard | Background, every `interval_ms` | Up to one interval |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Flush an index's data before acknowledging each mutation
    Always,

    /// Flush dirty indexes periodically (the default)
    Standard {
        /// Time between background flushes in milliseconds
        interval_ms: u64,
    },
}

impl DurabilityMode {
    /// Default background flush interval
    pub const DEFAULT_INTERVAL_MS: u64 = 1000;

    /// Parse a mode name as found in configuration
    ///
    /// Accepts `"always"` and `"standard"`; `interval_ms` applies to the
    /// latter.
    pub fn parse(name: &str, interval_ms: u64) -> Option<Self> {
        match name {
            "always" => Some(DurabilityMode::Always),
            "standard" => Some(DurabilityMode::Standard { interval_ms }),
            _ => None,
        }
    }

    /// True if mutations must be flushed before they are acknowledged
    pub fn requires_immediate_flush(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Interval of the background flusher, if one should run
    pub fn flush_interval(&self) -> Option<Duration> {
        match self {
            DurabilityMode::Always => None,
            DurabilityMode::Standard { interval_ms } => {
                Some(Duration::from_millis((*interval_ms).max(1)))
            }
        }
    }

    /// Human-readable description of the mode
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Always => "Always flush (safest, slowest)",
            DurabilityMode::Standard { .. } => "Standard (periodic background flush)",
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Standard {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
        }
    }
}
