//! Session-scoped sending defaults

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendingSettings {
    /// Seconds to wait between individual deliveries; converted to
    /// milliseconds on the wire.
    pub time_gap_secs: u64,
    pub randomize_order: bool,
}

impl Default for SendingSettings {
    fn default() -> Self {
        Self {
            time_gap_secs: 0,
            randomize_order: false,
        }
    }
}

/// Partial update merged over the current settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    pub time_gap_secs: Option<u64>,
    pub randomize_order: Option<bool>,
}

/// The single mutable settings instance for a session. Only `update` and
/// `reset` may change it; the dispatcher reads it at send time rather than
/// snapshotting earlier.
#[derive(Debug, Default)]
pub struct SettingsStore {
    inner: RwLock<SendingSettings>,
}

impl SettingsStore {
    pub fn new(initial: SendingSettings) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> SendingSettings {
        *self.inner.read()
    }

    /// Merge the given fields over the current values and return the result.
    pub fn update(&self, update: SettingsUpdate) -> SendingSettings {
        let mut settings = self.inner.write();
        if let Some(time_gap_secs) = update.time_gap_secs {
            settings.time_gap_secs = time_gap_secs;
        }
        if let Some(randomize_order) = update.randomize_order {
            settings.randomize_order = randomize_order;
        }
        *settings
    }

    pub fn reset(&self, defaults: SendingSettings) {
        *self.inner.write() = defaults;
    }
}
