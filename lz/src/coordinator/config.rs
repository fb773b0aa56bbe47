//! Group coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::viewport::{ActivationBand, TrackerOptions};

/// Per-group tunables
///
/// Groups on the same page are free to use different values; they are
/// carried as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Activation band geometry
    #[serde(default)]
    pub band: ActivationBand,

    /// Debounce window for viewport observations
    #[serde(rename = "debounce-ms", default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long observation is ignored after an imperative scroll
    #[serde(rename = "scroll-lock-ms", default = "default_scroll_lock_ms")]
    pub scroll_lock_ms: u64,

    /// Whether the idle preloader runs for this group
    #[serde(default)]
    pub preload: bool,

    /// Delay after reveal before the preloader starts
    #[serde(rename = "preload-grace-ms", default = "default_preload_grace_ms")]
    pub preload_grace_ms: u64,

    /// Delay between successive preloaded sections
    #[serde(rename = "preload-stagger-ms", default = "default_preload_stagger_ms")]
    pub preload_stagger_ms: u64,

    /// Delay between mount and the deep-link scroll, so the page can lay out
    #[serde(rename = "deep-link-settle-ms", default = "default_deep_link_settle_ms")]
    pub deep_link_settle_ms: u64,

    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_scroll_lock_ms() -> u64 {
    1000
}

fn default_preload_grace_ms() -> u64 {
    debug!("default_preload_grace_ms: called");
    3000
}

fn default_preload_stagger_ms() -> u64 {
    200
}

fn default_deep_link_settle_ms() -> u64 {
    300
}

fn default_channel_buffer() -> usize {
    256
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            band: ActivationBand::default(),
            debounce_ms: default_debounce_ms(),
            scroll_lock_ms: default_scroll_lock_ms(),
            preload: false,
            preload_grace_ms: default_preload_grace_ms(),
            preload_stagger_ms: default_preload_stagger_ms(),
            deep_link_settle_ms: default_deep_link_settle_ms(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl GroupConfig {
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.band.validate()?;
        if self.preload_stagger_ms == 0 {
            return Err(ConfigError::ZeroStagger);
        }
        if self.preload_grace_ms < self.deep_link_settle_ms {
            return Err(ConfigError::GraceShorterThanSettle {
                grace_ms: self.preload_grace_ms,
                settle_ms: self.deep_link_settle_ms,
            });
        }
        if self.channel_buffer == 0 {
            return Err(ConfigError::ZeroChannelBuffer);
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn scroll_lock(&self) -> Duration {
        Duration::from_millis(self.scroll_lock_ms)
    }

    pub fn preload_grace(&self) -> Duration {
        Duration::from_millis(self.preload_grace_ms)
    }

    pub fn preload_stagger(&self) -> Duration {
        Duration::from_millis(self.preload_stagger_ms)
    }

    pub fn deep_link_settle(&self) -> Duration {
        Duration::from_millis(self.deep_link_settle_ms)
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            band: self.band,
            debounce: self.debounce(),
            scroll_lock: self.scroll_lock(),
        }
    }
}
