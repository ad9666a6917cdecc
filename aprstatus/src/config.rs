//! Runtime configuration.
//!
//! [`Config`] groups the per-component settings and the one knob that
//! belongs to the runtime itself, the roster refresh interval.

use std::time::Duration;

use crate::dispatch::DispatchConfig;
use crate::feed::FeedConfig;
use crate::platform::PlatformConfig;

/// How often the roster is reconciled against the platform directory.
pub const DEFAULT_ROSTER_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Top-level configuration for the status runtime.
#[derive(Debug, Clone)]
pub struct Config {
    /// APRS-IS connection settings.
    pub feed: FeedConfig,

    /// Presence platform credentials.
    pub platform: PlatformConfig,

    /// Dispatcher tuning.
    pub dispatch: DispatchConfig,

    /// Time between roster refreshes.
    pub roster_refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            platform: PlatformConfig::default(),
            dispatch: DispatchConfig::default(),
            roster_refresh_interval: DEFAULT_ROSTER_REFRESH_INTERVAL,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_platform(mut self, platform: PlatformConfig) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_roster_refresh_interval(mut self, interval: Duration) -> Self {
        self.roster_refresh_interval = interval;
        self
    }
}
