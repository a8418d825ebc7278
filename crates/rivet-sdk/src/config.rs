//! Client and tracker configuration
//!
//! Durations are written in milliseconds so the same structs load from TOML:
//!
//! ```toml
//! [client]
//! url = "http://localhost:8545"
//!
//! [tracker]
//! poll_interval_ms = 500
//! max_poll_interval_ms = 8000
//! timeout_ms = 120000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SdkError;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// RPC client settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Transaction tracker settings
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, SdkError> {
        let config: Config =
            toml::from_str(content).map_err(|e| SdkError::Config(e.to_string()))?;
        config.tracker.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// RPC client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC endpoint URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Chain ID; fetched from the node when unset
    #[serde(default)]
    pub chain_id: Option<u64>,
}

fn default_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            request_timeout_ms: default_request_timeout_ms(),
            chain_id: None,
        }
    }
}

impl ClientConfig {
    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Largest accepted `backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Tracker-wide polling defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Delay before the first poll and base interval between polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval ceiling once backoff kicks in
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    /// Interval growth applied after each "not found"
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Give up after this many polls
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Give up after this much wall-clock time
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
    /// Mined outcomes remembered for re-track and late listeners
    #[serde(default = "default_completed_capacity")]
    pub completed_capacity: usize,
    /// Buffer of the lifecycle broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_poll_interval_ms() -> u64 {
    16_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_timeout_ms() -> Option<u64> {
    Some(600_000)
}

fn default_completed_capacity() -> usize {
    1_024
}

fn default_event_capacity() -> usize {
    256
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_polls: None,
            timeout_ms: default_timeout_ms(),
            completed_capacity: default_completed_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl TrackerConfig {
    /// Reject settings the poll loop cannot run with
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.poll_interval_ms == 0 {
            return Err(SdkError::Config("poll_interval_ms must be positive".into()));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(SdkError::Config(
                "max_poll_interval_ms must be at least poll_interval_ms".into(),
            ));
        }
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.backoff_multiplier) {
            return Err(SdkError::Config(format!(
                "backoff_multiplier must be within 1.0..={}",
                MAX_BACKOFF_MULTIPLIER
            )));
        }
        if self.event_capacity == 0 {
            return Err(SdkError::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Effective schedule for one tracked hash
    pub fn schedule(&self, opts: &TrackOptions) -> PollSchedule {
        let interval = opts.poll_interval_ms.unwrap_or(self.poll_interval_ms).max(1);
        PollSchedule {
            interval: Duration::from_millis(interval),
            max_interval: Duration::from_millis(self.max_poll_interval_ms.max(interval)),
            multiplier: clamp_multiplier(self.backoff_multiplier),
            max_polls: opts.max_polls.or(self.max_polls),
            timeout: opts.timeout_ms.or(self.timeout_ms).map(Duration::from_millis),
        }
    }
}

/// Per-hash overrides of [`TrackerConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOptions {
    /// Base poll interval
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Poll count limit
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Wall-clock limit
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl TrackOptions {
    /// Override the base poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = Some(millis(interval));
        self
    }

    /// Override the poll count limit
    pub fn max_polls(mut self, polls: u32) -> Self {
        self.max_polls = Some(polls);
        self
    }

    /// Override the wall-clock limit
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(millis(timeout));
        self
    }
}

/// Resolved polling parameters for one hash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSchedule {
    /// First interval
    pub interval: Duration,
    /// Interval ceiling
    pub max_interval: Duration,
    /// Growth factor after a miss
    pub multiplier: f64,
    /// Poll count limit
    pub max_polls: Option<u32>,
    /// Wall-clock limit
    pub timeout: Option<Duration>,
}

impl PollSchedule {
    /// Interval following `current` after a miss
    ///
    /// Saturates at `max_interval`, including when the product does not fit
    /// in a `Duration`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

fn clamp_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_nan() {
        return 1.0;
    }
    multiplier.clamp(1.0, MAX_BACKOFF_MULTIPLIER)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
