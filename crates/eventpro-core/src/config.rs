//! Client configuration.
//!
//! Settings are read from `~/.config/eventpro/config.json` when present and
//! then overridden by `EVENTPRO_*` environment variables. Every field has a
//! default, so a missing or partial file is fine.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "eventpro";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "http://localhost:8001";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Sessions last a day unless refreshed.
const DEFAULT_SESSION_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Refresh when less than five minutes remain.
const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 5 * 60;

/// The refresh check runs once a minute.
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

const DEFAULT_MOCK_LATENCY_MS: u64 = 300;

/// Longest accepted session lifetime or refresh threshold (ten years).
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub session_lifetime_secs: u64,
    pub refresh_threshold_secs: u64,
    pub refresh_interval_secs: u64,
    pub mock_mode: bool,
    pub mock_latency_min_ms: u64,
    pub mock_latency_max_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            mock_mode: false,
            mock_latency_min_ms: DEFAULT_MOCK_LATENCY_MS,
            mock_latency_max_ms: DEFAULT_MOCK_LATENCY_MS,
        }
    }
}

impl PortalConfig {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `EVENTPRO_*` overrides looked up through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("EVENTPRO_BASE_URL") {
            self.base_url = url;
        }
        override_parsed(&lookup, "EVENTPRO_TIMEOUT_MS", &mut self.timeout_ms);
        override_parsed(&lookup, "EVENTPRO_RETRY_ATTEMPTS", &mut self.retry_attempts);
        override_parsed(&lookup, "EVENTPRO_RETRY_DELAY_MS", &mut self.retry_delay_ms);
        override_parsed(&lookup, "EVENTPRO_SESSION_LIFETIME_SECS", &mut self.session_lifetime_secs);
        override_parsed(&lookup, "EVENTPRO_REFRESH_THRESHOLD_SECS", &mut self.refresh_threshold_secs);
        override_parsed(&lookup, "EVENTPRO_REFRESH_INTERVAL_SECS", &mut self.refresh_interval_secs);
        override_parsed(&lookup, "EVENTPRO_MOCK_MODE", &mut self.mock_mode);

        reset_if_out_of_range(
            "session_lifetime_secs",
            &mut self.session_lifetime_secs,
            DEFAULT_SESSION_LIFETIME_SECS,
        );
        reset_if_out_of_range(
            "refresh_threshold_secs",
            &mut self.refresh_threshold_secs,
            DEFAULT_REFRESH_THRESHOLD_SECS,
        );
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Falls back to the default when the configured value is out of range.
    pub fn session_lifetime(&self) -> chrono::Duration {
        bounded_seconds(self.session_lifetime_secs, DEFAULT_SESSION_LIFETIME_SECS)
    }

    pub fn refresh_threshold(&self) -> chrono::Duration {
        bounded_seconds(self.refresh_threshold_secs, DEFAULT_REFRESH_THRESHOLD_SECS)
    }

    /// At least one second; a zero interval is not a valid timer period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Mock latency bounds, with min and max swapped if configured backwards.
    pub fn mock_latency(&self) -> (Duration, Duration) {
        let min = self.mock_latency_min_ms.min(self.mock_latency_max_ms);
        let max = self.mock_latency_min_ms.max(self.mock_latency_max_ms);
        (Duration::from_millis(min), Duration::from_millis(max))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable session blob.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparseable config override"),
        }
    }
}

fn checked_seconds(secs: u64) -> Option<chrono::Duration> {
    if secs > MAX_DURATION_SECS {
        return None;
    }
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

fn bounded_seconds(secs: u64, default: u64) -> chrono::Duration {
    checked_seconds(secs)
        .or_else(|| checked_seconds(default))
        .unwrap_or_else(chrono::Duration::zero)
}

fn reset_if_out_of_range(key: &str, slot: &mut u64, default: u64) {
    if checked_seconds(*slot).is_none() {
        warn!(key, value = *slot, max = MAX_DURATION_SECS, "Config value out of range, using default");
        *slot = default;
    }
}
