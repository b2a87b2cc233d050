//! Cleaner settings
//!
//! Parsed from the `[cleaner]` section of the shared TOML file. Every key is
//! optional; absent keys take the compiled defaults below.
//!
//! ```toml
//! [cleaner]
//! country_code = "cn"
//! request_timeout_secs = 20
//! store_requests_per_second = 1
//! record_pause_min_ms = 1500
//! record_pause_max_ms = 2500
//! ```

use gamerec_common::config::TomlConfig;
use gamerec_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerSettings {
    /// Storefront `appdetails` endpoint
    pub store_base_url: String,
    /// Aggregate stats endpoint (SteamSpy `api.php`)
    pub stats_base_url: String,
    /// Charts page prefix; the app id is appended as a path segment
    pub charts_base_url: String,
    /// Storefront country code (controls price currency)
    pub country_code: String,
    /// Storefront language (controls date formatting)
    pub language: String,
    pub user_agent: String,

    pub request_timeout_secs: u64,
    pub store_requests_per_second: u32,
    pub stats_requests_per_second: u32,
    pub charts_requests_per_second: u32,

    /// Pause after every external call, randomised by up to the jitter either way
    pub courtesy_pause_ms: u64,
    pub courtesy_jitter_ms: u64,
    /// Randomised pause between records that needed lookups
    pub record_pause_min_ms: u64,
    pub record_pause_max_ms: u64,

    /// Wait after the n-th 429 is `n × rate_limit_base_secs`
    pub rate_limit_base_secs: u64,
    pub max_attempts: u32,
    /// Fixed wait before retrying a transport error
    pub transient_retry_delay_secs: u64,

    /// Text written when a price is salvaged
    pub free_sentinel: String,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            store_base_url: "https://store.steampowered.com/api/appdetails".to_string(),
            stats_base_url: "https://steamspy.com/api.php".to_string(),
            charts_base_url: "https://steamcharts.com/app".to_string(),
            country_code: "cn".to_string(),
            language: "schinese".to_string(),
            user_agent: concat!("gamerec/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 20,
            store_requests_per_second: 1,
            stats_requests_per_second: 1,
            charts_requests_per_second: 1,
            courtesy_pause_ms: 500,
            courtesy_jitter_ms: 250,
            record_pause_min_ms: 1500,
            record_pause_max_ms: 2500,
            rate_limit_base_secs: 30,
            max_attempts: 3,
            transient_retry_delay_secs: 5,
            free_sentinel: crate::types::FREE_SENTINEL.to_string(),
        }
    }
}

impl CleanerSettings {
    /// Parse and validate the `[cleaner]` section
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        let settings: CleanerSettings = toml::Value::Table(config.cleaner.clone())
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid [cleaner] section: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_requests_per_second == 0
            || self.stats_requests_per_second == 0
            || self.charts_requests_per_second == 0
        {
            return Err(Error::Config(
                "requests_per_second settings must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.record_pause_min_ms > self.record_pause_max_ms {
            return Err(Error::Config(format!(
                "record_pause_min_ms ({}) exceeds record_pause_max_ms ({})",
                self.record_pause_min_ms, self.record_pause_max_ms
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        if !crate::types::is_free_text(&self.free_sentinel) {
            return Err(Error::Config(format!(
                "free_sentinel {:?} is not a recognised free spelling",
                self.free_sentinel
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn courtesy_pause(&self) -> Duration {
        gamerec_common::time::millis_to_duration(self.courtesy_pause_ms)
    }

    pub fn courtesy_jitter(&self) -> Duration {
        gamerec_common::time::millis_to_duration(self.courtesy_jitter_ms)
    }

    /// Retry policy shared by the HTTP clients
    pub fn retry_policy(&self) -> crate::sources::http::RetryPolicy {
        crate::sources::http::RetryPolicy {
            max_attempts: self.max_attempts,
            rate_limit_base: Duration::from_secs(self.rate_limit_base_secs),
            transient_delay: Duration::from_secs(self.transient_retry_delay_secs),
        }
    }
}

/// Non-zero quota from a validated rate
pub(crate) fn quota_rate(per_second: u32) -> NonZeroU32 {
    NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(cleaner: &str) -> TomlConfig {
        let raw = format!("[cleaner]\n{}", cleaner);
        toml::from_str(&raw).unwrap()
    }

    #[test]
    fn test_empty_section_gives_defaults() {
        let settings = CleanerSettings::from_toml(&TomlConfig::default()).unwrap();
        assert_eq!(settings, CleanerSettings::default());
        assert_eq!(settings.free_sentinel, "Free");
    }

    #[test]
    fn test_partial_override() {
        let settings =
            CleanerSettings::from_toml(&config_with("country_code = \"us\"\nmax_attempts = 5"))
                .unwrap();
        assert_eq!(settings.country_code, "us");
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.language, "schinese");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CleanerSettings::from_toml(&config_with("store_requests_per_second = 0")).is_err());
        assert!(CleanerSettings::from_toml(&config_with(
            "record_pause_min_ms = 10\nrecord_pause_max_ms = 5"
        ))
        .is_err());
        assert!(CleanerSettings::from_toml(&config_with("free_sentinel = \"Gratis\"")).is_err());
        assert!(CleanerSettings::from_toml(&config_with("max_attempts = \"three\"")).is_err());
    }

    #[test]
    fn test_localized_sentinel_accepted() {
        let settings =
            CleanerSettings::from_toml(&config_with("free_sentinel = \"免费\"")).unwrap();
        assert_eq!(settings.free_sentinel, "免费");
    }
}
