//! Rate limit configuration module
//!
//! The tier table is data, not code: built-in defaults ship with the crate
//! and any value can be overridden from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `GENLIMIT` prefix and
//! nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use genlimit::config::RateLimitSettings;
//!
//! let settings = RateLimitSettings::load().expect("Failed to load settings");
//!
//! println!("free tier burst: {}", settings.config_for_tier("free").burst);
//! ```

mod error;

pub use error::{ConfigError, ValidationError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default idle threshold after which `cleanup` reclaims a bucket.
pub const DEFAULT_IDLE_TTL_SECS: u64 = 3600;

/// Token bucket parameters for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens replenished per `period_secs`.
    pub rate: u32,
    /// Seconds over which `rate` tokens accrue.
    pub period_secs: u32,
    /// Capacity ceiling; bounds how many requests a burst can spend at once.
    /// Expected (not enforced) to be at least `rate`, so a bucket can hold a
    /// full period's refill.
    pub burst: u32,
}

impl RateLimitConfig {
    /// Creates a config from raw parameters.
    pub fn new(rate: u32, period_secs: u32, burst: u32) -> Self {
        Self {
            rate,
            period_secs,
            burst,
        }
    }

    /// Rejects zero fields, which would make refill undefined or a bucket
    /// unusable. `tier` names the offending table entry in the error.
    pub fn validate(&self, tier: &str) -> Result<(), ValidationError> {
        if self.rate == 0 {
            return Err(ValidationError::ZeroRate(tier.to_string()));
        }
        if self.period_secs == 0 {
            return Err(ValidationError::ZeroPeriod(tier.to_string()));
        }
        if self.burst == 0 {
            return Err(ValidationError::ZeroBurst(tier.to_string()));
        }
        Ok(())
    }
}

/// Complete rate limiter configuration: the tier table plus service knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Recognized tiers and their bucket parameters.
    #[serde(default = "default_tiers")]
    pub tiers: HashMap<String, RateLimitConfig>,
    /// Fallback for unrecognized tier names.
    #[serde(default = "default_tier_name")]
    pub default_tier: String,
    /// Buckets idle longer than this many seconds are reclaimed by `cleanup`.
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,
}

fn default_tier_name() -> String {
    "free".to_string()
}

fn default_idle_ttl() -> u64 {
    DEFAULT_IDLE_TTL_SECS
}

fn default_tiers() -> HashMap<String, RateLimitConfig> {
    let mut tiers = HashMap::new();
    tiers.insert("free".to_string(), RateLimitConfig::new(5, 60, 10));
    tiers.insert("pro".to_string(), RateLimitConfig::new(50, 60, 60));
    tiers.insert("studio".to_string(), RateLimitConfig::new(1000, 60, 2000));
    tiers
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            default_tier: default_tier_name(),
            idle_ttl_secs: default_idle_ttl(),
        }
    }
}

impl RateLimitSettings {
    /// Load settings from environment variables on top of the defaults
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `GENLIMIT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Validates the resulting settings
    ///
    /// # Environment Variable Format
    ///
    /// - `GENLIMIT__DEFAULT_TIER=pro` -> `default_tier = "pro"`
    /// - `GENLIMIT__TIERS__FREE__BURST=20` -> `tiers["free"].burst = 20`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    /// or fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let settings: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::Environment::default()
                    .prefix("GENLIMIT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate all settings values
    ///
    /// Every tier config must have positive fields, the default tier must
    /// exist in the table, and the idle TTL must be positive.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (tier, config) in &self.tiers {
            config.validate(tier)?;
        }
        if !self.tiers.contains_key(&self.default_tier) {
            return Err(ValidationError::MissingDefaultTier(
                self.default_tier.clone(),
            ));
        }
        if self.idle_ttl_secs == 0 {
            return Err(ValidationError::ZeroIdleTtl);
        }
        Ok(())
    }

    /// Get the config for a tier name.
    ///
    /// Falls back to the default tier if the name is not in the table.
    pub fn config_for_tier(&self, tier: &str) -> &RateLimitConfig {
        self.tiers
            .get(tier)
            .or_else(|| self.tiers.get(&self.default_tier))
            .expect("default tier should always exist")
    }
}
