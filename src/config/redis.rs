//! Redis configuration (cache and outbound transport)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TTL for cached conversations in seconds; 0 disables expiry
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl RedisConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the conversation cache TTL, `None` when expiry is disabled
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = RedisConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn test_validation_missing_url() {
        let config = RedisConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("REDIS_URL"))
        ));
    }

    #[test]
    fn test_validation_rejects_non_redis_scheme() {
        let config = RedisConfig {
            url: "http://localhost:6379".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRedisUrl)
        ));
    }

    #[test]
    fn test_validation_accepts_redis_url() {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
