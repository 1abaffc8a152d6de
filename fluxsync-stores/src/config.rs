//! Sync configuration: page sizes and action logging

use std::path::Path;

use fluxsync::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_POSTS_PER_FETCH: usize = 20;
pub const DEFAULT_COMMENTS_PER_FETCH: usize = 30;
pub const DEFAULT_MEDIA_PER_FETCH: usize = 50;
pub const DEFAULT_REVIEWS_PER_FETCH: usize = 25;
pub const DEFAULT_ACTION_LOG_CAPACITY: usize = 100;
pub const DEFAULT_STATS_MAX_AGE_SECS: u64 = 300;

/// Settings shared by every store
///
/// Every field has a default, so `{}` is a valid configuration.
///
/// ```
/// use fluxsync_stores::SyncConfig;
///
/// let config = SyncConfig::from_json_str(r#"{ "posts_per_fetch": 10 }"#).unwrap();
/// assert_eq!(config.posts_per_fetch, 10);
/// assert_eq!(config.comments_per_fetch, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub posts_per_fetch: usize,
    pub comments_per_fetch: usize,
    pub media_per_fetch: usize,
    pub reviews_per_fetch: usize,

    /// How long fetched stats answer unforced fetches; 0 always refetches
    pub stats_max_age_secs: u64,

    /// Entries kept by the in-memory action log
    pub action_log_capacity: usize,

    /// Glob patterns of actions to log (`FetchPosts`, `media.*`); empty logs all
    pub log_include: Vec<String>,

    /// Glob patterns of actions never logged
    pub log_exclude: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            posts_per_fetch: DEFAULT_POSTS_PER_FETCH,
            comments_per_fetch: DEFAULT_COMMENTS_PER_FETCH,
            media_per_fetch: DEFAULT_MEDIA_PER_FETCH,
            reviews_per_fetch: DEFAULT_REVIEWS_PER_FETCH,
            stats_max_age_secs: DEFAULT_STATS_MAX_AGE_SECS,
            action_log_capacity: DEFAULT_ACTION_LOG_CAPACITY,
            log_include: Vec::new(),
            log_exclude: Vec::new(),
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Page sizes must be positive
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("posts_per_fetch", self.posts_per_fetch),
            ("comments_per_fetch", self.comments_per_fetch),
            ("media_per_fetch", self.media_per_fetch),
            ("reviews_per_fetch", self.reviews_per_fetch),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "page size must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn logger_filter(&self) -> ActionLoggerConfig {
        ActionLoggerConfig::with_patterns(self.log_include.clone(), self.log_exclude.clone())
    }

    pub fn action_log_config(&self) -> ActionLogConfig {
        ActionLogConfig::new(self.action_log_capacity, self.logger_filter())
    }

    /// Middleware that logs filtered actions and keeps the recent ones in memory
    pub fn action_logger(&self) -> ActionLoggerMiddleware {
        ActionLoggerMiddleware::with_log(self.action_log_config())
    }
}
