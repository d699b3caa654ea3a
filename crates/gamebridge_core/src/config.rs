//! Service configuration.

use std::time::Duration;

/// Tunables for the domain services.
///
/// Loading these from a file or the environment is the embedding
/// process's job; the services only see the typed struct.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page cap for the ban change feed.
    pub ban_feed_max_rows: i64,
    /// Command poll limit when the caller does not pass one.
    pub default_poll_limit: i64,
    /// Hard ceiling for the command poll limit.
    pub max_poll_limit: i64,
    /// Lower clamp for metrics history reads.
    pub history_min_rows: i64,
    /// Upper clamp for metrics history reads.
    pub history_max_rows: i64,
    /// How long a streaming consumer blocks before emitting a keep-alive.
    pub keep_alive_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ban_feed_max_rows: 500,
            default_poll_limit: 50,
            max_poll_limit: 200,
            history_min_rows: 10,
            history_max_rows: 2000,
            keep_alive_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ban change feed page cap.
    #[must_use]
    pub fn with_ban_feed_max_rows(mut self, rows: i64) -> Self {
        self.ban_feed_max_rows = rows.max(1);
        self
    }

    /// Sets the default command poll limit.
    #[must_use]
    pub fn with_default_poll_limit(mut self, limit: i64) -> Self {
        self.default_poll_limit = limit.max(1);
        self
    }

    /// Sets the keep-alive timeout for streaming consumers.
    #[must_use]
    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.ban_feed_max_rows, 500);
        assert_eq!(config.default_poll_limit, 50);
        assert_eq!(config.max_poll_limit, 200);
        assert_eq!(config.keep_alive_timeout, Duration::from_secs(15));
    }

    #[test]
    fn builder() {
        let config = Config::new()
            .with_ban_feed_max_rows(100)
            .with_default_poll_limit(10)
            .with_keep_alive_timeout(Duration::from_secs(5));
        assert_eq!(config.ban_feed_max_rows, 100);
        assert_eq!(config.default_poll_limit, 10);
        assert_eq!(config.keep_alive_timeout, Duration::from_secs(5));
    }

    #[test]
    fn builder_floors_at_one() {
        let config = Config::new().with_ban_feed_max_rows(0);
        assert_eq!(config.ban_feed_max_rows, 1);
    }
}
