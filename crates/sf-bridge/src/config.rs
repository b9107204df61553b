//! Invoker configuration.

use std::time::Duration;

/// Shortest liveness interval a waiting caller honors. Shorter values are
/// raised to this.
pub const MIN_LIVENESS_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for the blocking invoker.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// How often a waiting caller wakes up to log that it is still waiting.
    pub liveness_interval: Duration,
    /// Overall limit on the wait for a host callback. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            liveness_interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl InvokerConfig {
    /// Create a new invoker config builder.
    pub fn builder() -> InvokerConfigBuilder {
        InvokerConfigBuilder::default()
    }
}

/// Builder for InvokerConfig.
#[derive(Debug, Default)]
pub struct InvokerConfigBuilder {
    config: InvokerConfig,
}

impl InvokerConfigBuilder {
    /// Set the liveness interval, no shorter than [`MIN_LIVENESS_INTERVAL`].
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.config.liveness_interval = interval.max(MIN_LIVENESS_INTERVAL);
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Wait for host callbacks indefinitely.
    ///
    /// A host that never settles its promise then blocks the caller forever.
    pub fn without_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Build the invoker configuration.
    pub fn build(self) -> InvokerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InvokerConfig::default();
        assert_eq!(config.liveness_interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_builder() {
        let config = InvokerConfig::builder()
            .with_liveness_interval(Duration::from_millis(50))
            .without_timeout()
            .build();

        assert_eq!(config.liveness_interval, Duration::from_millis(50));
        assert!(config.timeout.is_none());

        let config = InvokerConfig::builder()
            .with_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_liveness_interval_is_raised() {
        let config = InvokerConfig::builder()
            .with_liveness_interval(Duration::ZERO)
            .build();
        assert_eq!(config.liveness_interval, MIN_LIVENESS_INTERVAL);
    }
}
