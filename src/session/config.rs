use std::time::Duration;

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of sessions open at once (`None` = unbounded)
    pub max_sessions: Option<usize>,

    /// How long an acquisition waits for a free slot when the pool is full
    pub acquire_timeout: Duration,

    /// Upper bound for one asynchronous unit of work
    pub transaction_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            max_sessions: None,
            acquire_timeout: Duration::from_secs(30),
            transaction_timeout: None,
        }
    }

    /// Set maximum concurrent sessions
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    /// Set acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set transaction timeout
    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = Some(timeout);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions == Some(0) {
            return Err("max_sessions must be greater than 0".to_string());
        }

        if self.acquire_timeout.is_zero() {
            return Err("acquire_timeout must be greater than 0".to_string());
        }

        if self.transaction_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("transaction_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.max_sessions, None);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = SessionConfig::new()
            .max_sessions(4)
            .transaction_timeout(Duration::from_millis(250));
        assert_eq!(config.max_sessions, Some(4));
        assert!(config.validate().is_ok());

        assert!(SessionConfig::new().max_sessions(0).validate().is_err());
        assert!(
            SessionConfig::new()
                .acquire_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
