use std::time::Duration;

/// How loader workers find work and detect completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Workers claim record indices from a shared cursor, then block on a
    /// countdown that is notified when the last record finishes.
    #[default]
    Queue,
    /// Workers repeatedly scan the whole registry, `try_lock` each pending
    /// record, and sleep between scans until a scan finds nothing pending.
    Poll,
}

/// Loader configuration.
///
/// ```
/// use std::time::Duration;
/// use gitech_graphics::loader::{LoadStrategy, LoaderConfig};
///
/// let config = LoaderConfig::default()
///     .with_strategy(LoadStrategy::Poll)
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(config.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Work distribution strategy.
    pub strategy: LoadStrategy,
    /// Sleep between registry scans ([`LoadStrategy::Poll`] only).
    pub poll_interval: Duration,
    /// Give up with [`LoadError::Timeout`](crate::error::LoadError::Timeout)
    /// if loading has not converged this long after a worker started.
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strategy: LoadStrategy::Queue,
            poll_interval: Duration::from_millis(1),
            timeout: None,
        }
    }
}

impl LoaderConfig {
    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait without a deadline.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }
}
