use crate::RouteError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT: &str = "dump.txt";
pub const DEFAULT_MAX_HOPS: usize = 4;
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_MAX_ROUTES: usize = 10;
pub const DEFAULT_FLUSH_EVERY: usize = 20;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SUBMIT_RETRIES: usize = 50;
pub const DEFAULT_SUBMIT_BACKOFF_MS: u64 = 20;

/// Settings for one all-pairs dump run.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub output: PathBuf,
    pub max_hops: usize,
    pub workers: usize,
    pub max_routes: usize,
    /// Task queue capacity. `None` sizes the queue to hold every ordered pair.
    pub queue_capacity: Option<usize>,
    /// Lines written between flushes to durable storage.
    pub flush_every: usize,
    /// Deadline for one path query. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
    /// Resubmission attempts when the task queue is full.
    pub submit_retries: usize,
    /// Base delay between resubmissions, doubled each attempt up to 1s.
    pub submit_backoff: Duration,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            max_hops: DEFAULT_MAX_HOPS,
            workers: DEFAULT_WORKERS,
            max_routes: DEFAULT_MAX_ROUTES,
            queue_capacity: None,
            flush_every: DEFAULT_FLUSH_EVERY,
            query_timeout: Some(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)),
            submit_retries: DEFAULT_SUBMIT_RETRIES,
            submit_backoff: Duration::from_millis(DEFAULT_SUBMIT_BACKOFF_MS),
        }
    }
}

impl DumpConfig {
    pub fn with_output(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RouteError> {
        if self.max_hops == 0 {
            return Err(RouteError::Config("max hops must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(RouteError::Config("worker count must be at least 1".to_string()));
        }
        if self.max_routes == 0 {
            return Err(RouteError::Config("max routes must be at least 1".to_string()));
        }
        if self.flush_every == 0 {
            return Err(RouteError::Config("flush interval must be at least 1 line".to_string()));
        }
        if self.queue_capacity == Some(0) {
            return Err(RouteError::Config("queue capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Queue capacity for a universe of `pair_count` ordered pairs.
    pub fn queue_capacity_for(&self, pair_count: usize) -> usize {
        self.queue_capacity.unwrap_or(pair_count).max(1)
    }
}
