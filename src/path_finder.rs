use crate::RouteError;
use crate::types::Route;
use crossbeam_channel::{RecvTimeoutError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Enumerates simple paths between two tokens in the liquidity graph.
///
/// Implementations must return only loop-free paths of at most `max_hops`
/// hops, each hop annotated with the pools that realize it.
pub trait PathFinder: Send + Sync {
    fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_hops: usize,
    ) -> Result<Vec<Route>, RouteError>;
}

impl<F> PathFinder for F
where
    F: Fn(&str, &str, usize) -> Result<Vec<Route>, RouteError> + Send + Sync,
{
    fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_hops: usize,
    ) -> Result<Vec<Route>, RouteError> {
        self(source, destination, max_hops)
    }
}

/// Query threads a `DeadlinePathFinder` keeps alive at once unless told
/// otherwise.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Releases a query slot when the helper thread finishes, or when it was
/// never started.
struct QuerySlot(Arc<AtomicUsize>);

impl Drop for QuerySlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounds every call to the wrapped finder by a deadline.
///
/// The query runs on a helper thread. When the deadline passes the caller gets
/// `RouteError::Timeout` right away; the helper finishes in the background and
/// its result is discarded. At most `max_in_flight` helpers exist at a time,
/// stalled ones included; past that, queries fail immediately instead of
/// piling up threads behind a hung backend.
pub struct DeadlinePathFinder {
    inner: Arc<dyn PathFinder>,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
}

impl DeadlinePathFinder {
    pub fn new(inner: Arc<dyn PathFinder>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Helper threads currently running, finished or not from the caller's
    /// point of view.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl PathFinder for DeadlinePathFinder {
    fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_hops: usize,
    ) -> Result<Vec<Route>, RouteError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst);
        let slot = QuerySlot(Arc::clone(&self.in_flight));
        if running >= self.max_in_flight {
            drop(slot);
            warn!(source, destination, running, "too many path queries still running");
            return Err(RouteError::Collaborator(format!(
                "{} path queries still running",
                running
            )));
        }

        let (tx, rx) = bounded(1);
        let inner = Arc::clone(&self.inner);
        let (src, dst) = (source.to_string(), destination.to_string());
        thread::Builder::new()
            .name("routegen-query".to_string())
            .spawn(move || {
                let result = inner.find_paths(&src, &dst, max_hops);
                drop(slot);
                let _ = tx.send(result);
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(source, destination, timeout = ?self.timeout, "path query deadline exceeded");
                Err(RouteError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(RouteError::Collaborator(
                "path query thread exited without a result".to_string(),
            )),
        }
    }
}
