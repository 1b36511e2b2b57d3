use crate::RouteError;
use crate::config::DumpConfig;
use crate::encoder::encode_route;
use crate::path_finder::{DeadlinePathFinder, PathFinder};
use crate::ranker::RouteRanker;
use crate::task_pool::{Rejected, TaskPool};
use crate::types::{Route, Token};
use crate::writer::{PairId, PairStream, WriterMessage, write_loop};
use crossbeam_channel::{Sender, unbounded};
use itertools::Itertools;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const MAX_SUBMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Path query threads allowed per worker, counting stalled ones.
const QUERY_THREADS_PER_WORKER: usize = 4;

/// Work item for one ordered token pair.
pub struct DumpTask {
    pub pair: PairId,
    pub source: Token,
    pub destination: Token,
    pub max_hops: usize,
    response: Sender<WriterMessage>,
}

/// Outcome of a dump run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpReport {
    pub tokens: usize,
    pub pairs_total: usize,
    pub pairs_dispatched: usize,
    /// Pairs never queued because the task queue stayed full.
    pub pairs_skipped: usize,
    pub pairs_completed: usize,
    /// Pairs whose path query failed or timed out.
    pub pairs_failed: usize,
    pub pairs_with_routes: usize,
    pub lines_written: usize,
    /// Lines buffered but not confirmed because a sync failed.
    pub lines_unconfirmed: usize,
    pub write_errors: usize,
}

/// Drives the all-pairs dump: one task per ordered pair through a bounded
/// worker pool, with every produced line funnelled into a single writer that
/// owns the output file.
pub struct DumpOrchestrator {
    config: DumpConfig,
    finder: Arc<dyn PathFinder>,
    ranker: RouteRanker,
}

impl DumpOrchestrator {
    pub fn new(config: DumpConfig, finder: Arc<dyn PathFinder>) -> Result<Self, RouteError> {
        config.validate()?;
        let finder: Arc<dyn PathFinder> = match config.query_timeout {
            Some(timeout) => Arc::new(
                DeadlinePathFinder::new(finder, timeout)
                    .with_max_in_flight(config.workers * QUERY_THREADS_PER_WORKER),
            ),
            None => finder,
        };
        let ranker = RouteRanker::new(config.max_routes);
        Ok(Self {
            config,
            finder,
            ranker,
        })
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Ranked, merged routes for a single pair.
    pub fn query_pair(&self, source: &str, destination: &str) -> Result<Vec<Route>, RouteError> {
        let routes = self
            .finder
            .find_paths(source, destination, self.config.max_hops)?;
        Ok(self.ranker.rank(routes))
    }

    /// Dump routes for every ordered pair of `tokens` into the configured
    /// output file (appending, created if absent).
    ///
    /// Returns once every task has finished and the writer has flushed its
    /// last line. Per-pair failures are logged and counted in the report; the
    /// result is an error only when writing the file failed, carrying the last
    /// such error.
    pub fn dump(&self, tokens: &[Token]) -> Result<DumpReport, RouteError> {
        let started = Instant::now();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.output)
            .map_err(|e| {
                error!(error = %e, file = %self.config.output.display(), "open file failed");
                RouteError::Io(e)
            })?;

        let tokens: Vec<&Token> = tokens.iter().unique().collect();
        let n = tokens.len();
        let pairs_total = n * n.saturating_sub(1);
        info!(tokens = n, pairs = pairs_total, "total token");

        let (results_tx, results_rx) = unbounded();
        let flush_every = self.config.flush_every;
        let writer = thread::Builder::new()
            .name("routegen-writer".to_string())
            .spawn(move || {
                let mut out = BufWriter::new(file);
                write_loop(&mut out, results_rx, flush_every)
            })?;

        let mut pool = TaskPool::new(self.config.queue_capacity_for(pairs_total));
        let finder = Arc::clone(&self.finder);
        let ranker = self.ranker;
        pool.run(self.config.workers, move |task: DumpTask| {
            process_pair(finder.as_ref(), &ranker, task);
        })?;

        let mut report = DumpReport {
            tokens: n,
            pairs_total,
            ..DumpReport::default()
        };

        for (i, source) in tokens.iter().enumerate() {
            for (j, destination) in tokens.iter().enumerate() {
                if i == j {
                    continue;
                }
                let task = DumpTask {
                    pair: report.pairs_dispatched + report.pairs_skipped,
                    source: source.to_string(),
                    destination: destination.to_string(),
                    max_hops: self.config.max_hops,
                    response: results_tx.clone(),
                };
                match self.submit_with_backoff(&pool, task) {
                    Ok(()) => report.pairs_dispatched += 1,
                    Err(e) => {
                        warn!(source = %source, destination = %destination, error = %e, "add task failed, pair skipped");
                        report.pairs_skipped += 1;
                    }
                }
            }
        }

        // Completion: tasks finish and close their streams, the last sender
        // goes away, and the writer sees end-of-stream and flushes.
        drop(results_tx);
        pool.stop();
        pool.await_drain();
        let summary = writer
            .join()
            .map_err(|_| RouteError::Other("writer thread panicked".to_string()))?;

        report.pairs_completed = summary.pairs_completed;
        report.pairs_failed = summary.pairs_failed;
        report.pairs_with_routes = summary.pairs_with_routes;
        report.lines_written = summary.lines_written;
        report.lines_unconfirmed = summary.lines_unconfirmed;
        report.write_errors = summary.write_errors;

        info!(
            dispatched = report.pairs_dispatched,
            skipped = report.pairs_skipped,
            failed = report.pairs_failed,
            lines = report.lines_written,
            unconfirmed = report.lines_unconfirmed,
            elapsed = ?started.elapsed(),
            "dump finished"
        );

        match summary.last_error {
            Some(e) => Err(RouteError::Io(e)),
            None => Ok(report),
        }
    }

    fn submit_with_backoff(&self, pool: &TaskPool<DumpTask>, task: DumpTask) -> Result<(), RouteError> {
        let mut task = task;
        let mut delay = self.config.submit_backoff;
        let mut attempt = 0;
        loop {
            match pool.try_submit(task) {
                Ok(()) => return Ok(()),
                Err(Rejected {
                    item,
                    reason: RouteError::QueueFull,
                }) if attempt < self.config.submit_retries => {
                    attempt += 1;
                    debug!(attempt, "task pool full, retrying");
                    thread::sleep(delay);
                    delay = (delay * 2).min(MAX_SUBMIT_BACKOFF);
                    task = item;
                }
                Err(rejected) => return Err(rejected.reason),
            }
        }
    }
}

fn process_pair(finder: &dyn PathFinder, ranker: &RouteRanker, task: DumpTask) {
    let DumpTask {
        pair,
        source,
        destination,
        max_hops,
        response,
    } = task;
    let mut stream = PairStream::new(pair, response);

    let routes = match finder.find_paths(&source, &destination, max_hops) {
        Ok(routes) => routes,
        Err(e) => {
            warn!(source = %source, destination = %destination, error = %e, "query route failed");
            stream.fail();
            return;
        }
    };
    debug!(source = %source, destination = %destination, paths = routes.len(), "got token path");

    for route in ranker.rank(routes) {
        match encode_route(&route) {
            Ok(line) => stream.send(line),
            Err(e) => error!(route = %route, error = %e, "encode route failed"),
        }
    }
}
