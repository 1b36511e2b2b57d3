use crate::encoder::EncodedLine;
use crossbeam_channel::{Receiver, Sender};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::thread;
use tracing::{debug, error, info, warn};

/// Dispatch ordinal of a token pair within one dump run.
pub type PairId = usize;

/// What worker tasks send to the fan-in writer. Every message names the pair
/// whose response stream produced it.
#[derive(Debug)]
pub enum WriterMessage {
    Line { pair: PairId, line: EncodedLine },
    /// The pair's response stream closed after sending `routes` lines.
    PairDone {
        pair: PairId,
        routes: usize,
        failed: bool,
    },
}

/// Per-pair response stream feeding the shared results channel.
///
/// Dropping the stream closes it and tells the writer the pair is finished.
/// A stream dropped while its task is unwinding from a panic reports the pair
/// as failed.
pub struct PairStream {
    pair: PairId,
    sender: Sender<WriterMessage>,
    routes: usize,
    failed: bool,
}

impl PairStream {
    pub fn new(pair: PairId, sender: Sender<WriterMessage>) -> Self {
        Self {
            pair,
            sender,
            routes: 0,
            failed: false,
        }
    }

    pub fn send(&mut self, line: EncodedLine) {
        let message = WriterMessage::Line {
            pair: self.pair,
            line,
        };
        if self.sender.send(message).is_err() {
            error!(pair = self.pair, "results channel closed, dropping line");
            return;
        }
        self.routes += 1;
    }

    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl Drop for PairStream {
    fn drop(&mut self) {
        let _ = self.sender.send(WriterMessage::PairDone {
            pair: self.pair,
            routes: self.routes,
            failed: self.failed || thread::panicking(),
        });
    }
}

/// A sink that can push buffered bytes to durable storage.
pub trait DurableWrite: Write {
    fn sync(&mut self) -> io::Result<()>;
}

impl DurableWrite for BufWriter<File> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_data()
    }
}

impl DurableWrite for Vec<u8> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Totals gathered by the writer once the results channel closes.
#[derive(Debug, Default)]
pub struct WriteSummary {
    /// Lines confirmed on disk by a successful sync.
    pub lines_written: usize,
    /// Lines accepted by the buffer whose sync then failed.
    pub lines_unconfirmed: usize,
    pub pairs_completed: usize,
    pub pairs_failed: usize,
    pub pairs_with_routes: usize,
    pub write_errors: usize,
    pub last_error: Option<io::Error>,
}

impl WriteSummary {
    fn record_error(&mut self, e: io::Error, what: &str) {
        error!(error = %e, "{} failed", what);
        self.write_errors += 1;
        self.last_error = Some(e);
    }

    fn commit<W: DurableWrite>(&mut self, out: &mut W, unsynced: &mut usize, what: &str) {
        match out.sync() {
            Ok(()) => self.lines_written += *unsynced,
            Err(e) => {
                self.lines_unconfirmed += *unsynced;
                self.record_error(e, what);
            }
        }
        *unsynced = 0;
    }
}

/// Drain `results` into `out` until every sender is gone, syncing every
/// `flush_every` lines and once more at the end.
///
/// A failed write is logged and the loop carries on with the next line.
/// Lines count as written only once the sync that follows them succeeds.
pub fn write_loop<W: DurableWrite>(
    out: &mut W,
    results: Receiver<WriterMessage>,
    flush_every: usize,
) -> WriteSummary {
    let flush_every = flush_every.max(1);
    let mut summary = WriteSummary::default();
    let mut attempted = 0usize;
    let mut unsynced = 0usize;
    let mut open: FxHashMap<PairId, usize> = FxHashMap::default();

    for message in results.iter() {
        match message {
            WriterMessage::Line { pair, line } => {
                *open.entry(pair).or_default() += 1;
                attempted += 1;
                match out.write_all(line.as_bytes()) {
                    Ok(()) => unsynced += 1,
                    Err(e) => summary.record_error(e, "write to file"),
                }
                if attempted % flush_every == 0 {
                    summary.commit(out, &mut unsynced, "sync file");
                    info!(count = summary.lines_written, "write to file count");
                }
            }
            WriterMessage::PairDone {
                pair,
                routes,
                failed,
            } => {
                let received = open.remove(&pair).unwrap_or(0);
                if received != routes {
                    warn!(pair, received, routes, "pair stream closed with missing lines");
                }
                debug!(pair, routes, failed, "pair stream closed");
                summary.pairs_completed += 1;
                if failed {
                    summary.pairs_failed += 1;
                }
                if routes > 0 {
                    summary.pairs_with_routes += 1;
                }
            }
        }
    }

    if !open.is_empty() {
        warn!(pairs = open.len(), "results channel closed before some pair streams");
    }
    summary.commit(out, &mut unsynced, "final sync");
    if summary.write_errors > 0 {
        warn!(
            errors = summary.write_errors,
            unconfirmed = summary.lines_unconfirmed,
            "dump finished with write errors"
        );
    }
    info!(count = summary.lines_written, "total write to file count");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_route;
    use crate::types::{Hop, PoolRef, Route};
    use crossbeam_channel::unbounded;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn line(pool: &str) -> EncodedLine {
        encode_route(&Route::new(vec![Hop::new(
            "0xA",
            "0xB",
            [PoolRef::new("pancake", pool, "2500")],
        )]))
        .unwrap()
    }

    #[derive(Default)]
    struct FlakyWriter {
        inner: Vec<u8>,
        writes: usize,
        fail_on: usize,
        syncs: usize,
        fail_sync_on: usize,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl DurableWrite for FlakyWriter {
        fn sync(&mut self) -> io::Result<()> {
            self.syncs += 1;
            if self.syncs == self.fail_sync_on {
                return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_stream_close_reports_pair() {
        let (tx, rx) = unbounded();
        {
            let mut stream = PairStream::new(0, tx.clone());
            stream.send(line("0xP1"));
            stream.send(line("0xP2"));
        }
        {
            let mut stream = PairStream::new(1, tx);
            stream.fail();
        }
        let mut out = Vec::new();
        let summary = write_loop(&mut out, rx, 20);
        assert_eq!(summary.lines_written, 2);
        assert_eq!(summary.pairs_completed, 2);
        assert_eq!(summary.pairs_failed, 1);
        assert_eq!(summary.pairs_with_routes, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_messages_carry_their_pair() {
        let (tx, rx) = unbounded();
        {
            let mut stream = PairStream::new(7, tx);
            stream.send(line("0xP1"));
        }
        let messages: Vec<WriterMessage> = rx.iter().collect();
        assert!(matches!(messages[0], WriterMessage::Line { pair: 7, .. }));
        assert!(matches!(
            messages[1],
            WriterMessage::PairDone {
                pair: 7,
                routes: 1,
                failed: false
            }
        ));
    }

    #[test]
    fn test_stream_dropped_by_panic_reports_failure() {
        let (tx, rx) = unbounded();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut stream = PairStream::new(3, tx);
            stream.send(line("0xP1"));
            panic!("query blew up");
        }));
        assert!(result.is_err());

        let summary = write_loop(&mut Vec::new(), rx, 20);
        assert_eq!(summary.pairs_completed, 1);
        assert_eq!(summary.pairs_failed, 1);
    }

    #[test]
    fn test_write_error_does_not_stop_loop() {
        let (tx, rx) = unbounded();
        for i in 0..5 {
            tx.send(WriterMessage::Line {
                pair: i,
                line: line(&format!("0xP{}", i)),
            })
            .unwrap();
        }
        drop(tx);

        let mut out = FlakyWriter {
            fail_on: 2,
            ..FlakyWriter::default()
        };
        let summary = write_loop(&mut out, rx, 2);
        assert_eq!(summary.lines_written, 4);
        assert_eq!(summary.write_errors, 1);
        assert!(summary.last_error.is_some());
        // two periodic syncs plus the final one
        assert_eq!(out.syncs, 3);
    }

    #[test]
    fn test_failed_sync_leaves_lines_unconfirmed() {
        let (tx, rx) = unbounded();
        for i in 0..5 {
            tx.send(WriterMessage::Line {
                pair: i,
                line: line(&format!("0xP{}", i)),
            })
            .unwrap();
        }
        drop(tx);

        let mut out = FlakyWriter {
            fail_sync_on: 1,
            ..FlakyWriter::default()
        };
        let summary = write_loop(&mut out, rx, 2);
        assert_eq!(summary.lines_written, 3);
        assert_eq!(summary.lines_unconfirmed, 2);
        assert_eq!(summary.write_errors, 1);
    }
}
