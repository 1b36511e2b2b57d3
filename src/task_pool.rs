use crate::RouteError;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// An item the pool refused, with the reason.
#[derive(Debug)]
pub struct Rejected<T> {
    pub item: T,
    pub reason: RouteError,
}

/// Bounded work queue served by a fixed set of worker threads.
///
/// `submit` never blocks: when the queue is at capacity it returns
/// `RouteError::QueueFull` and the caller decides what to do with the item.
/// Every submitted item is handed to the handler at most once.
pub struct TaskPool<T> {
    sender: Option<Sender<T>>,
    receiver: Receiver<T>,
    capacity: usize,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> TaskPool<T> {
    pub fn new(capacity: usize) -> Self {
        // A zero-capacity crossbeam channel is a rendezvous channel and would
        // reject every try_send while workers are busy.
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: Some(sender),
            receiver,
            capacity,
            workers: Vec::new(),
        }
    }

    /// Start `concurrency` workers, each pulling one item at a time and
    /// passing it to `handler` until the queue is closed and empty.
    pub fn run<H>(&mut self, concurrency: usize, handler: H) -> Result<(), RouteError>
    where
        H: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        for id in 0..concurrency.max(1) {
            let receiver = self.receiver.clone();
            let handler = Arc::clone(&handler);
            let handle = thread::Builder::new()
                .name(format!("routegen-worker-{}", id))
                .spawn(move || {
                    for item in receiver.iter() {
                        if catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
                            error!(worker = id, "task handler panicked");
                        }
                    }
                    debug!(worker = id, "worker exiting, queue closed");
                })?;
            self.workers.push(handle);
        }
        Ok(())
    }

    pub fn submit(&self, item: T) -> Result<(), RouteError> {
        self.try_submit(item).map_err(|rejected| rejected.reason)
    }

    /// Like `submit`, but hands a rejected item back so it can be retried.
    pub fn try_submit(&self, item: T) -> Result<(), Rejected<T>> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(Rejected {
                item,
                reason: RouteError::PoolClosed,
            });
        };
        sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => Rejected {
                item,
                reason: RouteError::QueueFull,
            },
            TrySendError::Disconnected(item) => Rejected {
                item,
                reason: RouteError::PoolClosed,
            },
        })
    }

    /// Close the queue. Items already queued are still delivered.
    pub fn stop(&mut self) {
        self.sender.take();
    }

    /// Block until every worker has exited. Only returns once `stop` has
    /// been called and the queue has drained.
    pub fn await_drain(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }
}

impl<T> Drop for TaskPool<T> {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
