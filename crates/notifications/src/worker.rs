//! Bounded worker pool for consuming a subscription.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{Message, MessageHandler, Subscription};

/// Pool size and queue depth.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    /// Messages buffered between the fetch loop and the workers.
    pub queue_capacity: usize,
    /// Pause after a failed fetch.
    pub fetch_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 50,
            fetch_backoff: Duration::from_millis(500),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_fetch_backoff(mut self, backoff: Duration) -> Self {
        self.fetch_backoff = backoff;
        self
    }
}

/// What the workers did before the pool stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Handled and committed.
    pub handled: usize,
    /// Handler failed; left uncommitted for redelivery.
    pub failed: usize,
    /// Undecodable; committed without handling.
    pub poisoned: usize,
}

impl DrainReport {
    fn merge(&mut self, other: DrainReport) {
        self.handled += other.handled;
        self.failed += other.failed;
        self.poisoned += other.poisoned;
    }
}

/// One fetch loop feeding a fixed number of workers through a bounded queue.
///
/// A full queue stalls the fetch loop, so a slow notifier slows consumption
/// instead of growing memory. On shutdown the fetch loop stops, the workers
/// finish whatever is already queued and then exit.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self { config }
    }

    /// Runs until `shutdown` turns true (or its sender is dropped).
    pub async fn run(
        &self,
        subscription: Arc<dyn Subscription>,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) -> DrainReport {
        let (tx, rx) = mpsc::channel::<Message>(self.config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker in 0..self.config.workers.max(1) {
            workers.spawn(work(
                worker,
                queue.clone(),
                subscription.clone(),
                handler.clone(),
            ));
        }
        info!(
            workers = self.config.workers,
            capacity = self.config.queue_capacity,
            "worker pool started"
        );

        loop {
            let fetched = tokio::select! {
                _ = stopped(&mut shutdown) => break,
                fetched = subscription.next() => fetched,
            };

            match fetched {
                Ok(message) => {
                    tokio::select! {
                        _ = stopped(&mut shutdown) => break,
                        sent = tx.send(message) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "fetch failed");
                    tokio::select! {
                        _ = stopped(&mut shutdown) => break,
                        _ = tokio::time::sleep(self.config.fetch_backoff) => {}
                    }
                }
            }
        }

        // Closing the queue lets workers drain it and exit.
        drop(tx);

        let mut report = DrainReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => error!(error = %e, "worker task failed"),
            }
        }
        info!(
            handled = report.handled,
            failed = report.failed,
            poisoned = report.poisoned,
            "worker pool drained"
        );
        report
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also means stop.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn work(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Message>>>,
    subscription: Arc<dyn Subscription>,
    handler: Arc<dyn MessageHandler>,
) -> DrainReport {
    let mut report = DrainReport::default();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(message) = next else {
            break;
        };

        match handler.handle(&message).await {
            Ok(()) => {
                report.handled += 1;
                metrics::counter!("notifications_handled_total", "outcome" => "ok").increment(1);
                commit(subscription.as_ref(), &message).await;
            }
            Err(e) if e.is_poison() => {
                report.poisoned += 1;
                metrics::counter!("notifications_handled_total", "outcome" => "poison")
                    .increment(1);
                warn!(worker, offset = message.offset, error = %e, "dropping undecodable message");
                commit(subscription.as_ref(), &message).await;
            }
            Err(e) => {
                report.failed += 1;
                metrics::counter!("notifications_handled_total", "outcome" => "failed")
                    .increment(1);
                error!(
                    worker,
                    offset = message.offset,
                    error = %e,
                    "handler failed, leaving message uncommitted"
                );
            }
        }
    }

    debug!(worker, "worker stopped");
    report
}

async fn commit(subscription: &dyn Subscription, message: &Message) {
    if let Err(e) = subscription.commit(message).await {
        error!(offset = message.offset, error = %e, "failed to commit offset");
    }
}
