/*!
 * Pipeline Manager
 * Producer/consumer composition over a bounded channel with cooperative shutdown
 */

use super::executor::{Executor, ThreadExecutor, WorkerHandle};
use super::types::{PipelineStats, WorkerError};
use crate::cancel::CancellationToken;
use crate::channel::BoundedChannel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces the next work item; `None` means the source is exhausted
pub type ProducerFn<T> = Box<dyn FnMut() -> Option<T> + Send>;

/// Processes one work item; failures are collected, never fatal to the worker
pub type ConsumerFn<T> =
    Box<dyn FnMut(T) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send>;

#[derive(Default)]
struct Counters {
    produced: AtomicU64,
    consumed: AtomicU64,
}

/// Builder for `Pipeline`
pub struct PipelineBuilder {
    capacity: usize,
    name: String,
    executor: Arc<dyn Executor>,
}

impl PipelineBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            name: "pipeline".to_string(),
            executor: Arc::new(ThreadExecutor),
        }
    }

    /// Worker name prefix, used in thread names and error records
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Scheduler that runs the worker units
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn build<T: Send + 'static>(self) -> Pipeline<T> {
        Pipeline {
            channel: BoundedChannel::new(self.capacity),
            token: CancellationToken::new(),
            executor: self.executor,
            name: self.name,
            errors: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Counters::default()),
            handles: Vec::new(),
            producers: 0,
            consumers: 0,
        }
    }
}

/// Bounded producer/consumer pipeline
///
/// Owns the channel and the cancellation token; worker threads of control
/// belong to the executor, the pipeline only coordinates and joins them.
/// `stop()` cancels the token and returns only once every worker has
/// observably exited. Workers are never forcibly killed: cancellation is
/// observed at the channel suspension points, so a worker finishes its
/// current processing step but takes no further item.
pub struct Pipeline<T> {
    channel: BoundedChannel<T>,
    token: CancellationToken,
    executor: Arc<dyn Executor>,
    name: String,
    errors: Arc<Mutex<Vec<WorkerError>>>,
    counters: Arc<Counters>,
    handles: Vec<Box<dyn WorkerHandle>>,
    producers: usize,
    consumers: usize,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Pipeline over a channel of the given capacity, on the default
    /// thread executor
    pub fn new(capacity: usize) -> Self {
        PipelineBuilder::new(capacity).build()
    }

    /// Launch producer and consumer workers sharing the channel and token
    pub fn start(&mut self, producers: Vec<ProducerFn<T>>, consumers: Vec<ConsumerFn<T>>) {
        debug!(
            pipeline = %self.name,
            producers = producers.len(),
            consumers = consumers.len(),
            capacity = self.channel.capacity(),
            "starting pipeline"
        );

        for produce in producers {
            let worker = format!("{}-producer-{}", self.name, self.producers);
            self.producers += 1;

            let channel = self.channel.clone();
            let token = self.token.clone();
            let counters = self.counters.clone();
            let worker_name = worker.clone();
            let handle = self.executor.spawn(
                &worker,
                Box::new(move || run_producer(channel, token, produce, counters, worker_name)),
            );
            self.handles.push(handle);
        }

        for consume in consumers {
            let worker = format!("{}-consumer-{}", self.name, self.consumers);
            self.consumers += 1;

            let channel = self.channel.clone();
            let token = self.token.clone();
            let counters = self.counters.clone();
            let errors = self.errors.clone();
            let worker_name = worker.clone();
            let handle = self.executor.spawn(
                &worker,
                Box::new(move || run_consumer(channel, token, consume, counters, errors, worker_name)),
            );
            self.handles.push(handle);
        }
    }

    /// Cancel the token and wait for every worker to exit
    ///
    /// Synchronous and idempotent; returns only once all workers have
    /// actually stopped.
    pub fn stop(&mut self) {
        self.token.cancel();
        for handle in self.handles.drain(..) {
            handle.join();
        }
        debug!(pipeline = %self.name, "pipeline stopped");
    }

    /// Collected per-item consumer failures
    pub fn errors(&self) -> Vec<WorkerError> {
        self.errors.lock().clone()
    }

    /// Drain the collected failures
    pub fn take_errors(&self) -> Vec<WorkerError> {
        std::mem::take(&mut *self.errors.lock())
    }

    /// The pipeline's cancellation token (shared with all workers)
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The underlying channel, e.g. for draining leftovers after `stop()`
    pub fn channel(&self) -> &BoundedChannel<T> {
        &self.channel
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            channel: self.channel.stats(),
            producers: self.producers,
            consumers: self.consumers,
            produced: self.counters.produced.load(Ordering::Relaxed),
            consumed: self.counters.consumed.load(Ordering::Relaxed),
            error_count: self.errors.lock().len(),
            cancelled: self.token.is_cancelled(),
        }
    }
}

impl<T> Drop for Pipeline<T> {
    fn drop(&mut self) {
        // Safety net for pipelines dropped without an explicit stop()
        if !self.handles.is_empty() {
            self.token.cancel();
            for handle in self.handles.drain(..) {
                handle.join();
            }
        }
    }
}

/// Producer contract: produce and put until exhausted or cancelled
fn run_producer<T: Send + 'static>(
    channel: BoundedChannel<T>,
    token: CancellationToken,
    mut produce: ProducerFn<T>,
    counters: Arc<Counters>,
    worker: String,
) {
    loop {
        if token.is_cancelled() {
            break;
        }

        let Some(item) = produce() else {
            debug!(worker = %worker, "source exhausted");
            break;
        };

        match channel.put(item, &token) {
            Ok(()) => {
                counters.produced.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                // Cancelled mid-put; the item came back and is dropped here
                debug!(worker = %worker, cancelled = err.is_cancelled(), "producer stopping");
                break;
            }
        }
    }
    debug!(worker = %worker, "producer exited");
}

/// Consumer contract: take and process until cancelled; one bad item is
/// recorded, never fatal
fn run_consumer<T: Send + 'static>(
    channel: BoundedChannel<T>,
    token: CancellationToken,
    mut consume: ConsumerFn<T>,
    counters: Arc<Counters>,
    errors: Arc<Mutex<Vec<WorkerError>>>,
    worker: String,
) {
    let mut item_index: u64 = 0;

    loop {
        let item = match channel.take(&token) {
            Ok(item) => item,
            Err(_) => break,
        };
        item_index += 1;

        match consume(item) {
            Ok(()) => {
                counters.consumed.fetch_add(1, Ordering::Relaxed);
            }
            Err(source) => {
                warn!(worker = %worker, item_index, error = %source, "item processing failed");
                errors.lock().push(WorkerError {
                    worker: worker.clone(),
                    item_index,
                    message: source.to_string(),
                });
            }
        }
    }
    debug!(worker = %worker, "consumer exited");
}
