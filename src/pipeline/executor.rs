/*!
 * Executor Abstraction
 * Worker units run on a scheduler supplied by the embedding application
 */

use std::thread;
use tracing::warn;

/// Handle to a spawned worker unit
///
/// `join` blocks until the worker has observably exited. A panicking worker
/// is reported, never propagated through the join.
pub trait WorkerHandle: Send {
    fn join(self: Box<Self>);
}

/// Scheduler supplied by the embedding application
///
/// The CORE coordinates workers through this seam; thread-pool lifecycle,
/// sizing, and affinity stay with the caller.
pub trait Executor: Send + Sync {
    fn spawn(&self, name: &str, work: Box<dyn FnOnce() + Send + 'static>) -> Box<dyn WorkerHandle>;
}

/// Default executor backed by named OS threads
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

struct ThreadHandle {
    name: String,
    handle: thread::JoinHandle<()>,
}

impl WorkerHandle for ThreadHandle {
    fn join(self: Box<Self>) {
        if self.handle.join().is_err() {
            warn!(worker = %self.name, "worker thread panicked");
        }
    }
}

impl Executor for ThreadExecutor {
    fn spawn(&self, name: &str, work: Box<dyn FnOnce() + Send + 'static>) -> Box<dyn WorkerHandle> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .expect("failed to spawn worker thread");

        Box::new(ThreadHandle {
            name: name.to_string(),
            handle,
        })
    }
}
