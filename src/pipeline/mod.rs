/*!
 * Pipeline
 *
 * Composes the synchronizers into a bounded producer/consumer pipeline:
 * producers push into a `BoundedChannel`, consumers drain it, and a shared
 * `CancellationToken` propagates cooperative shutdown to every worker.
 * Worker units run on an application-supplied `Executor`; the pipeline
 * coordinates them but never owns pool lifecycle beyond joining.
 */

mod executor;
mod manager;
mod types;

pub use executor::{Executor, ThreadExecutor, WorkerHandle};
pub use manager::{ConsumerFn, Pipeline, PipelineBuilder, ProducerFn};
pub use types::{PipelineStats, WorkerError};
