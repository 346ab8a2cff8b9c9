/*!
 * Synckit
 *
 * A toolkit of thread synchronizers for building bounded, cancellation-aware
 * concurrent pipelines:
 * - Cooperative cancellation (`CancellationToken`)
 * - Bounded FIFO hand-off (`BoundedChannel`)
 * - Semaphore-bounded admission control (`AdmissionSet`)
 * - Reusable phase rendezvous (`PhaseBarrier`)
 * - One-shot start/stop timing gate (`StartStopGate`)
 * - Producer/consumer composition (`Pipeline`)
 *
 * # Design
 *
 * Every blocking operation takes a `CancellationToken` and fails fast with
 * `SyncError::Cancelled` instead of hanging once cancellation is requested,
 * including threads already parked when `cancel()` is called. Non-blocking
 * `try_*` counterparts exist for probing and shutdown draining.
 */

pub mod admission;
pub mod barrier;
pub mod cancel;
pub mod core;
pub mod channel;
pub mod pipeline;

// Re-exports
pub use self::core::{SyncError, SyncResult};
pub use admission::AdmissionSet;
pub use barrier::{PhaseBarrier, StartStopGate};
pub use cancel::CancellationToken;
pub use channel::{BoundedChannel, ChannelStats, SendError, SendErrorKind, TrySendError};
pub use pipeline::{
    ConsumerFn, Executor, Pipeline, PipelineBuilder, PipelineStats, ProducerFn, ThreadExecutor,
    WorkerError, WorkerHandle,
};
