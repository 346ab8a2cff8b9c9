/*!
 * Barriers and Gates
 *
 * Rendezvous primitives for phased computation and timing harnesses:
 * - `PhaseBarrier`: reusable N-party rendezvous with an optional
 *   once-per-phase action and a terminal broken state
 * - `StartStopGate`: one-shot two-stage latch that brackets a measurement
 *   window free of thread-startup skew
 */

mod gate;
mod phase;

pub use gate::StartStopGate;
pub use phase::PhaseBarrier;
