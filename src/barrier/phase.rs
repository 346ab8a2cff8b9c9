/*!
 * Phase Barrier
 * Reusable N-party rendezvous with once-per-phase action and broken state
 */

use crate::cancel::{CancelWake, CancellationToken};
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{MAX_PARTIES, WAIT_SLICE};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

struct Waiters {
    released: Condvar,
}

impl CancelWake for Waiters {
    fn wake(&self) {
        self.released.notify_all();
    }
}

struct State {
    arrived: usize,
    phase: u64,
    broken: bool,
}

type PhaseAction = Box<dyn Fn() + Send + Sync>;

/// Reusable rendezvous point for a fixed number of parties
///
/// All `parties` threads block in `wait` until the last one arrives; the
/// last arriver runs the phase action exactly once, resets the arrival
/// count, advances the phase, and releases everyone together. A non-broken
/// barrier is reusable indefinitely across phases.
///
/// If any waiting party is cancelled or times out, the barrier enters a
/// terminal broken state: the failing caller gets its own error, every
/// other current and future waiter gets `BarrierBroken` immediately. A
/// half-released barrier never leaves parties waiting forever.
///
/// Share across threads via `Arc`.
pub struct PhaseBarrier {
    state: Mutex<State>,
    waiters: Arc<Waiters>,
    parties: usize,
    action: Option<PhaseAction>,
}

impl PhaseBarrier {
    /// Create a barrier for `parties` threads
    ///
    /// # Panics
    ///
    /// Panics on zero parties.
    pub fn new(parties: usize) -> Self {
        Self::build(parties, None)
    }

    /// Create a barrier that runs `action` once per phase, in the last
    /// arriving thread, before any party is released
    ///
    /// The action runs while the barrier's internal lock is held: it must
    /// not call back into the same barrier.
    pub fn with_action<F>(parties: usize, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(parties, Some(Box::new(action)))
    }

    fn build(parties: usize, action: Option<PhaseAction>) -> Self {
        assert!(parties > 0, "barrier parties must be positive");
        let parties = parties.min(MAX_PARTIES);

        Self {
            state: Mutex::new(State {
                arrived: 0,
                phase: 0,
                broken: false,
            }),
            waiters: Arc::new(Waiters {
                released: Condvar::new(),
            }),
            parties,
            action,
        }
    }

    /// Arrive and wait for the phase to complete
    ///
    /// Returns the 0-based arrival index: the triggering (last) party gets
    /// `parties - 1`, so callers can elect a last-one-out role without
    /// extra coordination.
    pub fn wait(&self, token: &CancellationToken) -> SyncResult<usize> {
        self.wait_inner(None, token)
    }

    /// Timed variant of `wait`; an expired wait breaks the barrier
    pub fn wait_timeout(&self, timeout: Duration, token: &CancellationToken) -> SyncResult<usize> {
        self.wait_inner(Some(timeout), token)
    }

    fn wait_inner(&self, timeout: Option<Duration>, token: &CancellationToken) -> SyncResult<usize> {
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let start = Instant::now();
        let _sub = token.subscribe(self.waiters.clone());
        let mut state = self.state.lock();

        if state.broken {
            return Err(SyncError::BarrierBroken);
        }

        let index = state.arrived;
        state.arrived += 1;

        if state.arrived == self.parties {
            // Last arriver: run the action, then release the phase
            if let Some(action) = &self.action {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(action)) {
                    warn!(phase = state.phase, "phase action panicked, breaking barrier");
                    state.broken = true;
                    drop(state);
                    self.waiters.released.notify_all();
                    resume_unwind(panic);
                }
            }

            state.arrived = 0;
            state.phase = state.phase.wrapping_add(1);
            drop(state);
            self.waiters.released.notify_all();
            return Ok(index);
        }

        let my_phase = state.phase;
        loop {
            if state.phase != my_phase {
                return Ok(index);
            }
            if state.broken {
                return Err(SyncError::BarrierBroken);
            }

            if token.is_cancelled() {
                self.break_locked(&mut state);
                return Err(SyncError::Cancelled);
            }

            let slice = match timeout {
                Some(limit) => match limit.checked_sub(start.elapsed()) {
                    Some(remaining) => remaining.min(WAIT_SLICE),
                    None => {
                        self.break_locked(&mut state);
                        return Err(SyncError::Timeout);
                    }
                },
                None => WAIT_SLICE,
            };
            self.waiters.released.wait_for(&mut state, slice);
        }
    }

    /// Break the barrier from a failing waiter; rolls back its arrival so
    /// the counters stay consistent even though the state is terminal
    fn break_locked(&self, state: &mut State) {
        state.arrived = state.arrived.saturating_sub(1);
        state.broken = true;
        warn!(phase = state.phase, "barrier broken");
        self.waiters.released.notify_all();
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Number of completed phases
    pub fn phase(&self) -> u64 {
        self.state.lock().phase
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }
}

impl std::fmt::Debug for PhaseBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PhaseBarrier")
            .field("parties", &self.parties)
            .field("arrived", &state.arrived)
            .field("phase", &state.phase)
            .field("broken", &state.broken)
            .finish()
    }
}
