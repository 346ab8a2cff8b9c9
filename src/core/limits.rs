/*!
 * Limits and Constants
 *
 * Centralized location for capacity bounds and wait tuning.
 * All values include rationale comments explaining WHY they exist.
 */

use std::time::Duration;

/// Maximum bounded-channel capacity (1M slots)
/// Caps accidental `usize::MAX`-style constructions; blocking put enforces
/// the bound at runtime regardless.
pub const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

/// Maximum admission-set capacity (1M entries)
/// Same guard as the channel bound; admission beyond this is a sizing bug.
pub const MAX_ADMISSION_CAPACITY: usize = 1_000_000;

/// Maximum parties for barriers and gates (64K)
/// A rendezvous across more threads than any realistic executor can run
/// simultaneously deadlocks by construction.
pub const MAX_PARTIES: usize = 65_536;

/// Condvar wait slice for blocking waits (100ms)
/// Cancellation wakes parked threads eagerly through subscriptions; the
/// slice only bounds the damage of a lost wakeup and keeps timed waits
/// responsive to deadline checks.
pub const WAIT_SLICE: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_sane() {
        assert!(MAX_CHANNEL_CAPACITY > 0);
        assert!(MAX_ADMISSION_CAPACITY > 0);
        assert!(MAX_PARTIES > 0);
        assert!(WAIT_SLICE > Duration::ZERO);
    }
}
