/*!
 * Error Types
 * Centralized error handling with thiserror and miette support
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result type for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronizer operation errors
///
/// Every variant is returned to the immediate caller; none is thrown across
/// worker boundaries. Invariant violations (occupancy above capacity, permit
/// underflow) are CORE bugs and panic instead of surfacing here.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SyncError {
    #[error("Operation cancelled")]
    #[diagnostic(
        code(synckit::cancelled),
        help("The cancellation token was triggered. Stop the current unit of work and exit cleanly.")
    )]
    Cancelled,

    #[error("Operation would block")]
    #[diagnostic(
        code(synckit::would_block),
        help("The non-blocking variant could not proceed immediately. Retry later or use the blocking form.")
    )]
    WouldBlock,

    #[error("Wait timed out")]
    #[diagnostic(
        code(synckit::timeout),
        help("The bounded wait expired before the condition was met.")
    )]
    Timeout,

    #[error("Barrier is broken")]
    #[diagnostic(
        code(synckit::barrier_broken),
        help("A party failed to arrive (cancelled or timed out). The barrier is unusable; create a new one.")
    )]
    BarrierBroken,
}

impl SyncError {
    /// True when the error was caused by cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SyncError::Cancelled.to_string(), "Operation cancelled");
        assert_eq!(SyncError::WouldBlock.to_string(), "Operation would block");
        assert_eq!(SyncError::Timeout.to_string(), "Wait timed out");
        assert_eq!(SyncError::BarrierBroken.to_string(), "Barrier is broken");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(SyncError::Cancelled.is_cancelled());
        assert!(!SyncError::Timeout.is_cancelled());
    }
}
