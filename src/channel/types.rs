/*!
 * Channel Types
 * Send errors carrying the rejected item, and channel statistics
 */

use crate::core::errors::SyncError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Why a blocking put failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// The cancellation token fired before the item could be inserted
    Cancelled,
    /// The bounded wait expired while the channel stayed full
    Timeout,
}

/// Error returned by `BoundedChannel::put` and `put_timeout`
///
/// Carries the item back to the caller; the channel never drops an element
/// it did not deliver.
pub struct SendError<T> {
    item: T,
    kind: SendErrorKind,
}

impl<T> SendError<T> {
    pub(crate) fn cancelled(item: T) -> Self {
        Self {
            item,
            kind: SendErrorKind::Cancelled,
        }
    }

    pub(crate) fn timeout(item: T) -> Self {
        Self {
            item,
            kind: SendErrorKind::Timeout,
        }
    }

    /// Recover the item that was not sent
    pub fn into_inner(self) -> T {
        self.item
    }

    pub fn kind(&self) -> SendErrorKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == SendErrorKind::Cancelled
    }
}

// Manual impls so T needs no Debug/Display bound (std::sync::mpsc style)
impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SendErrorKind::Cancelled => write!(f, "Channel put cancelled"),
            SendErrorKind::Timeout => write!(f, "Channel put timed out"),
        }
    }
}

impl<T> Error for SendError<T> {}

impl<T> From<SendError<T>> for SyncError {
    fn from(err: SendError<T>) -> Self {
        match err.kind {
            SendErrorKind::Cancelled => SyncError::Cancelled,
            SendErrorKind::Timeout => SyncError::Timeout,
        }
    }
}

/// Error returned by `BoundedChannel::try_put`
pub enum TrySendError<T> {
    /// All capacity slots are occupied; the item is handed back
    Full(T),
}

impl<T> TrySendError<T> {
    /// Recover the item that was not sent
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(item) => item,
        }
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "Full(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel is full")
    }
}

impl<T> Error for TrySendError<T> {}

impl<T> From<TrySendError<T>> for SyncError {
    fn from(_: TrySendError<T>) -> Self {
        SyncError::WouldBlock
    }
}

/// Channel statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelStats {
    pub capacity: usize,
    pub occupied: usize,
}
