/*!
 * Pipeline Types
 * Worker error records and pipeline statistics
 */

use crate::channel::ChannelStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A per-item consumer failure, collected instead of crashing the worker
///
/// One bad item never kills its worker loop; the failure is recorded here
/// and processing continues. Inspect via `Pipeline::errors` after `stop()`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Worker {worker} failed on item {item_index}: {message}")]
pub struct WorkerError {
    /// Name of the worker unit that hit the failure
    pub worker: String,
    /// 1-based index of the item within that worker's take sequence
    pub item_index: u64,
    pub message: String,
}

/// Pipeline statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineStats {
    pub channel: ChannelStats,
    pub producers: usize,
    pub consumers: usize,
    /// Items accepted by the channel
    pub produced: u64,
    /// Items processed without error
    pub consumed: u64,
    pub error_count: usize,
    pub cancelled: bool,
}
