/*!
 * Core Types
 *
 * Shared error taxonomy and centralized limits used by every synchronizer.
 */

pub mod errors;
pub mod limits;

pub use errors::{SyncError, SyncResult};
