/*!
 * Bounded Channel
 *
 * Fixed-capacity FIFO hand-off between producers and consumers. Blocking
 * put/take observe a `CancellationToken`; `try_*` variants never block and
 * keep working after cancellation so shutdown code can drain the buffer.
 */

mod bounded;
mod types;

pub use bounded::BoundedChannel;
pub use types::{ChannelStats, SendError, SendErrorKind, TrySendError};
