/*!
 * Cooperative Cancellation
 *
 * An idempotent cancellation signal observed by every blocking synchronizer.
 * Parked threads are woken eagerly through wake subscriptions rather than
 * discovering cancellation on their next poll.
 */

mod token;

pub use token::CancellationToken;
pub(crate) use token::{CancelSubscription, CancelWake};
