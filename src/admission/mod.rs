/*!
 * Admission Control
 *
 * A capacity-bounded concurrent set: admission consumes a permit, removal
 * returns one. Unlike the channel the bound applies to a set of distinct
 * in-flight items, not a FIFO queue, and `try_add` favors immediate
 * rejection over queueing.
 */

mod set;

pub use set::AdmissionSet;
