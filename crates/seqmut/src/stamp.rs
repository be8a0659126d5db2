//! Reader stamps: opaque snapshots of the sequence counter.
//!
//! A stamp is captured at the start of an optimistic read attempt and
//! handed back to [`SeqMutex::validate`](crate::SeqMutex::validate) at the
//! end. It is owned by exactly one reader; validation refreshes it in
//! place when the attempt has to be retried. The raw counter value is
//! deliberately not exposed — callers interact with the protocol only
//! through `begin_read`/`validate`, which keeps the parity invariant out
//! of reach of caller code.

/// An opaque snapshot of a [`SeqMutex`](crate::SeqMutex) sequence counter.
///
/// Obtained from `begin_read()`. Carries no state other than the counter
/// value it was captured with; after a failed `validate()` it holds the
/// counter value current at validation time, ready for the retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamp(pub(crate) u64);

impl Stamp {
    /// Returns `true` if a writer was inside its critical section at the
    /// moment this stamp was captured (odd sequence value).
    ///
    /// A reader that sees this can skip its critical section entirely:
    /// validation against this stamp is guaranteed to fail.
    #[inline]
    pub fn writer_active(&self) -> bool {
        self.0 & 1 == 1
    }
}
