//! The raw sequence lock: an optimistic-reader / exclusive-writer primitive.
//!
//! Readers never block and never touch shared state; they snapshot a
//! sequence counter, run their critical section with plain unsynchronized
//! reads, and then validate the snapshot. Writers serialize through an
//! exclusive mutex and bracket their critical section with two counter
//! increments. The cost model is the whole point: an uncontended
//! optimistic read is two atomic loads, no read-modify-write, no
//! cache-line ping-pong between readers.
//!
//! # Protocol
//!
//! **Writer:**
//! 1. Acquire the exclusive mutex (may block behind another writer)
//! 2. Increment the sequence to odd (signals "write in progress")
//! 3. Mutate the protected state freely
//! 4. Increment the sequence to even, release the mutex
//!
//! **Reader:**
//! 1. `begin_read()` — snapshot the sequence into a [`Stamp`]
//! 2. Run the read-only critical section (unsynchronized loads)
//! 3. `validate(&mut stamp)` — `true` means no writer overlapped the
//!    window and every value read is consistent with a single instant;
//!    `false` means retry from step 2 with the refreshed stamp
//!
//! The retry loop is unbounded. Writer critical sections are expected to
//! be short and rare relative to reads; a reader starved by literally
//! unbounded writer activity is an accepted trade-off of the design, not
//! a defect. A caller that needs a bound counts attempts itself.
//!
//! # Sequence Number Semantics
//!
//! - **Even**: no writer active, optimistic reads can settle
//! - **Odd**: a writer is inside its critical section
//!
//! The counter wraps silently at `u64::MAX`; only equality and parity are
//! ever inspected, so wraparound does not disturb the protocol.

use crate::stamp::Stamp;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering, fence};

/// A sequence lock over an external protected resource.
///
/// The lock owns nothing but the sequence counter and the writer mutex;
/// the protected state lives wherever the caller keeps it. The caller's
/// side of the contract: readers only read, and all mutation happens
/// between `lock()` and the drop of the returned guard. For a typed,
/// self-contained variant that enforces this, see
/// [`SeqCell`](crate::SeqCell).
pub struct SeqMutex {
    /// Serializes writers. Readers never touch it.
    mutex: Mutex<()>,
    /// Sequence counter: odd = writer active, even = quiescent.
    seq: AtomicU64,
}

impl SeqMutex {
    /// Creates a lock with the sequence counter at 0.
    #[inline]
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            seq: AtomicU64::new(0),
        }
    }

    /// Creates a lock with the sequence counter seeded to `seq`.
    ///
    /// Useful for exercising counter wraparound (seed near `u64::MAX`)
    /// and for resuming a counter from externally persisted state.
    ///
    /// # Panics
    /// Panics if `seq` is odd — an odd counter claims a writer is active
    /// inside a lock that no one can possibly hold yet.
    #[inline]
    pub const fn with_sequence(seq: u64) -> Self {
        assert!(seq & 1 == 0, "initial sequence must be even");
        Self {
            mutex: Mutex::new(()),
            seq: AtomicU64::new(seq),
        }
    }

    /// Begins an optimistic read attempt, snapshotting the sequence.
    ///
    /// Never blocks and never writes shared state. The caller runs its
    /// read-only critical section next, then calls [`validate`].
    ///
    /// # Memory Ordering
    /// `Acquire`, so the critical-section reads that follow cannot be
    /// hoisted above the snapshot and are ordered after the matching
    /// writer's `Release` increment.
    ///
    /// [`validate`]: SeqMutex::validate
    #[inline(always)]
    pub fn begin_read(&self) -> Stamp {
        Stamp(self.seq.load(Ordering::Acquire))
    }

    /// Ends an optimistic read attempt.
    ///
    /// Returns `true` if no writer critical section overlapped the window
    /// between `begin_read()` and this call: every unsynchronized read the
    /// caller performed in between observed state consistent with a single
    /// instant in time.
    ///
    /// Returns `false` if the attempt raced a writer — either a writer was
    /// already active when the stamp was captured (odd stamp), or the
    /// counter moved during the window. On failure the stamp is refreshed
    /// in place with the current counter value, so the caller retries its
    /// critical section and validates again with the same stamp. A `false`
    /// here is routine control flow, not an error.
    ///
    /// # Memory Ordering
    /// An `Acquire` fence before the re-load keeps the caller's
    /// critical-section reads from sinking below the second counter load
    /// (a plain load cannot carry `Release` ordering, hence the fence);
    /// the load itself can then be `Relaxed`.
    #[inline(always)]
    pub fn validate(&self, stamp: &mut Stamp) -> bool {
        fence(Ordering::Acquire);
        let current = self.seq.load(Ordering::Relaxed);

        // A writer that was already active when the stamp was captured may
        // still be active now, leaving the counter unchanged from this
        // reader's perspective. The parity check catches that case before
        // the equality check can be fooled by it.
        if stamp.writer_active() {
            *stamp = Stamp(current);
            return false;
        }

        // Counter moved: at least one full writer critical section elapsed
        // inside our window.
        if current != stamp.0 {
            *stamp = Stamp(current);
            return false;
        }

        true
    }

    /// Runs `critical` under the capture/validate/retry loop until it
    /// completes without a racing writer, returning its result.
    ///
    /// `critical` may run multiple times; any result computed during an
    /// invalidated attempt is discarded, never observed by the caller. It
    /// must therefore be idempotent apart from the reads it performs
    /// against the protected state.
    ///
    /// The loop spins with no backoff; see the module docs for the
    /// starvation trade-off.
    #[inline]
    pub fn read<R>(&self, mut critical: impl FnMut() -> R) -> R {
        let mut stamp = self.begin_read();
        loop {
            let out = critical();
            if self.validate(&mut stamp) {
                return out;
            }
            std::hint::spin_loop();
        }
    }

    /// Acquires exclusive write access, blocking behind any current writer.
    ///
    /// Readers are never blocked by this and never block it; concurrent
    /// optimistic reads simply fail validation and retry. The returned
    /// guard restores the even sequence and releases the mutex when
    /// dropped — on every exit path, including panic unwind, so a writer
    /// that dies mid-critical-section cannot leave the counter stuck odd.
    #[inline]
    pub fn lock(&self) -> SeqWriteGuard<'_> {
        self.write_guard(self.mutex.lock())
    }

    /// Attempts to acquire exclusive write access without blocking.
    ///
    /// Returns `None` if another writer currently holds the lock.
    #[inline]
    pub fn try_lock(&self) -> Option<SeqWriteGuard<'_>> {
        self.mutex.try_lock().map(|g| self.write_guard(g))
    }

    /// Enters the writer critical section once the mutex is held.
    ///
    /// # Memory Ordering
    /// The odd value is stored `Relaxed` and followed by a `Release`
    /// fence: a store cannot carry `Acquire` ordering, and the fence is
    /// what keeps the writer's payload mutations from floating above the
    /// increment. Holding the mutex makes the load/store pair safe
    /// despite not being a single read-modify-write.
    #[inline]
    fn write_guard<'a>(&'a self, mutex: MutexGuard<'a, ()>) -> SeqWriteGuard<'a> {
        let odd = self.seq.load(Ordering::Relaxed).wrapping_add(1);
        self.seq.store(odd, Ordering::Relaxed);
        fence(Ordering::Release);

        SeqWriteGuard {
            _mutex: mutex,
            lock: self,
            odd,
        }
    }
}

impl Default for SeqMutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a writer critical section.
///
/// While this guard lives, the sequence is odd and the holder has
/// exclusive mutation rights over the protected resource. Dropping it
/// performs the unlock: restore the even sequence, then release the
/// writer mutex. There is no manual `unlock`; an unpaired unlock is
/// unrepresentable.
pub struct SeqWriteGuard<'a> {
    /// Held for the guard's lifetime; released after the drop body runs.
    _mutex: MutexGuard<'a, ()>,
    lock: &'a SeqMutex,
    /// The odd sequence value entered at lock time.
    odd: u64,
}

impl Drop for SeqWriteGuard<'_> {
    /// # Memory Ordering
    /// `Release` store of the even value, ordered after every payload
    /// write in the critical section. The mutex field drops after this
    /// body, so the counter is even again before the next writer can
    /// enter.
    #[inline]
    fn drop(&mut self) {
        self.lock.seq.store(self.odd.wrapping_add(1), Ordering::Release);
    }
}
