//! A typed payload cell built on the raw sequence lock.
//!
//! [`SeqMutex`](crate::SeqMutex) guards an external resource and trusts
//! the caller to keep readers read-only and writers inside the guard.
//! `SeqCell<T>` packages the payload together with the lock so that the
//! contract is enforced by the API: readers get a validated *copy* of the
//! payload, writers mutate it only through the RAII write guard.
//!
//! `T` must be `Copy`. A reader's in-flight copy may be torn by a
//! concurrent writer; a `Copy` type makes that harmless — the torn bytes
//! are discarded when validation fails and never interpreted as a live
//! value (they are held in `MaybeUninit` until the stamp checks out).
//! Types with drop glue or interior pointers cannot be handled this way;
//! use a conventional reader/writer lock for those.

use crate::raw::{SeqMutex, SeqWriteGuard};
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr;

/// A `Copy` payload guarded by a sequence lock.
///
/// Reads are optimistic and never block: `read()` loops copy/validate
/// until a quiescent window is observed, `try_read()` makes a single
/// attempt. Writes serialize through [`lock_write`](SeqCell::lock_write).
pub struct SeqCell<T> {
    lock: SeqMutex,
    data: UnsafeCell<T>,
}

// SAFETY: the sequence lock protocol makes concurrent access sound:
// - readers never hand out references, only validated copies;
// - writers are serialized by the mutex and bracketed by the counter.
// `T: Send` is all that is required — a reader copying the payload on
// another thread is equivalent to sending a `T` across threads.
unsafe impl<T: Send> Send for SeqCell<T> {}
unsafe impl<T: Send> Sync for SeqCell<T> {}

impl<T: Copy> SeqCell<T> {
    /// Creates a cell holding `value`, sequence counter at 0.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            lock: SeqMutex::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Creates a cell holding `value` with the sequence counter seeded to
    /// `seq`, for wraparound testing or resuming a persisted counter.
    ///
    /// # Panics
    /// Panics if `seq` is odd (claims a writer is active in a fresh lock).
    #[inline]
    pub const fn with_sequence(seq: u64, value: T) -> Self {
        Self {
            lock: SeqMutex::with_sequence(seq),
            data: UnsafeCell::new(value),
        }
    }

    /// Makes a single optimistic read attempt.
    ///
    /// Returns `None` if a writer was active at capture time or raced the
    /// copy; the caller decides whether to retry, back off, or give up.
    /// [`read`](SeqCell::read) is the retry-forever convenience.
    #[inline(always)]
    pub fn try_read(&self) -> Option<T> {
        let mut stamp = self.lock.begin_read();
        if stamp.writer_active() {
            return None;
        }

        // Volatile copy into MaybeUninit: the writer may be racing us, so
        // the bytes are not assumed to be a valid T until the stamp
        // validates.
        // SAFETY: the pointer is valid and the copy makes no aliasing
        // claim a concurrent writer could violate.
        let value = unsafe { ptr::read_volatile(self.data.get() as *const MaybeUninit<T>) };

        if self.lock.validate(&mut stamp) {
            // SAFETY: no writer overlapped the copy, so the bytes are the
            // fully-written T the last writer published.
            Some(unsafe { value.assume_init() })
        } else {
            None
        }
    }

    /// Reads a consistent copy of the payload, spinning until a read
    /// attempt completes without a racing writer.
    ///
    /// Expected to succeed on the first attempt in the absence of write
    /// contention; under sustained writes it retries unboundedly (the
    /// accepted starvation trade-off of the protocol).
    #[inline(always)]
    pub fn read(&self) -> T {
        loop {
            if let Some(value) = self.try_read() {
                return value;
            }
            std::hint::spin_loop();
        }
    }

    /// Acquires exclusive write access to the payload, blocking behind any
    /// current writer.
    ///
    /// The returned guard dereferences to `T` for in-place mutation and
    /// performs the unlock on drop.
    #[inline]
    pub fn lock_write(&self) -> SeqCellWriteGuard<'_, T> {
        SeqCellWriteGuard {
            _write: self.lock.lock(),
            cell: self,
        }
    }

    /// Non-blocking [`lock_write`](SeqCell::lock_write); `None` if another
    /// writer holds the lock.
    #[inline]
    pub fn try_lock_write(&self) -> Option<SeqCellWriteGuard<'_, T>> {
        Some(SeqCellWriteGuard {
            _write: self.lock.try_lock()?,
            cell: self,
        })
    }

    /// Stores `value`, overwriting the payload.
    #[inline]
    pub fn write(&self, value: T) {
        *self.lock_write() = value;
    }

    /// Returns a mutable reference to the payload without any locking.
    ///
    /// Sound because the mutable borrow of `self` statically proves no
    /// reader or writer exists.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the cell, returning the payload.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Copy + Default> Default for SeqCell<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for SeqCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeqCell").field("data", &self.read()).finish()
    }
}

/// RAII guard granting exclusive mutable access to a [`SeqCell`] payload.
///
/// Holds the writer side of the sequence lock for its lifetime; dropping
/// it republishes the payload to readers (even sequence, mutex released).
pub struct SeqCellWriteGuard<'a, T> {
    /// Carries the odd sequence and the mutex; its drop is the unlock.
    _write: SeqWriteGuard<'a>,
    cell: &'a SeqCell<T>,
}

impl<T: Copy> Deref for SeqCellWriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: we hold the writer lock; no other writer exists and
        // readers only take validated copies.
        unsafe { &*self.cell.data.get() }
    }
}

impl<T: Copy> DerefMut for SeqCellWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, plus the mutable borrow of the guard prevents
        // aliasing through Deref.
        unsafe { &mut *self.cell.data.get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_initial_value() {
        let cell = SeqCell::new(5u64);
        assert_eq!(cell.read(), 5);
    }

    #[test]
    fn write_is_visible_to_subsequent_reads() {
        let cell = SeqCell::new(0u64);
        cell.write(42);
        assert_eq!(cell.read(), 42);

        {
            let mut w = cell.lock_write();
            *w += 1;
            assert_eq!(*w, 43);
        }
        assert_eq!(cell.read(), 43);
    }

    #[test]
    fn try_read_fails_while_writer_holds_guard() {
        let cell = SeqCell::new([0u64; 4]);

        let guard = cell.lock_write();
        assert!(cell.try_read().is_none());
        drop(guard);

        assert_eq!(cell.try_read(), Some([0u64; 4]));
    }

    #[test]
    fn try_lock_write_respects_writer_exclusivity() {
        let cell = SeqCell::new(1u32);

        let guard = cell.lock_write();
        assert!(cell.try_lock_write().is_none());
        drop(guard);

        let mut guard = cell.try_lock_write().expect("lock is free");
        *guard = 2;
        drop(guard);
        assert_eq!(cell.read(), 2);
    }

    #[test]
    fn get_mut_and_into_inner_bypass_the_protocol() {
        let mut cell = SeqCell::new(10i64);
        *cell.get_mut() = 11;
        assert_eq!(cell.read(), 11);
        assert_eq!(cell.into_inner(), 11);
    }

    #[test]
    fn concurrent_writer_and_readers_never_tear() {
        use std::sync::Arc;
        use std::thread;

        // The writer cycles every lane of the array through a marker and
        // restores the baseline before releasing. A validated reader must
        // only ever see the all-baseline state.
        const ITERS: u64 = 20_000;
        let cell = Arc::new(SeqCell::new([0u64; 8]));

        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 1..=ITERS {
                    let mut w = cell.lock_write();
                    *w = [i; 8];
                    // Keep the marker store alive so the window where a
                    // reader could tear is real, not optimized out.
                    std::hint::black_box(&mut *w);
                    *w = [0; 8];
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        let snap = cell.read();
                        assert_eq!(snap, [0u64; 8], "validated read observed a torn state");
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
