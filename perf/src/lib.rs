//! Shared fixtures for the seqmut benchmarks.

use seqmut::SeqCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

/// Cache-line-sized payload the benchmarks read and write. All lanes must
/// agree in any consistent snapshot.
pub type Payload = [u64; 8];

pub const BASELINE: Payload = [0u64; 8];
pub const MARKER: Payload = [u64::MAX; 8];

/// A background thread that repeatedly flips a shared payload to the
/// marker state and back to baseline, simulating a contending writer.
///
/// Stops and joins on drop, so a benchmark can scope contention to a
/// single group.
pub struct BackgroundWriter {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundWriter {
    /// Contends on a `SeqCell` through its write guard.
    pub fn seqcell(cell: Arc<SeqCell<Payload>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                {
                    let mut w = cell.lock_write();
                    *w = MARKER;
                    std::hint::black_box(&mut *w);
                    for _ in 0..100 {
                        std::hint::spin_loop();
                    }
                    *w = BASELINE;
                }
                std::thread::yield_now();
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Contends on a `std::sync::RwLock` for the comparison benchmarks.
    pub fn rwlock(lock: Arc<RwLock<Payload>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                {
                    let mut w = lock.write().expect("writer poisoned");
                    *w = MARKER;
                    for _ in 0..100 {
                        std::hint::spin_loop();
                    }
                    *w = BASELINE;
                }
                std::thread::yield_now();
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
