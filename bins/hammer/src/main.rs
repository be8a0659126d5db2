mod config;

use config::HammerConfig;
use seqmut::SeqCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Payload the writers churn: eight lanes that must always agree. A torn
/// read shows up as lanes from two different generations.
type Payload = [u64; 8];

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HammerConfig::load(path)?,
        None => HammerConfig::default().check()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    info!(
        readers = config.readers,
        writers = config.writers,
        iterations = config.iterations,
        initial_sequence = config.initial_sequence,
        "hammering SeqCell"
    );

    let cell = Arc::new(SeqCell::with_sequence(config.initial_sequence, [0u64; 8]));
    let writers_done = Arc::new(AtomicBool::new(false));
    let reads_total = Arc::new(AtomicU64::new(0));

    let start = Instant::now();

    let mut writer_handles: Vec<_> = (0..config.writers)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let iterations = config.iterations;
            std::thread::spawn(move || {
                for i in 1..=iterations {
                    let mut w = cell.lock_write();
                    // Publish a transient generation, then restore the
                    // baseline before releasing. Readers must never see
                    // the transient state. black_box keeps the marker
                    // store from being folded into the baseline store.
                    *w = [i; 8];
                    std::hint::black_box(&mut *w);
                    *w = [0; 8];
                }
            })
        })
        .collect();

    let reader_handles: Vec<_> = (0..config.readers)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let done = Arc::clone(&writers_done);
            let total = Arc::clone(&reads_total);
            std::thread::spawn(move || {
                let mut torn: u64 = 0;
                while !done.load(Ordering::Relaxed) {
                    let snap: Payload = cell.read();
                    if snap != [0u64; 8] {
                        torn += 1;
                    }
                    total.fetch_add(1, Ordering::Relaxed);
                }
                torn
            })
        })
        .collect();

    // Progress reporting while the writers run, in the same cadence the
    // rest of this workspace reports rates.
    let mut last_report = Instant::now();
    while !writer_handles.is_empty() {
        writer_handles.retain(|h| !h.is_finished());
        if last_report.elapsed() >= Duration::from_secs(1) {
            let reads = reads_total.load(Ordering::Relaxed);
            info!(elapsed = ?start.elapsed(), reads_completed = reads, "progress");
            last_report = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    writers_done.store(true, Ordering::Relaxed);

    let mut torn_total: u64 = 0;
    for handle in reader_handles {
        torn_total += handle.join().expect("reader thread panicked");
    }

    let elapsed = start.elapsed();
    let writes = config.writers as u64 * config.iterations;
    let reads = reads_total.load(Ordering::Relaxed);
    info!(
        ?elapsed,
        writes,
        reads,
        reads_per_sec = reads as f64 / elapsed.as_secs_f64(),
        torn_reads = torn_total,
        "hammer complete"
    );

    anyhow::ensure!(torn_total == 0, "{torn_total} validated reads observed torn state");
    info!("consistency check passed");
    Ok(())
}
