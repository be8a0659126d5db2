use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use seqmut::{SeqCell, SeqMutex};
use seqmut_perf::{BASELINE, BackgroundWriter, Payload};
use std::sync::{Arc, RwLock};

fn bench_uncontended_read(c: &mut Criterion) {
    let cell = SeqCell::new(BASELINE);
    let rwlock: RwLock<Payload> = RwLock::new(BASELINE);
    let raw = SeqMutex::new();

    let mut group = c.benchmark_group("uncontended");
    group.throughput(Throughput::Elements(1));

    group.bench_function("seqcell read", |b| {
        b.iter(|| black_box(cell.read()));
    });

    // The bare protocol cost: stamp capture plus validation, no payload.
    group.bench_function("raw begin/validate", |b| {
        b.iter(|| {
            let mut stamp = raw.begin_read();
            while !raw.validate(&mut stamp) {}
        });
    });

    group.bench_function("std rwlock read", |b| {
        b.iter(|| black_box(*rwlock.read().expect("poisoned")));
    });

    group.finish();
}

fn bench_contended_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.throughput(Throughput::Elements(1));

    {
        let cell = Arc::new(SeqCell::new(BASELINE));
        let _writer = BackgroundWriter::seqcell(Arc::clone(&cell));
        group.bench_function("seqcell read", |b| {
            b.iter(|| {
                let snap = black_box(cell.read());
                assert_eq!(snap, BASELINE, "validated read observed the marker");
            });
        });
    }

    {
        let lock: Arc<RwLock<Payload>> = Arc::new(RwLock::new(BASELINE));
        let _writer = BackgroundWriter::rwlock(Arc::clone(&lock));
        group.bench_function("std rwlock read", |b| {
            b.iter(|| {
                let snap = black_box(*lock.read().expect("poisoned"));
                assert_eq!(snap, BASELINE);
            });
        });
    }

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let cell = SeqCell::new(BASELINE);
    let rwlock: RwLock<Payload> = RwLock::new(BASELINE);

    let mut group = c.benchmark_group("write");
    group.throughput(Throughput::Elements(1));

    group.bench_function("seqcell lock_write", |b| {
        b.iter(|| {
            let mut w = cell.lock_write();
            *w = black_box(BASELINE);
        });
    });

    group.bench_function("std rwlock write", |b| {
        b.iter(|| {
            let mut w = rwlock.write().expect("poisoned");
            *w = black_box(BASELINE);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_read,
    bench_contended_read,
    bench_write
);
criterion_main!(benches);
