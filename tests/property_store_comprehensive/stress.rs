//! Stress Tests
//!
//! Heavy-workload tests. All marked #[ignore] for opt-in execution.
//! Run with: cargo test --test property_store_comprehensive stress -- --ignored

use crate::common::*;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

/// Readers in separate instances never observe a mix of two values
#[test]
#[ignore]
fn stress_cross_instance_reads_are_never_torn() {
    let store = TestStore::new();
    let writer = store.writer();
    let a = "A".repeat(7);
    let b = "b".repeat(91);
    let info = writer.add("sys.stress.torn", &a).unwrap();

    let readers: Vec<_> = (0..8).map(|_| store.reader()).collect();
    let stop = AtomicBool::new(false);
    let reads = AtomicU64::new(0);
    let barrier = Barrier::new(readers.len() + 1);

    thread::scope(|s| {
        for reader in &readers {
            let (a, b, stop, reads, barrier) = (&a, &b, &stop, &reads, &barrier);
            s.spawn(move || {
                let handle = reader.find("sys.stress.torn").unwrap();
                barrier.wait();
                while !stop.load(Ordering::Relaxed) {
                    let (_, value) = reader.read(&handle).unwrap();
                    assert!(value == *a || value == *b, "torn read: {:?}", value);
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        barrier.wait();
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut rng = rand::thread_rng();
        while Instant::now() < deadline {
            let value = if rng.gen_bool(0.5) { &a } else { &b };
            writer.update(&info, value).unwrap();
        }
        stop.store(true, Ordering::Relaxed);
    });

    assert!(reads.load(Ordering::Relaxed) > 0);
}

/// Many writer threads filling every context until the areas are nearly full
#[test]
#[ignore]
fn stress_parallel_writers_fill_contexts() {
    let store = TestStore::new();
    let writer = store.writer();
    let prefixes = ["ro.", "persist.sys.", "sys.", "debug.", "misc."];
    let per_thread = 200;

    thread::scope(|s| {
        for (t, prefix) in prefixes.iter().enumerate() {
            let writer = &writer;
            s.spawn(move || {
                for i in 0..per_thread {
                    let name = format!("{}t{}.p{}", prefix, t, i);
                    writer.add(&name, &i.to_string()).unwrap();
                }
            });
        }
    });

    let reader = store.reader();
    assert_eq!(reader.foreach(|_| {}), prefixes.len() * per_thread);
    for (t, prefix) in prefixes.iter().enumerate() {
        let name = format!("{}t{}.p{}", prefix, t, per_thread - 1);
        assert_eq!(reader.get(&name), Some((per_thread - 1).to_string()));
    }
}
