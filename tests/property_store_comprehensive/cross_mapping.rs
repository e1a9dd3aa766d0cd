//! Writer and readers as separate instances over the same files.

use crate::common::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use sysprops::{Error, SystemProperties};

#[test]
fn test_reader_opened_early_sees_later_writes() {
    let store = TestStore::new();
    let writer = store.writer();
    let reader = store.reader();
    assert_eq!(reader.get("sys.late"), None);

    writer.add("sys.late", "1").unwrap();
    assert_eq!(reader.get("sys.late").as_deref(), Some("1"));

    writer.set("sys.late", "2").unwrap();
    assert_eq!(reader.get("sys.late").as_deref(), Some("2"));
}

#[test]
fn test_reader_waits_on_property_added_after_lookup() {
    let store = TestStore::new();
    let writer = store.writer();
    let reader = store.reader();

    let old = reader.area_serial();
    assert!(reader.find("sys.appears").is_none());

    thread::scope(|s| {
        let waiter = s.spawn(|| reader.wait(None, old, Some(Duration::from_secs(10))));
        thread::sleep(Duration::from_millis(20));
        writer.add("sys.appears", "yes").unwrap();
        assert!(waiter.join().unwrap().is_some());
    });
    assert_eq!(reader.get("sys.appears").as_deref(), Some("yes"));
}

#[test]
fn test_wait_times_out_without_writes() {
    let store = TestStore::new();
    let writer = store.writer();
    writer.add("sys.idle", "0").unwrap();

    let reader = store.reader();
    let info = reader.find("sys.idle").unwrap();
    let serial = reader.serial(&info);
    assert_eq!(
        reader.wait(Some(&info), serial, Some(Duration::from_millis(30))),
        None
    );
    assert_eq!(
        reader.wait(None, reader.area_serial(), Some(Duration::from_millis(30))),
        None
    );
}

#[test]
fn test_readers_cannot_mutate() {
    let store = TestStore::new();
    let writer = store.writer();
    writer.add("ro.secure", "1").unwrap();

    let reader = store.reader();
    assert!(!reader.is_writer());
    assert!(matches!(reader.add("sys.x", "1"), Err(Error::ReadOnly)));
    assert!(matches!(reader.set("ro.secure", "0"), Err(Error::ReadOnly)));
    let info = reader.find("ro.secure").unwrap();
    assert!(matches!(reader.update(&info, "0"), Err(Error::ReadOnly)));
    assert_eq!(writer.get("ro.secure").as_deref(), Some("1"));
}

#[test]
fn test_single_writer_per_directory() {
    let store = TestStore::new();
    let writer = store.writer();
    assert!(matches!(
        SystemProperties::open_writer(store.config.clone()),
        Err(Error::WriterLocked(_))
    ));
    drop(writer);

    // Area files are created exclusively and never reused.
    assert!(SystemProperties::open_writer(store.config.clone()).is_err());
}

#[test]
fn test_values_outlive_the_writer() {
    let store = TestStore::new();
    {
        let writer = store.writer();
        writer.add("ro.build.id", "ABC.123").unwrap();
        writer.add("persist.sys.timezone", "UTC").unwrap();
    }

    let reader = store.reader();
    assert_eq!(
        snapshot(&reader),
        vec![
            ("persist.sys.timezone".to_string(), "UTC".to_string()),
            ("ro.build.id".to_string(), "ABC.123".to_string()),
        ]
    );
}

#[test]
fn test_reader_requires_serial_area() {
    let store = TestStore::new();
    drop(store.writer());
    std::fs::remove_file(store.property_dir().join("properties_serial")).unwrap();

    let mut config = store.config.clone();
    config.workspace_env = "SYSPROPS_TEST_UNSET_WORKSPACE".to_string();
    assert!(SystemProperties::open(config).is_err());
}

#[test]
fn test_enumeration_complete_while_writer_adds() {
    let store = TestStore::new();
    let writer = store.writer();
    let existing: HashSet<String> = (0..40)
        .map(|i| format!("{}.seed{}", ["ro", "sys", "debug", "misc"][i % 4], i))
        .collect();
    for name in &existing {
        writer.add(name, "1").unwrap();
    }
    let reader = store.reader();
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let walker = s.spawn(|| {
            let mut walks = 0;
            while !stop.load(Ordering::Relaxed) || walks == 0 {
                let mut seen = HashSet::new();
                let count = reader.foreach(|info| {
                    if let Some((name, _)) = reader.read(&info) {
                        seen.insert(name);
                    }
                });
                assert_eq!(count, seen.len());
                assert!(existing.is_subset(&seen), "enumeration skipped existing keys");

                let mut n = 0;
                while reader.find_nth(n).is_some() {
                    n += 1;
                }
                assert!(n >= existing.len());
                walks += 1;
            }
        });

        for i in 0..200 {
            let prefix = ["ro", "sys", "debug", "misc"][i % 4];
            writer.add(&format!("{}.grow.a.b.c{}", prefix, i), "v").unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        walker.join().unwrap();
    });

    assert_eq!(reader.foreach(|_| {}), existing.len() + 200);
}
