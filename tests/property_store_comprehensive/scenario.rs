//! Basic lifecycle: add, read, update and wait through the public API.

use crate::common::*;
use std::thread;
use std::time::{Duration, Instant};
use sysprops::{Error, Serial, MAX_NAME_LEN, MAX_VALUE_LEN};

#[test]
fn test_add_get_update_wakes_waiter() {
    let store = TestStore::new();
    let writer = store.writer();
    let reader = store.reader();

    writer.add("ro.debug.test", "1").unwrap();
    assert_eq!(reader.get("ro.debug.test").as_deref(), Some("1"));

    let info = reader.find("ro.debug.test").unwrap();
    let before = reader.serial(&info);

    thread::scope(|s| {
        let waiter = s.spawn(|| reader.wait(Some(&info), before, Some(Duration::from_secs(10))));
        thread::sleep(Duration::from_millis(20));
        let handle = writer.find("ro.debug.test").unwrap();
        writer.update(&handle, "0").unwrap();
        let after = waiter.join().unwrap().expect("waiter timed out");
        assert_ne!(after, before);
    });

    assert_eq!(reader.get("ro.debug.test").as_deref(), Some("0"));
}

#[test]
fn test_round_trip_across_contexts() {
    let store = TestStore::new();
    let writer = store.writer();
    let names = [
        "ro.build.type",
        "ro.product.model",
        "persist.sys.locale",
        "sys.boot_completed",
        "debug.layout",
        "net.hostname",
    ];
    for (i, name) in names.iter().enumerate() {
        writer.add(name, &format!("value-{}", i)).unwrap();
    }

    let reader = store.reader();
    for (i, name) in names.iter().enumerate() {
        assert_eq!(reader.get(name), Some(format!("value-{}", i)), "{}", name);
    }
    assert_eq!(reader.get("ro.build.missing"), None);
}

#[test]
fn test_get_or_falls_back_on_empty_and_absent() {
    let store = TestStore::new();
    let writer = store.writer();
    writer.add("sys.empty", "").unwrap();

    assert_eq!(writer.get("sys.empty").as_deref(), Some(""));
    assert_eq!(writer.get_or("sys.empty", "fallback"), "fallback");
    assert_eq!(writer.get_or("sys.absent", "fallback"), "fallback");
}

#[test]
fn test_boundaries_reject_without_mutation() {
    let store = TestStore::new();
    let writer = store.writer();

    let longest_name = "n".repeat(MAX_NAME_LEN);
    let longest_value = "v".repeat(MAX_VALUE_LEN);
    writer.add(&longest_name, &longest_value).unwrap();
    assert_eq!(writer.get(&longest_name), Some(longest_value.clone()));

    let before = snapshot(&writer);
    let serial_before = writer.area_serial();

    let too_long_name = "n".repeat(MAX_NAME_LEN + 1);
    assert!(matches!(
        writer.add(&too_long_name, "x"),
        Err(Error::OversizeName { .. })
    ));
    let too_long_value = "v".repeat(MAX_VALUE_LEN + 1);
    assert!(matches!(
        writer.add("sys.too_long", &too_long_value),
        Err(Error::OversizeValue { .. })
    ));
    assert!(matches!(
        writer.add("a..b", "x"),
        Err(Error::MalformedName(_))
    ));
    let handle = writer.find(&longest_name).unwrap();
    assert!(writer.update(&handle, &too_long_value).is_err());

    assert_eq!(snapshot(&writer), before);
    assert_eq!(writer.area_serial(), serial_before);
    assert_eq!(writer.get(&longest_name), Some(longest_value));
}

#[test]
fn test_serial_counter_increases_with_every_update() {
    let store = TestStore::new();
    let writer = store.writer();
    let info = writer.add("sys.counter", "0").unwrap();

    let mut last = Serial::from_raw(writer.serial(&info));
    for i in 1..=25 {
        writer.update(&info, &i.to_string()).unwrap();
        let now = Serial::from_raw(writer.serial(&info));
        assert!(now.counter() > last.counter(), "update {}", i);
        assert!(!now.is_dirty());
        assert_eq!(now.value_len(), i.to_string().len());
        last = now;
    }
}

#[test]
fn test_wait_any_returns_promptly_after_add() {
    let store = TestStore::new();
    let writer = store.writer();
    let reader = store.reader();
    let old = reader.area_serial();

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let serial = reader.wait_any(old);
            (serial, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        writer.add("sys.wake", "1").unwrap();
        let (serial, elapsed) = waiter.join().unwrap();
        assert_ne!(serial, old);
        assert!(elapsed < Duration::from_secs(5));
    });
}

#[test]
fn test_read_callback_sees_consistent_snapshot() {
    let store = TestStore::new();
    let writer = store.writer();
    let info = writer.add("ro.hardware", "goldfish").unwrap();

    let reader = store.reader();
    let handle = reader.find("ro.hardware").unwrap();
    let (name, value, serial) = reader
        .read_callback(&handle, |name, value, serial| {
            (name.to_string(), value.to_string(), serial)
        })
        .unwrap();
    assert_eq!(name, "ro.hardware");
    assert_eq!(value, "goldfish");
    assert_eq!(serial, writer.serial(&info));
}
