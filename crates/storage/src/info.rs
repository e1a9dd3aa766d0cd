//! Handle to one value record and the lock-free read protocol
//!
//! A read snapshots the serial word, copies the value bytes, then checks the
//! serial again behind an acquire fence. If the writer touched the record in
//! between, the copy is discarded and the read starts over. While the dirty
//! bit is set the reader sleeps on the serial word instead of spinning.

use std::fmt;
use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::time::Duration;
use sysprops_core::{validate_value, Error, Result, Serial, MAX_VALUE_LEN, PROP_NAME_MAX};

use crate::area::PropertyArea;
use crate::layout::record;
use crate::notify;

/// A property inside a mapped area
#[derive(Clone, Copy)]
pub struct PropInfo<'a> {
    area: &'a PropertyArea,
    record: u32,
    serial: &'a AtomicU32,
}

impl<'a> PropInfo<'a> {
    pub(crate) fn new(area: &'a PropertyArea, record: u32) -> Result<Self> {
        let serial = area.arena_word(record as usize + record::SERIAL)?;
        Ok(PropInfo {
            area,
            record,
            serial,
        })
    }

    /// Arena offset of the record; stable for the life of the area
    pub fn offset(&self) -> u32 {
        self.record
    }

    /// The area holding this record
    pub fn area(&self) -> &'a PropertyArea {
        self.area
    }

    /// The raw serial word, for waiting on this property
    pub fn serial_word(&self) -> &'a AtomicU32 {
        self.serial
    }

    /// Current serial, waiting out an in-progress update
    pub fn serial(&self) -> Serial {
        loop {
            let serial = Serial::from_raw(self.serial.load(Ordering::Acquire));
            if !serial.is_dirty() {
                return serial;
            }
            notify::wait(self.serial, serial.raw(), None);
        }
    }

    /// Full property name, as stored in the record
    pub fn name(&self) -> Result<String> {
        let base = self.area.to_mapping(self.record as usize)?;
        let bytes = self
            .area
            .memory()
            .load_cstr(base + record::NAME, PROP_NAME_MAX)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consistent snapshot of the value together with the serial it belongs to
    pub fn read(&self) -> Result<(String, Serial)> {
        let value_offset = self.area.to_mapping(self.record as usize)? + record::VALUE;
        let mut buf = [0u8; MAX_VALUE_LEN];
        loop {
            let serial = self.serial();
            let len = serial.value_len();
            if len > MAX_VALUE_LEN {
                return Err(Error::corrupt(format!(
                    "record at {} claims a {}-byte value",
                    self.record, len
                )));
            }
            self.area
                .memory()
                .load_bytes(value_offset, &mut buf[..len])?;
            fence(Ordering::Acquire);
            if self.serial.load(Ordering::Relaxed) == serial.raw() {
                return Ok((String::from_utf8_lossy(&buf[..len]).into_owned(), serial));
            }
        }
    }

    /// Read name, value and serial and hand them to `f`
    pub fn read_with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&str, &str, u32) -> R,
    {
        let name = self.name()?;
        let (value, serial) = self.read()?;
        Ok(f(&name, &value, serial.raw()))
    }

    /// Block until the serial differs from `old`
    ///
    /// Returns the new serial, or `None` if `timeout` elapsed first.
    pub fn wait(&self, old: u32, timeout: Option<Duration>) -> Option<Serial> {
        notify::wait_for_change(self.serial, old, timeout)?;
        Some(self.serial())
    }

    /// Replace the value in place. Only valid on a writable area.
    pub fn update(&self, value: &str) -> Result<()> {
        validate_value(&self.name()?, value)?;
        self.area.update_record(self.record, value)
    }
}

impl PartialEq for PropInfo<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.area, other.area) && self.record == other.record
    }
}

impl Eq for PropInfo<'_> {}

impl fmt::Debug for PropInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropInfo")
            .field("record", &self.record)
            .field("serial", &self.serial.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DEFAULT_AREA_SIZE;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_read_with_reports_all_fields() {
        let area = PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap();
        let info = area.add("ro.serialno", "ABC123").unwrap();
        let (name, value, serial) = info
            .read_with(|n, v, s| (n.to_string(), v.to_string(), s))
            .unwrap();
        assert_eq!(name, "ro.serialno");
        assert_eq!(value, "ABC123");
        assert_eq!(Serial::from_raw(serial).value_len(), 6);
    }

    #[test]
    fn test_shorter_update_truncates() {
        let area = PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap();
        let info = area.add("x", "a long value").unwrap();
        info.update("ab").unwrap();
        assert_eq!(info.read().unwrap().0, "ab");
        info.update("").unwrap();
        assert_eq!(info.read().unwrap().0, "");
    }

    #[test]
    fn test_repeated_identical_updates_advance_serial() {
        let area = PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap();
        let info = area.add("sys.usb.state", "mtp").unwrap();
        let mut last = info.serial().counter();
        for _ in 0..10 {
            info.update("mtp").unwrap();
            let now = info.serial().counter();
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn test_update_validates_value() {
        let area = PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap();
        let info = area.add("x", "ok").unwrap();
        let before = info.serial();
        assert!(info.update(&"v".repeat(MAX_VALUE_LEN + 1)).is_err());
        assert!(info.update("a\0b").is_err());
        assert_eq!(info.serial(), before);
        assert_eq!(info.read().unwrap().0, "ok");
    }

    #[test]
    fn test_wait_times_out_without_update() {
        let area = PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap();
        let info = area.add("x", "1").unwrap();
        let serial = info.serial().raw();
        let start = Instant::now();
        assert!(info.wait(serial, Some(Duration::from_millis(20))).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_update() {
        let area = Arc::new(PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap());
        let old = area.add("sys.boot_completed", "0").unwrap().serial().raw();

        let waiter = {
            let area = Arc::clone(&area);
            thread::spawn(move || {
                let info = area.find("sys.boot_completed").unwrap().unwrap();
                info.wait(old, Some(Duration::from_secs(5)))
                    .map(|_| info.read().unwrap().0)
            })
        };
        thread::sleep(Duration::from_millis(20));
        area.find("sys.boot_completed")
            .unwrap()
            .unwrap()
            .update("1")
            .unwrap();
        assert_eq!(waiter.join().unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_concurrent_reads_never_torn() {
        let a = "a".repeat(MAX_VALUE_LEN);
        let b = "b".repeat(MAX_VALUE_LEN / 2);
        let area = Arc::new(PropertyArea::anonymous(DEFAULT_AREA_SIZE).unwrap());
        area.add("torn.check", &a).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let area = Arc::clone(&area);
                let stop = Arc::clone(&stop);
                let (a, b) = (a.clone(), b.clone());
                thread::spawn(move || {
                    let info = area.find("torn.check").unwrap().unwrap();
                    let mut reads = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        let (value, _) = info.read().unwrap();
                        assert!(value == a || value == b, "torn read: {:?}", value);
                        reads += 1;
                    }
                    reads
                })
            })
            .collect();

        let info = area.find("torn.check").unwrap().unwrap();
        for i in 0..5_000 {
            info.update(if i % 2 == 0 { &b } else { &a }).unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
