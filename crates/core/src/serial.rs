//! Packed serial word of a value record
//!
//! ```text
//!  31          24 23                               1   0
//! +--------------+----------------------------------+---+
//! | value length |            counter               | D |
//! +--------------+----------------------------------+---+
//! ```
//!
//! `D` is the dirty bit, set while the writer copies new bytes in. The low
//! 24 bits (dirty bit included) form the counter: an update sets the dirty
//! bit and then publishes `counter + 1`, so each completed update advances
//! the counter by two and a published serial is never dirty. The counter
//! wraps at 2^24.

const DIRTY: u32 = 1;
const COUNTER_MASK: u32 = 0x00ff_ffff;
const LEN_SHIFT: u32 = 24;

/// A decoded view of a value record's serial word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Serial(u32);

impl Serial {
    /// Serial of a freshly allocated record holding `len` bytes
    pub fn initial(len: usize) -> Self {
        Serial((len as u32) << LEN_SHIFT)
    }

    /// Wrap a raw word loaded from shared memory
    pub fn from_raw(raw: u32) -> Self {
        Serial(raw)
    }

    /// The raw word as stored in shared memory
    pub fn raw(self) -> u32 {
        self.0
    }

    /// True while a writer is between the dirty store and the publish
    pub fn is_dirty(self) -> bool {
        self.0 & DIRTY != 0
    }

    /// Length of the value this serial describes
    pub fn value_len(self) -> usize {
        (self.0 >> LEN_SHIFT) as usize
    }

    /// Monotonic counter bits
    pub fn counter(self) -> u32 {
        self.0 & COUNTER_MASK
    }

    /// The word stored before the value bytes are overwritten
    pub fn dirty(self) -> Self {
        Serial(self.0 | DIRTY)
    }

    /// The word published once `len` new bytes are in place
    pub fn next(self, len: usize) -> Self {
        let counter = (self.dirty().0.wrapping_add(1)) & COUNTER_MASK;
        Serial(((len as u32) << LEN_SHIFT) | counter)
    }
}
