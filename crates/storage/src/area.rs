//! The property area: a bump-allocated trie of `.`-separated name segments
//!
//! Each trie level is a binary search tree of sibling nodes ordered by
//! `(length, bytes)`. A node that ends a property name points at a value
//! record. Links are arena offsets published with release stores after the
//! target is fully written, so a reader that acquires a non-zero link always
//! sees an initialized object.
//!
//! Nothing in an area is ever freed or moved. Values are updated in place
//! under the serial protocol in [`crate::info`].

use std::cmp::Ordering as CmpOrdering;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{fence, AtomicU32, Ordering};
use sysprops_core::name::{compare_segment, segments};
use sysprops_core::{validate_name, validate_value, Error, Result, Serial, PROP_NAME_MAX};
use tracing::{debug, trace, warn};

use crate::info::PropInfo;
use crate::layout::{
    align_up, header, node, node_size, record, record_size, AREA_MAGIC, AREA_VERSION,
    HEADER_SIZE, ROOT,
};
use crate::mapper::{create_backing_file, open_backing_file, AreaMemory, TrustPolicy};
use crate::notify;

/// Arena size of a mapping of `mapping_len` bytes
///
/// Arena offsets are stored as `u32`, so larger arenas are refused.
fn arena_capacity(mapping_len: usize) -> Result<usize> {
    let capacity = mapping_len.saturating_sub(HEADER_SIZE);
    if capacity > u32::MAX as usize {
        return Err(Error::corrupt(format!(
            "arena of {} bytes exceeds the 32-bit offset range",
            capacity
        )));
    }
    Ok(capacity)
}

/// A mapped property area
#[derive(Debug)]
pub struct PropertyArea {
    mem: AreaMemory,
    capacity: usize,
}

enum Visit {
    Node(u32),
    Record(u32),
}

impl PropertyArea {
    /// Write a fresh header into writable, zeroed memory
    pub fn initialize(mem: AreaMemory) -> Result<Self> {
        if !mem.is_writable() {
            return Err(Error::ReadOnly);
        }
        if mem.len() < HEADER_SIZE + align_up(node_size(0)) {
            return Err(Error::ArenaExhausted {
                requested: HEADER_SIZE + align_up(node_size(0)),
                available: mem.len(),
            });
        }
        let capacity = arena_capacity(mem.len())?;
        let area = PropertyArea { mem, capacity };
        area.header_word(header::MAGIC)?.store(AREA_MAGIC, Ordering::Relaxed);
        area.header_word(header::VERSION)?.store(AREA_VERSION, Ordering::Relaxed);
        area.header_word(header::SERIAL)?.store(0, Ordering::Relaxed);
        area.header_word(header::BYTES_USED)?
            .store(node::SIZE as u32, Ordering::Release);
        Ok(area)
    }

    /// Adopt memory that already holds an area, validating its header
    pub fn from_mapping(mem: AreaMemory) -> Result<Self> {
        if mem.len() < HEADER_SIZE + node::SIZE {
            return Err(Error::corrupt(format!(
                "mapping of {} bytes cannot hold an area",
                mem.len()
            )));
        }
        let capacity = arena_capacity(mem.len())?;
        let area = PropertyArea { mem, capacity };

        let magic = area.header_word(header::MAGIC)?.load(Ordering::Acquire);
        let version = area.header_word(header::VERSION)?.load(Ordering::Acquire);
        if magic != AREA_MAGIC || version != AREA_VERSION {
            return Err(Error::corrupt(format!(
                "bad header: magic {:#x}, version {:#x}",
                magic, version
            )));
        }
        let used = area.bytes_used()?;
        if used < node::SIZE || used > capacity {
            return Err(Error::corrupt(format!(
                "bytes_used {} outside arena of {} bytes",
                used, capacity
            )));
        }
        Ok(area)
    }

    /// In-process area not backed by any file
    pub fn anonymous(size: usize) -> Result<Self> {
        Self::initialize(AreaMemory::anonymous(size)?)
    }

    /// Create a new backing file of `size` bytes and initialize it
    pub fn create(path: &Path, size: usize) -> Result<Self> {
        let file = create_backing_file(path, size)?;
        Self::create_in(&file)
    }

    /// Initialize an area inside an already created, sized file
    pub fn create_in(file: &File) -> Result<Self> {
        Self::initialize(AreaMemory::map_read_write(file)?)
    }

    /// Map an existing backing file read-only
    pub fn open_read_only(path: &Path, policy: &TrustPolicy) -> Result<Self> {
        let file = open_backing_file(path)?;
        Self::open_file_read_only(&file, policy, path)
    }

    /// Map an already open file read-only; `path` is used in diagnostics
    pub fn open_file_read_only(file: &File, policy: &TrustPolicy, path: &Path) -> Result<Self> {
        let mem = AreaMemory::map_read_only(file, policy, path)?;
        Self::from_mapping(mem).map_err(|e| {
            warn!(target: "sysprops::area", path = %path.display(), error = %e, "Rejecting property area");
            e
        })
    }

    /// Arena size in bytes, header excluded
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arena bytes handed out so far
    pub fn bytes_used(&self) -> Result<usize> {
        Ok(self.header_word(header::BYTES_USED)?.load(Ordering::Acquire) as usize)
    }

    /// The area-wide change counter
    pub fn serial_word(&self) -> Result<&AtomicU32> {
        self.header_word(header::SERIAL)
    }

    /// True when this process may mutate the area
    pub fn is_writable(&self) -> bool {
        self.mem.is_writable()
    }

    /// The underlying mapping
    pub fn memory(&self) -> &AreaMemory {
        &self.mem
    }

    fn header_word(&self, field: usize) -> Result<&AtomicU32> {
        self.mem.atomic_u32(field)
    }

    /// The word at arena offset `offset`
    pub(crate) fn arena_word(&self, offset: usize) -> Result<&AtomicU32> {
        self.mem.atomic_u32(self.to_mapping(offset)?)
    }

    /// Translate an arena offset into a mapping offset
    pub(crate) fn to_mapping(&self, offset: usize) -> Result<usize> {
        if offset >= self.capacity {
            return Err(Error::InvalidOffset {
                offset,
                len: self.capacity,
            });
        }
        Ok(HEADER_SIZE + offset)
    }

    fn follow(&self, field: usize) -> Result<u32> {
        Ok(self.arena_word(field)?.load(Ordering::Acquire))
    }

    fn publish(&self, field: usize, target: u32) -> Result<()> {
        self.arena_word(field)?.store(target, Ordering::Release);
        Ok(())
    }

    /// Upper bound on distinct objects the arena can ever hold; caps every
    /// walk so a corrupted cyclic link cannot hang a reader.
    ///
    /// Derived from the capacity, not from `bytes_used`: the writer may
    /// publish new nodes while a walk is in progress.
    fn visit_budget(&self) -> usize {
        self.capacity / align_up(node_size(0)) + 1
    }

    fn allocate(&self, size: usize) -> Result<u32> {
        let used_word = self.header_word(header::BYTES_USED)?;
        let used = used_word.load(Ordering::Relaxed) as usize;
        let size = align_up(size);
        let available = self.capacity.saturating_sub(used);
        if size > available {
            warn!(target: "sysprops::area", requested = size, available, "Property area exhausted");
            return Err(Error::ArenaExhausted {
                requested: size,
                available,
            });
        }
        used_word.store((used + size) as u32, Ordering::Release);
        Ok(used as u32)
    }

    fn new_node(&self, name: &[u8]) -> Result<u32> {
        let offset = self.allocate(node_size(name.len()))?;
        let base = self.to_mapping(offset as usize)?;
        self.mem.store_bytes(base + node::NAMELEN, &[name.len() as u8])?;
        self.mem.store_bytes(base + node::NAME, name)?;
        self.mem.store_bytes(base + node::NAME + name.len(), &[0])?;
        trace!(target: "sysprops::area", offset, segment = %String::from_utf8_lossy(name), "New trie node");
        Ok(offset)
    }

    fn new_record(&self, name: &str, value: &str) -> Result<u32> {
        let offset = self.allocate(record_size(name.len()))?;
        let base = self.to_mapping(offset as usize)?;
        self.mem.store_bytes(base + record::VALUE, value.as_bytes())?;
        self.mem.store_bytes(base + record::VALUE + value.len(), &[0])?;
        self.mem.store_bytes(base + record::NAME, name.as_bytes())?;
        self.mem.store_bytes(base + record::NAME + name.len(), &[0])?;
        self.arena_word(offset as usize + record::SERIAL)?
            .store(Serial::initial(value.len()).raw(), Ordering::Relaxed);
        Ok(offset)
    }

    fn compare_node(&self, segment: &[u8], node_offset: u32) -> Result<CmpOrdering> {
        let base = self.to_mapping(node_offset as usize)?;
        let len = self.mem.load_u8(base + node::NAMELEN)? as usize;
        if len >= PROP_NAME_MAX {
            return Err(Error::corrupt(format!(
                "node at {} has segment length {}",
                node_offset, len
            )));
        }
        let mut buf = [0u8; PROP_NAME_MAX];
        self.mem.load_bytes(base + node::NAME, &mut buf[..len])?;
        Ok(compare_segment(segment, &buf[..len]))
    }

    /// Walk the sibling tree hanging off `field`, optionally inserting
    fn find_sibling(&self, field: usize, segment: &[u8], alloc: bool) -> Result<Option<u32>> {
        let budget = self.visit_budget();
        let mut field = field;
        for _ in 0..budget {
            let current = self.follow(field)?;
            if current == 0 {
                if !alloc {
                    return Ok(None);
                }
                let created = self.new_node(segment)?;
                self.publish(field, created)?;
                return Ok(Some(created));
            }
            field = match self.compare_node(segment, current)? {
                CmpOrdering::Equal => return Ok(Some(current)),
                CmpOrdering::Less => current as usize + node::LEFT,
                CmpOrdering::Greater => current as usize + node::RIGHT,
            };
        }
        Err(Error::corrupt("sibling chain longer than the arena"))
    }

    /// Resolve `name` to a record offset, creating missing nodes and the
    /// record when `value` is given. An existing record is returned as is.
    fn find_property(&self, name: &str, value: Option<&str>) -> Result<Option<u32>> {
        let alloc = value.is_some();
        let mut current = ROOT;
        for segment in segments(name) {
            match self.find_sibling(current as usize + node::CHILDREN, segment.bytes, alloc)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        let value_field = current as usize + node::VALUE;
        let existing = self.follow(value_field)?;
        if existing != 0 {
            return Ok(Some(existing));
        }
        match value {
            Some(value) => {
                let created = self.new_record(name, value)?;
                self.publish(value_field, created)?;
                Ok(Some(created))
            }
            None => Ok(None),
        }
    }

    /// Arena bytes an `add` of `name` would consume, zero if it exists
    fn bytes_needed(&self, name: &str) -> Result<usize> {
        let pieces: Vec<_> = segments(name).collect();
        let mut current = ROOT;
        for (depth, segment) in pieces.iter().enumerate() {
            match self.find_sibling(current as usize + node::CHILDREN, segment.bytes, false)? {
                Some(next) => current = next,
                None => {
                    let nodes: usize = pieces[depth..]
                        .iter()
                        .map(|s| align_up(node_size(s.bytes.len())))
                        .sum();
                    return Ok(nodes + align_up(record_size(name.len())));
                }
            }
        }
        if self.follow(current as usize + node::VALUE)? != 0 {
            Ok(0)
        } else {
            Ok(align_up(record_size(name.len())))
        }
    }

    /// Look up a property
    pub fn find(&self, name: &str) -> Result<Option<PropInfo<'_>>> {
        validate_name(name)?;
        match self.find_property(name, None)? {
            Some(offset) => PropInfo::new(self, offset).map(Some),
            None => Ok(None),
        }
    }

    /// Insert a property, returning its handle
    ///
    /// When `name` already has a value the existing handle is returned and
    /// the value is left untouched. Every failure is detected before the
    /// arena is modified.
    pub fn add(&self, name: &str, value: &str) -> Result<PropInfo<'_>> {
        validate_name(name)?;
        validate_value(name, value)?;
        if !self.is_writable() {
            return Err(Error::ReadOnly);
        }
        let needed = self.bytes_needed(name)?;
        let available = self.capacity.saturating_sub(self.bytes_used()?);
        if needed > available {
            warn!(target: "sysprops::area", name, needed, available, "Property area exhausted");
            return Err(Error::ArenaExhausted {
                requested: needed,
                available,
            });
        }
        let offset = self
            .find_property(name, Some(value))?
            .ok_or_else(|| Error::corrupt(format!("insert of {} produced no record", name)))?;
        debug!(target: "sysprops::area", name, offset, "Added property");
        PropInfo::new(self, offset)
    }

    /// Overwrite a record's value in place
    pub(crate) fn update_record(&self, record_offset: u32, value: &str) -> Result<()> {
        if !self.is_writable() {
            return Err(Error::ReadOnly);
        }
        let serial = self.arena_word(record_offset as usize + record::SERIAL)?;
        let base = self.to_mapping(record_offset as usize)?;

        let old = Serial::from_raw(serial.load(Ordering::Relaxed));
        serial.store(old.dirty().raw(), Ordering::Relaxed);
        fence(Ordering::Release);
        self.mem.store_bytes(base + record::VALUE, value.as_bytes())?;
        self.mem.store_bytes(base + record::VALUE + value.len(), &[0])?;
        serial.store(old.next(value.len()).raw(), Ordering::Release);
        notify::wake_all(serial);
        Ok(())
    }

    /// Advance the area-wide serial and wake everyone waiting on it
    pub fn bump_serial(&self) -> Result<u32> {
        if !self.is_writable() {
            return Err(Error::ReadOnly);
        }
        let word = self.serial_word()?;
        let next = word.load(Ordering::Relaxed).wrapping_add(1);
        word.store(next, Ordering::Release);
        notify::wake_all(word);
        Ok(next)
    }

    /// Visit every property: left siblings, own value, children, right
    /// siblings. Stops early when `visit` returns false.
    pub fn foreach<'a, F>(&'a self, mut visit: F) -> Result<()>
    where
        F: FnMut(PropInfo<'a>) -> bool,
    {
        let budget = self.visit_budget();
        let mut visited = 0usize;
        let mut stack = vec![Visit::Node(ROOT)];
        while let Some(next) = stack.pop() {
            match next {
                Visit::Record(offset) => {
                    if !visit(PropInfo::new(self, offset)?) {
                        return Ok(());
                    }
                }
                Visit::Node(offset) => {
                    visited += 1;
                    if visited > budget {
                        return Err(Error::corrupt("trie walk exceeded arena size"));
                    }
                    let base = offset as usize;
                    let right = self.follow(base + node::RIGHT)?;
                    let children = self.follow(base + node::CHILDREN)?;
                    let value = self.follow(base + node::VALUE)?;
                    let left = self.follow(base + node::LEFT)?;
                    if right != 0 {
                        stack.push(Visit::Node(right));
                    }
                    if children != 0 {
                        stack.push(Visit::Node(children));
                    }
                    if value != 0 {
                        stack.push(Visit::Record(value));
                    }
                    if left != 0 {
                        stack.push(Visit::Node(left));
                    }
                }
            }
        }
        Ok(())
    }
}
