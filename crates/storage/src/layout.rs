//! Binary layout of a property area
//!
//! ```text
//! +----------------------+--------------------------------------------+
//! | Header (128 bytes)   | Arena (bump allocated, offsets start at 0) |
//! +----------------------+--------------------------------------------+
//! ```
//!
//! Every object in the arena is addressed by a `u32` offset from the arena
//! start. Offset 0 is the root trie node, so 0 doubles as "absent" in every
//! link field. All fields are host-endian; areas are never shared across
//! machines.

use sysprops_core::PROP_VALUE_MAX;

/// "PROP" in little-endian
pub const AREA_MAGIC: u32 = 0x504f_5250;

/// Current layout version
pub const AREA_VERSION: u32 = 0xfc6e_d0ab;

/// Default size of a backing file, header included
pub const DEFAULT_AREA_SIZE: usize = 128 * 1024;

/// Size of the area header
pub const HEADER_SIZE: usize = 128;

/// Allocation granularity; keeps every atomic field 4-byte aligned
pub const ALIGN: usize = 4;

/// Arena offset of the root trie node
pub const ROOT: u32 = 0;

/// Header field offsets, relative to the start of the mapping
pub mod header {
    /// Bump cursor, in arena bytes. Only the writer stores it.
    pub const BYTES_USED: usize = 0;
    /// Area-wide change counter
    pub const SERIAL: usize = 4;
    /// Must equal [`super::AREA_MAGIC`]
    pub const MAGIC: usize = 8;
    /// Must equal [`super::AREA_VERSION`]
    pub const VERSION: usize = 12;
}

/// Trie node field offsets, relative to the node
pub mod node {
    /// Length of the segment name (`u8`)
    pub const NAMELEN: usize = 0;
    /// Offset of the value record, 0 when the node carries no value
    pub const VALUE: usize = 4;
    /// Smaller sibling
    pub const LEFT: usize = 8;
    /// Larger sibling
    pub const RIGHT: usize = 12;
    /// First node of the next trie level
    pub const CHILDREN: usize = 16;
    /// Inline segment name, NUL-terminated
    pub const NAME: usize = 20;
    /// Fixed part of a node
    pub const SIZE: usize = 20;
}

/// Value record field offsets, relative to the record
pub mod record {
    use super::PROP_VALUE_MAX;

    /// Packed serial word
    pub const SERIAL: usize = 0;
    /// Inline value buffer, NUL-terminated
    pub const VALUE: usize = 4;
    /// Inline copy of the full property name, NUL-terminated
    pub const NAME: usize = VALUE + PROP_VALUE_MAX;
    /// Fixed part of a record
    pub const SIZE: usize = NAME;
}

/// Round `size` up to the allocation granularity
pub const fn align_up(size: usize) -> usize {
    (size + ALIGN - 1) & !(ALIGN - 1)
}

/// Bytes needed for a node holding a `name_len`-byte segment
pub const fn node_size(name_len: usize) -> usize {
    node::SIZE + name_len + 1
}

/// Bytes needed for a record of a `name_len`-byte property
pub const fn record_size(name_len: usize) -> usize {
    record::SIZE + name_len + 1
}

const _: () = assert!(record::SIZE % ALIGN == 0, "record fields must stay aligned");
const _: () = assert!(HEADER_SIZE % ALIGN == 0, "arena must start aligned");
