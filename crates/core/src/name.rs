//! Property name segmentation
//!
//! Names are keyed into the trie one `.`-delimited segment at a time.
//! Segments compare by `(length, bytes)`, which is the order siblings are
//! kept in at every trie level.

use std::cmp::Ordering;

/// One `.`-delimited piece of a property name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Raw segment bytes (never includes the `.`)
    pub bytes: &'a [u8],
    /// True for the final segment, the one that carries the value
    pub is_last: bool,
}

/// Sibling order used at every trie level: shorter names sort first,
/// equal lengths compare bytewise
pub fn compare_segment(one: &[u8], two: &[u8]) -> Ordering {
    one.len().cmp(&two.len()).then_with(|| one.cmp(two))
}

/// Split `name` into its segments
///
/// Empty segments are yielded as-is; callers validate before traversing.
pub fn segments(name: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut pieces = name.as_bytes().split(|b| *b == b'.').peekable();
    std::iter::from_fn(move || {
        let bytes = pieces.next()?;
        Some(Segment {
            bytes,
            is_last: pieces.peek().is_none(),
        })
    })
}
