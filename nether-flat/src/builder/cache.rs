//! Content-addressed dedup cache for vtables and shared strings
//!
//! Keys are xxh3 hashes of the encoded bytes; hits are confirmed by comparing
//! the bytes already in the buffer, so hash collisions never alias objects.

use hashbrown::HashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Default)]
pub(crate) struct DedupCache {
    entries: HashMap<u64, SmallVec<[u32; 2]>>,
    len: usize,
}

impl DedupCache {
    pub(crate) fn hash(bytes: &[u8]) -> u64 {
        xxh3_64(bytes)
    }

    /// Find an already-written object with this hash for which `matches` holds.
    pub(crate) fn find(&self, hash: u64, mut matches: impl FnMut(u32) -> bool) -> Option<u32> {
        self.entries
            .get(&hash)?
            .iter()
            .copied()
            .find(|&offset| matches(offset))
    }

    pub(crate) fn insert(&mut self, hash: u64, offset: u32) {
        self.entries.entry(hash).or_default().push(offset);
        self.len += 1;
    }

    /// Number of distinct objects recorded
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}
