//! Merge iterator over multiple [`SSTableReader`]s.
//!
//! Produces `(key, value)` pairs in ascending key order. When the same key
//! appears in multiple source files, only the entry from the source with
//! the **highest file index** is emitted — by construction the caller
//! orders sources oldest-to-newest, so the highest index is the newest
//! write.
//!
//! This is the core primitive for compaction: walk N input SSTables in
//! sorted order, deduplicate by source recency, and write the merged result
//! to a new SSTable one level up.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::SSTableReader;

/// A pending key from one source, used for heap-based merge ordering.
///
/// Only the key and source index are stored — the value is read lazily from
/// disk once the key reaches the top of the heap.
struct HeapEntry {
    key: Vec<u8>,
    /// Index into `readers`; also the source's recency rank (higher = newer).
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the key comparison so the
        // smallest key sits on top. On a tie, prefer the higher source
        // index (newest file).
        other
            .key
            .cmp(&self.key)
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// Merges multiple SSTables into a single sorted stream of `(key, value)`.
///
/// `readers` must be ordered oldest-to-newest (increasing file index).
/// Duplicate keys are resolved by keeping the entry from the
/// highest-indexed (newest) source; every iterator sharing the chosen key
/// is advanced so the same key is never emitted twice.
pub struct MergeIterator<'a> {
    readers: &'a [SSTableReader],
    key_iters: Vec<std::vec::IntoIter<Vec<u8>>>,
    heap: BinaryHeap<HeapEntry>,
}

impl<'a> MergeIterator<'a> {
    /// Creates a new merge iterator over the given SSTable readers, tagging
    /// each with its list index.
    pub fn new(readers: &'a [SSTableReader]) -> Self {
        let mut key_iters: Vec<std::vec::IntoIter<Vec<u8>>> = Vec::with_capacity(readers.len());
        let mut heap = BinaryHeap::new();

        for (i, reader) in readers.iter().enumerate() {
            let keys: Vec<Vec<u8>> = reader.keys().map(|k| k.to_vec()).collect();
            let mut iter = keys.into_iter();
            if let Some(first_key) = iter.next() {
                heap.push(HeapEntry { key: first_key, source: i });
            }
            key_iters.push(iter);
        }

        Self { readers, key_iters, heap }
    }

    /// Returns the next `(key, value)` in ascending order, or `None` once
    /// every source is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Option<Vec<u8>>)>> {
        loop {
            let top = match self.heap.pop() {
                Some(e) => e,
                None => return Ok(None),
            };

            let entry = self.readers[top.source].get(&top.key)?;
            if let Some(next_key) = self.key_iters[top.source].next() {
                self.heap.push(HeapEntry { key: next_key, source: top.source });
            }

            let mut best_value = match entry {
                Some(v) => v,
                None => continue, // index said present; shouldn't happen
            };
            let mut best_source = top.source;
            let best_key = top.key;

            // Drain every other pending entry for the same key, keeping
            // only the one from the newest (highest-index) source.
            while let Some(peek) = self.heap.peek() {
                if peek.key != best_key {
                    break;
                }
                let dup = self.heap.pop().unwrap();

                if let Ok(Some(dup_value)) = self.readers[dup.source].get(&dup.key) {
                    if dup.source > best_source {
                        best_value = dup_value;
                        best_source = dup.source;
                    }
                }

                if let Some(next_key) = self.key_iters[dup.source].next() {
                    self.heap.push(HeapEntry { key: next_key, source: dup.source });
                }
            }

            return Ok(Some((best_key, best_value)));
        }
    }

    /// Collects all remaining entries into a `Vec`.
    pub fn collect_all(&mut self) -> Result<Vec<(Vec<u8>, Option<Vec<u8>>)>> {
        let mut result = Vec::new();
        while let Some(pair) = self.next_entry()? {
            result.push(pair);
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/merge_tests.rs"]
mod tests;
