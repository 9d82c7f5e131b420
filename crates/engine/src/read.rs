/// Read path: `get()`.
///
/// Point lookups check the Memtable first (freshest data, including
/// tombstones), then walk levels `0..max_levels`. Within a level, files are
/// probed newest-first. Each SSTable is opened, probed, and dropped before
/// the next one is considered — no reader is cached across calls, matching
/// this engine's single-threaded, lock-free-at-the-core concurrency model.
use anyhow::Result;
use sstable::SSTableReader;

use crate::Engine;

impl Engine {
    /// Looks up `key`, returning `Some(value)` if live, `None` if absent or
    /// shadowed by a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if opening or reading any on-disk SSTable fails.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.mem.get_entry(key) {
            return Ok(entry.clone());
        }

        for level in &self.levels {
            for path in level.iter().rev() {
                let reader = SSTableReader::open(path)?;
                match reader.get(key)? {
                    Some(value) => return Ok(value),
                    None => continue,
                }
            }
        }

        Ok(None)
    }
}
