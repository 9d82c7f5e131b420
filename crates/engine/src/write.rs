/// Write path: `put()`, `delete()`, `force_flush()`, and the internal
/// `flush()`.
///
/// Every mutation is first appended to the WAL for durability, then applied
/// to the in-memory Memtable. When the Memtable's approximate byte size
/// reaches the configured threshold, it is persisted to a new level-0
/// SSTable and the engine drives compaction until no level remains over
/// capacity.
use anyhow::{ensure, Result};
use std::fs::OpenOptions;
use wal::WalWriter;

use crate::{Engine, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use sstable::SSTableWriter;

impl Engine {
    /// Inserts a key-value pair.
    ///
    /// Appended to the WAL first, then applied to the Memtable. If the
    /// Memtable's approximate size reaches the flush threshold, it is
    /// flushed to a new L0 SSTable and compaction runs until no level is
    /// over capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` or `value` exceed their size limits, or on
    /// I/O failure during the WAL append or a triggered flush/compaction.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        ensure!(!key.is_empty(), "key must not be empty");
        ensure!(
            key.len() <= MAX_KEY_SIZE,
            "key too large: {} bytes (max {})",
            key.len(),
            MAX_KEY_SIZE
        );
        ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );

        self.wal_writer.append_put(&key, &value)?;
        self.mem.put(key, value);

        self.maybe_flush_and_compact()
    }

    /// Deletes a key by writing a tombstone.
    ///
    /// A tombstone record is appended to the WAL and inserted into the
    /// Memtable, shadowing any older value for this key in lower levels.
    /// Unlike `put`, this never triggers a flush — the reference never
    /// checks the flush threshold on delete, so neither does this.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is empty or too large, or on I/O failure.
    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        ensure!(!key.is_empty(), "key must not be empty");
        ensure!(
            key.len() <= MAX_KEY_SIZE,
            "key too large: {} bytes (max {})",
            key.len(),
            MAX_KEY_SIZE
        );

        self.wal_writer.append_delete(&key)?;
        self.mem.delete(key);

        Ok(())
    }

    /// Forces a flush of the current Memtable to a new L0 SSTable.
    ///
    /// No-op if the Memtable is empty. Does not run compaction afterward —
    /// callers that want a fully settled tree should follow with their own
    /// `should_compact`/`compact` loop (see [`Engine::close`]).
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure during the SSTable write or WAL
    /// truncation.
    pub fn force_flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    fn maybe_flush_and_compact(&mut self) -> Result<()> {
        if self.mem.approx_size() < self.flush_threshold_bytes {
            return Ok(());
        }
        self.flush()?;
        self.drain_compactions()
    }

    /// Internal flush implementation.
    ///
    /// # Steps
    ///
    /// 1. Mint `L0_<next_seq>.sst` using the engine's single shared
    ///    sequence counter.
    /// 2. Write the Memtable to that path via [`SSTableWriter::write`]
    ///    (atomic temp file + rename).
    /// 3. Truncate the WAL to zero bytes and reopen it in append mode.
    /// 4. Clear the Memtable.
    /// 5. Register the new file as the newest entry in level 0.
    pub(crate) fn flush(&mut self) -> Result<()> {
        let sst_name = format!("L0_{:010}.sst", self.next_seq);
        let sst_path = self.dir.join(&sst_name);

        SSTableWriter::write(&sst_path, &self.mem)?;
        tracing::debug!(path = %sst_path.display(), entries = self.mem.len(), "flushed memtable");
        self.next_seq += 1;

        let wal_path = self.dir.join("wal.log");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&wal_path)?;
        self.wal_writer = WalWriter::open(&wal_path, self.wal_sync)?;

        self.mem.clear();
        self.levels[0].push(sst_path);

        Ok(())
    }
}
