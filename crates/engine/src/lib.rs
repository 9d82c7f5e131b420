//! # Engine - LSM storage engine
//!
//! The central orchestrator that ties together the [`memtable`], [`wal`], and
//! [`sstable`] crates into a complete LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → Memtable insert       │
//! │              |                                │
//! │              |  (threshold exceeded?)         │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → new L0 SSTable            │
//! │              |                                │
//! │              v                                │
//! │           compact() while should_compact()    │
//! │                                               │
//! │ read.rs → Memtable → L0..Ln (newest-first)    │
//! │            (first match wins)                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module        | Purpose                                                |
//! |---------------|---------------------------------------------------------|
//! | [`lib.rs`]    | `Engine` struct, constructor, accessors, `Debug`, `Drop` |
//! | [`recovery`]  | WAL replay, SSTable directory scan, tmp file cleanup     |
//! | [`write`]     | `put()`, `delete()`, `force_flush()`, internal `flush()` |
//! | [`read`]      | `get()`                                                  |
//! | [`compaction`]| tiered `should_compact()` / `compact(level)`             |
//!
//! ## Levels
//!
//! ```text
//! ┌────────────────────────────┐  ← freshest, checked first
//! │ MEMTABLE                   │
//! ├────────────────────────────┤  ← from flushes (may overlap)
//! │ L0 SSTables                │
//! ├────────────────────────────┤  ← from compaction (shrinking overlap)
//! │ L1..L(MAX_LEVELS-1)        │
//! └────────────────────────────┘
//! ```
//!
//! ## Crash Safety
//!
//! Every write is appended to the WAL **before** the Memtable update. The WAL
//! is only truncated **after** a successful flush. SSTables are written
//! atomically via temp file + rename. On open, the WAL is replayed into a
//! fresh memtable and the SSTable directory is rescanned — there is no
//! separate manifest to go stale.
mod compaction;
mod read;
mod recovery;
mod write;

use config::EngineConfig;
use memtable::Memtable;
use std::path::PathBuf;
use wal::WalWriter;

/// Maximum allowed key size in bytes (64 KiB).
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// Maximum allowed value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// The central storage engine orchestrating Memtable, WAL, and SSTables.
///
/// # Write Path
///
/// 1. Append the record to the WAL (crash-safe durability).
/// 2. Apply the mutation to the in-memory Memtable.
/// 3. If `approx_size >= flush_threshold_bytes`, flush the Memtable to a new
///    L0 SSTable, truncate the WAL, and reset the Memtable.
/// 4. Drive `compact()` on whatever `should_compact()` reports until no
///    level is over capacity.
///
/// # Read Path
///
/// 1. Check the Memtable (freshest data, includes tombstones).
/// 2. Walk levels `0..max_levels`; within a level, walk files newest-first,
///    opening, probing, and closing each SSTable in turn.
/// 3. First match wins; tombstones shadow older values.
///
/// # Recovery
///
/// On construction ([`Engine::open`]), the WAL is replayed into a fresh
/// Memtable and the directory is rescanned for `L<level>_<seq>.sst` files —
/// there is no persisted manifest, so the directory listing is authoritative.
pub struct Engine {
    pub(crate) mem: Memtable,
    /// Directory holding `wal.log` and all `L<level>_<seq>.sst` files.
    pub(crate) dir: PathBuf,
    /// One file list per level, index 0..max_levels. Each level's files are
    /// ordered oldest-to-newest (ascending sequence number), so the last
    /// entry is the newest — directly usable as the "highest index wins"
    /// merge tie-break.
    pub(crate) levels: Vec<Vec<PathBuf>>,
    pub(crate) wal_writer: WalWriter,
    /// Single monotonically increasing counter shared by every SSTable this
    /// engine mints, whether from a flush (level 0) or a compaction
    /// (level + 1).
    pub(crate) next_seq: u64,
    pub(crate) flush_threshold_bytes: usize,
    pub(crate) l0_max_files: usize,
    pub(crate) max_levels: usize,
    pub(crate) wal_sync: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("next_seq", &self.next_seq)
            .field("flush_threshold_bytes", &self.flush_threshold_bytes)
            .field("l0_max_files", &self.l0_max_files)
            .field("max_levels", &self.max_levels)
            .field("wal_sync", &self.wal_sync)
            .field("memtable_size", &self.mem.approx_size())
            .field("memtable_entries", &self.mem.len())
            .field(
                "level_counts",
                &self.levels.iter().map(Vec::len).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Engine {
    /// Returns the configured flush threshold, in bytes.
    #[must_use]
    pub fn flush_threshold_bytes(&self) -> usize {
        self.flush_threshold_bytes
    }

    /// Returns the configured level-0 file capacity.
    #[must_use]
    pub fn l0_max_files(&self) -> usize {
        self.l0_max_files
    }

    /// Returns the configured number of compaction levels.
    #[must_use]
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Returns the total number of SSTables across all levels.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Returns the number of SSTables currently resident at `level`.
    ///
    /// Returns `0` for an out-of-range level rather than panicking.
    #[must_use]
    pub fn level_file_count(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    /// Closes the engine, flushing any buffered writes and running
    /// compaction to a fixed point before releasing resources.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure from the final flush or compaction pass.
    pub fn close(mut self) -> anyhow::Result<()> {
        self.force_flush()?;
        self.drain_compactions()?;
        Ok(())
    }
}

/// Best-effort flush on drop.
///
/// When the `Engine` is dropped without an explicit [`Engine::close`], any
/// data remaining in the memtable is flushed to an SSTable so it is not
/// lost. Errors during the flush are silently ignored because `Drop` cannot
/// propagate them — the data is still safe in the WAL and will be recovered
/// on the next open.
impl Drop for Engine {
    fn drop(&mut self) {
        if !self.mem.is_empty() {
            tracing::warn!("dropping engine with unflushed memtable entries, flushing now");
            if let Err(e) = self.flush() {
                tracing::error!(error = %e, "flush on drop failed, data remains only in the WAL");
            }
        }
    }
}

#[cfg(test)]
mod tests;
