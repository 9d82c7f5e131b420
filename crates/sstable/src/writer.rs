use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use memtable::Memtable;
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::format::write_footer;

/// Writes a [`Memtable`] (or any sorted entry stream) to disk as an
/// immutable SSTable file.
///
/// The writer is stateless — all work happens inside
/// [`write`](SSTableWriter::write) /
/// [`write_from_iterator`](SSTableWriter::write_from_iterator). The write is
/// crash-safe: data is first written to a temporary file, fsynced, and then
/// atomically renamed to the final path.
pub struct SSTableWriter {}

impl SSTableWriter {
    /// Flushes `mem` to a new SSTable file at `path`.
    ///
    /// # File layout
    ///
    /// ```text
    /// [DATA]   repeated: key_len(u32) | key | val_len(u32) | val | tombstone(u8)
    /// [INDEX]  repeated: key_len(u32) | key | record_offset(u64)
    /// [FOOTER] index_offset(u64) | entry_count(u64) | magic(u32="LSMT") | pad(u32)
    /// ```
    ///
    /// An empty memtable still produces a valid file: `entry_count == 0`
    /// and `index_offset == 0`.
    ///
    /// # Crash safety
    ///
    /// Writes to a `.tmp` sibling of `path`, fsyncs the file, renames it
    /// into place, then fsyncs the parent directory so the rename itself
    /// is durable.
    pub fn write(path: &Path, mem: &Memtable) -> Result<()> {
        let iter = mem.iter().map(|(k, v)| (k.to_vec(), v.clone()));
        Self::write_internal(path, iter)
    }

    /// Writes an SSTable from an arbitrary iterator of `(key, value)` pairs,
    /// where `value = None` marks a tombstone.
    ///
    /// This is the compaction entry point: the caller supplies a merged,
    /// already-deduplicated, ascending-key stream (see [`crate::MergeIterator`])
    /// instead of a single in-memory `Memtable`.
    pub fn write_from_iterator<I>(path: &Path, iter: I) -> Result<()>
    where
        I: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        Self::write_internal(path, iter)
    }

    fn write_internal<I>(path: &Path, iter: I) -> Result<()>
    where
        I: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        let tmp_path = path.with_extension("sst.tmp");
        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut file = BufWriter::new(raw_file);

        let mut index: Vec<(Vec<u8>, u64)> = Vec::new();

        for (key, value) in iter {
            let offset = file.stream_position()?;

            file.write_u32::<LittleEndian>(key.len() as u32)?;
            file.write_all(&key)?;
            match &value {
                Some(v) => {
                    file.write_u32::<LittleEndian>(v.len() as u32)?;
                    file.write_all(v)?;
                    file.write_u8(0)?; // live
                }
                None => {
                    file.write_u32::<LittleEndian>(0)?;
                    file.write_u8(1)?; // tombstone
                }
            }

            index.push((key, offset));
        }

        let entry_count = index.len() as u64;
        let index_offset = if entry_count == 0 {
            0
        } else {
            file.stream_position()?
        };

        for (key, record_offset) in &index {
            file.write_u32::<LittleEndian>(key.len() as u32)?;
            file.write_all(key)?;
            file.write_u64::<LittleEndian>(*record_offset)?;
        }

        write_footer(&mut file, index_offset, entry_count)?;

        file.flush()?;
        file.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?.sync_all()?;

        rename(&tmp_path, path)?;

        // Fsync the parent directory so the rename survives a crash.
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/writer_tests.rs"]
mod tests;
