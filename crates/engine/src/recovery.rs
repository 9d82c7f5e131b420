/// Cold-start recovery: WAL replay, SSTable directory scan, tmp file
/// cleanup, and sequence-counter bootstrap.
use anyhow::{Context, Result};
use config::EngineConfig;
use memtable::Memtable;
use std::path::{Path, PathBuf};
use wal::WalWriter;

use crate::Engine;

const WAL_FILENAME: &str = "wal.log";

impl Engine {
    /// Opens (or creates) an engine rooted at `dir`.
    ///
    /// # Recovery steps
    ///
    /// 1. Create `dir` if it does not exist.
    /// 2. Clean up leftover `.sst.tmp` files from an interrupted flush or
    ///    compaction.
    /// 3. Replay `dir/wal.log` into a fresh memtable (this is a correctness
    ///    requirement, not an optional step — a skipped replay would lose
    ///    every write since the last flush).
    /// 4. Open a [`WalWriter`] in append mode at the same path.
    /// 5. Scan `dir` for `L<level>_<seq>.sst` files, group them by level,
    ///    and sort each level's list by filename (the zero-padded sequence
    ///    number makes lexicographic order equal to creation order).
    /// 6. Set `next_seq` to one past the highest sequence number observed
    ///    anywhere on disk.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure other than the WAL file simply not
    /// existing yet (a fresh database).
    pub fn open<P: AsRef<Path>>(dir: P, config: EngineConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create engine directory {}", dir.display()))?;

        Self::cleanup_tmp_files(&dir);

        let wal_path = dir.join(WAL_FILENAME);
        let mut mem = Memtable::new();
        let replayed = replay_wal(&wal_path, &mut mem)?;
        tracing::debug!(path = %wal_path.display(), records = replayed, "replayed WAL");

        let wal_writer = WalWriter::open(&wal_path, config.wal_sync)?;

        let (levels, max_seq) = scan_levels(&dir, config.max_levels)?;
        let next_seq = max_seq.map_or(0, |s| s + 1);

        Ok(Self {
            mem,
            dir,
            levels,
            wal_writer,
            next_seq,
            flush_threshold_bytes: config.flush_threshold_bytes,
            l0_max_files: config.l0_max_files,
            max_levels: config.max_levels,
            wal_sync: config.wal_sync,
        })
    }

    /// Removes leftover `.sst.tmp` files from an interrupted flush or
    /// compaction. Best-effort: a failure to remove one file does not stop
    /// the scan of the rest.
    pub(crate) fn cleanup_tmp_files(dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(".sst.tmp"))
            {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

/// Replays `path` into `mem`, returning the number of records applied.
///
/// If the WAL file does not exist yet, this is a fresh database and `Ok(0)`
/// is returned rather than an error.
fn replay_wal(path: &Path, mem: &mut Memtable) -> Result<u64> {
    use wal::{WalError, WalReader};

    match WalReader::open(path) {
        Ok(mut reader) => Ok(reader.recover(mem)?),
        Err(WalError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(anyhow::anyhow!(e).context("failed to open WAL for replay")),
    }
}

/// Parses a `L<level>_<seq>.sst` filename, returning `(level, seq)`.
fn parse_sstable_filename(name: &str) -> Option<(usize, u64)> {
    let rest = name.strip_prefix('L')?;
    let rest = rest.strip_suffix(".sst")?;
    let (level_str, seq_str) = rest.split_once('_')?;
    let level = level_str.parse::<usize>().ok()?;
    let seq = seq_str.parse::<u64>().ok()?;
    Some((level, seq))
}

/// Scans `dir` for `L<level>_<seq>.sst` files, grouping them into one
/// `Vec<PathBuf>` per level (sorted oldest-to-newest by path, which equals
/// sequence order thanks to zero-padding) and returning the highest
/// sequence number observed across every level.
fn scan_levels(dir: &Path, max_levels: usize) -> Result<(Vec<Vec<PathBuf>>, Option<u64>)> {
    let mut levels: Vec<Vec<PathBuf>> = vec![Vec::new(); max_levels];
    let mut max_seq: Option<u64> = None;

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read engine directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((level, seq)) = parse_sstable_filename(name) else {
            continue;
        };
        if level >= max_levels {
            anyhow::bail!(
                "sstable {} names level {} but max_levels is {}",
                name,
                level,
                max_levels
            );
        }
        levels[level].push(path);
        max_seq = Some(max_seq.map_or(seq, |m| m.max(seq)));
    }

    for level in &mut levels {
        level.sort();
    }

    Ok((levels, max_seq))
}
