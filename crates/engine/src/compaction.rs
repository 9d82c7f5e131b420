/// Tiered compaction: each level accumulates files independently; once a
/// level reaches its capacity, every file at that level is merged into a
/// single new file one level down.
///
/// Grounded on the reference's `lsm_level_capacity`/`lsm_should_compact`/
/// `lsm_compact`: level 0's capacity is `l0_max_files`; level `n >= 1`'s
/// capacity is `l0_max_files * 4^n`. Duplicate keys across the merged files
/// resolve to the entry from the highest list index (the newest file).
/// Tombstones are carried through untouched — this design does not drop
/// tombstones during compaction, even at the last level, since nothing
/// downstream of the last level could still need the shadow they provide
/// dropped; preserving them keeps compaction's behavior independent of
/// which level happens to be the last one.
use anyhow::{bail, Result};
use sstable::{MergeIterator, SSTableReader, SSTableWriter};

use crate::Engine;

impl Engine {
    /// Returns the file-count capacity of `level`.
    fn level_capacity(&self, level: usize) -> usize {
        if level == 0 {
            self.l0_max_files
        } else {
            self.l0_max_files * 4usize.pow(level as u32)
        }
    }

    /// Returns the lowest level whose file count has reached its capacity,
    /// or `None` if every level is under capacity.
    #[must_use]
    pub fn should_compact(&self) -> Option<usize> {
        (0..self.max_levels).find(|&level| self.levels[level].len() >= self.level_capacity(level))
    }

    /// Merges every file at `level` into a single new file at `level + 1`.
    ///
    /// No-op if `level` currently has no files.
    ///
    /// # Errors
    ///
    /// Refuses `level` if it is the last level — there is nowhere to
    /// compact it to. Also returns an error on I/O failure opening a
    /// source file, merging, or writing the output file. Source files are
    /// only deleted after the merged output has been durably written.
    pub fn compact(&mut self, level: usize) -> Result<()> {
        if self.max_levels == 0 || level >= self.max_levels - 1 {
            bail!(
                "cannot compact level {level}: it is the last level (max_levels = {})",
                self.max_levels
            );
        }

        let sources = self.levels[level].clone();
        if sources.is_empty() {
            return Ok(());
        }

        let readers: Vec<SSTableReader> =
            sources.iter().map(SSTableReader::open).collect::<Result<_>>()?;

        let out_name = format!("L{}_{:010}.sst", level + 1, self.next_seq);
        let out_path = self.dir.join(&out_name);

        let mut merge = MergeIterator::new(&readers);
        let mut merge_error: Option<anyhow::Error> = None;
        let stream = std::iter::from_fn(|| match merge.next_entry() {
            Ok(Some(pair)) => Some(pair),
            Ok(None) => None,
            Err(e) => {
                merge_error = Some(e);
                None
            }
        });
        let write_result = SSTableWriter::write_from_iterator(&out_path, stream);

        if let Some(e) = merge_error {
            let _ = std::fs::remove_file(&out_path);
            return Err(e);
        }
        write_result?;

        drop(readers);
        for path in &sources {
            let _ = std::fs::remove_file(path);
        }

        self.next_seq += 1;
        self.levels[level].clear();
        self.levels[level + 1].push(out_path);

        tracing::info!(
            source_level = level,
            dest_level = level + 1,
            files_merged = sources.len(),
            "compacted level"
        );

        Ok(())
    }

    /// Drives [`Engine::compact`] on whatever [`Engine::should_compact`]
    /// reports until every level is under capacity.
    ///
    /// The last level never compacts further (there is no level below it),
    /// so it is excluded here even if it reports over capacity — otherwise
    /// a saturated last level would make this loop spin forever.
    pub(crate) fn drain_compactions(&mut self) -> Result<()> {
        while let Some(level) = self.should_compact() {
            if self.max_levels == 0 || level >= self.max_levels - 1 {
                break;
            }
            self.compact(level)?;
        }
        Ok(())
    }
}
