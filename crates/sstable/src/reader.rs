use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format::{read_footer, FOOTER_BYTES};

/// Maximum key size we'll allocate during reads (64 KiB). Prevents OOM on corrupt files.
const MAX_KEY_BYTES: usize = 64 * 1024;
/// Maximum value size we'll allocate during reads (10 MiB). Prevents OOM on corrupt files.
const MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Reads an SSTable file for point lookups and forward iteration.
///
/// On [`open`](SSTableReader::open) the entire index is loaded into memory as
/// a sorted `Vec<(Vec<u8>, u64)>` (key, data-section record offset), binary
/// searched by [`get`]. A single file handle is kept open for the lifetime of
/// the reader.
pub struct SSTableReader {
    path: PathBuf,
    index: Vec<(Vec<u8>, u64)>,
    entry_count: u64,
    file: RefCell<BufReader<File>>,
}

/// One decoded record from the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's key.
    pub key: Vec<u8>,
    /// `Some(value)` for a live write, `None` for a tombstone.
    pub value: Option<Vec<u8>>,
}

impl SSTableReader {
    /// Opens an SSTable file and loads its index into memory.
    ///
    /// Seeks to `EOF - 24`, reads and validates the footer, then seeks to
    /// `index_offset` and reads `entry_count` (key, offset) pairs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)?;
        let metadata = f.metadata()?;
        if metadata.len() < FOOTER_BYTES {
            bail!("sstable file too small");
        }

        let footer = read_footer(&mut f)?;

        let mut index = Vec::with_capacity(footer.entry_count as usize);
        if footer.entry_count > 0 {
            f.seek(SeekFrom::Start(footer.index_offset))?;
            for _ in 0..footer.entry_count {
                let key_len = f.read_u32::<LittleEndian>()? as usize;
                if key_len > MAX_KEY_BYTES {
                    bail!("corrupt index: key_len {} exceeds maximum", key_len);
                }
                let mut key = vec![0u8; key_len];
                f.read_exact(&mut key)?;
                let record_offset = f.read_u64::<LittleEndian>()?;
                index.push((key, record_offset));
            }
        }

        f.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path_buf,
            index,
            entry_count: footer.entry_count,
            file: RefCell::new(BufReader::new(f)),
        })
    }

    /// Binary searches the in-memory index and, on a hit, reads the full
    /// record from disk.
    ///
    /// Returns `Ok(Some(Some(value)))` for a live hit, `Ok(Some(None))` for a
    /// tombstone hit, and `Ok(None)` if the key is not present in this table.
    pub fn get(&self, key: &[u8]) -> Result<Option<Option<Vec<u8>>>> {
        let offset = match self.index.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(i) => self.index[i].1,
            Err(_) => return Ok(None),
        };

        let mut f = self.file.borrow_mut();
        f.seek(SeekFrom::Start(offset))?;

        let record = read_record(&mut *f)?;
        if record.key != key {
            bail!("index pointed to mismatching key at offset {}", offset);
        }

        Ok(Some(record.value))
    }

    /// Path this reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the in-memory index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_count as usize
    }

    /// `true` if the SSTable contains zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Iterator over all keys in ascending order, as loaded into the index.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.index.iter().map(|(k, _)| k.as_slice())
    }

    /// Opens a fresh sequential iterator over the data section, independent
    /// of this reader's own file handle.
    pub fn iter_open(&self) -> Result<SSTableIterator> {
        SSTableIterator::open(&self.path)
    }
}

/// Sequential forward iterator over an SSTable's data section.
///
/// Mirrors the `iter_open` / `iter_next` / `iter_close` operation triad:
/// construction reads the footer to learn `entry_count` and seeks to byte 0;
/// [`next`](SSTableIterator::next) yields one record at a time until
/// `remaining` reaches zero; dropping the iterator releases the handle.
pub struct SSTableIterator {
    file: BufReader<File>,
    remaining: u64,
}

impl SSTableIterator {
    fn open(path: &Path) -> Result<Self> {
        let mut f = File::open(path)?;
        let footer = read_footer(&mut f)?;
        f.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file: BufReader::new(f),
            remaining: footer.entry_count,
        })
    }

    /// Returns the next record, or `None` once all `entry_count` records
    /// have been yielded.
    pub fn next(&mut self) -> Result<Option<Record>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let record = read_record(&mut self.file)?;
        self.remaining -= 1;
        Ok(Some(record))
    }
}

fn read_record<R: Read>(r: &mut R) -> Result<Record> {
    let key_len = r.read_u32::<LittleEndian>()? as usize;
    if key_len > MAX_KEY_BYTES {
        bail!("corrupt data: key_len {} exceeds maximum", key_len);
    }
    let mut key = vec![0u8; key_len];
    r.read_exact(&mut key)?;

    let val_len = r.read_u32::<LittleEndian>()? as usize;
    if val_len > MAX_VALUE_BYTES {
        bail!("corrupt data: val_len {} exceeds maximum", val_len);
    }
    let mut val = vec![0u8; val_len];
    r.read_exact(&mut val)?;

    let tombstone = r.read_u8()?;
    let value = if tombstone == 1 { None } else { Some(val) };

    Ok(Record { key, value })
}

#[cfg(test)]
#[path = "tests/reader_tests.rs"]
mod tests;
