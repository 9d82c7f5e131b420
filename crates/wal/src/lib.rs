//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the storage engine.
//!
//! Every mutation (`PUT` or `DELETE`) is serialized into a binary frame and
//! appended to the WAL **before** the corresponding in-memory update. On
//! restart the WAL is replayed to reconstruct the memtable, guaranteeing that
//! no acknowledged write is lost.
//!
//! ## Binary Record Format
//!
//! ```text
//! type: u8 (1 = PUT, 2 = DELETE)
//! key_len: u32 LE
//! key: key_len bytes
//! val_len: u32 LE
//! val: val_len bytes
//! crc32: u32 LE  (IEEE 802.3, computed over type||key_len||key||val_len||val)
//! ```
//!
//! There is no record-length prefix; a reader discovers a record's end only
//! by parsing through it, which is why a torn tail write can only be detected
//! as a short read or a CRC mismatch, never framed away up front.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader};
//! use memtable::Memtable;
//!
//! let mut w = WalWriter::open("wal.log", true).unwrap();
//! w.append(b"hello", Some(b"world")).unwrap();
//! w.close().unwrap();
//!
//! let mut mem = Memtable::new();
//! let mut r = WalReader::open("wal.log").unwrap();
//! let replayed = r.recover(&mut mem).unwrap();
//! println!("replayed {} records", replayed);
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use memtable::Memtable;
use thiserror::Error;

const TYPE_PUT: u8 = 1;
const TYPE_DELETE: u8 = 2;

/// A single WAL record representing either a key-value insertion or a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// A key-value insertion.
    Put {
        /// The lookup key.
        key: Vec<u8>,
        /// The payload value.
        value: Vec<u8>,
    },
    /// A key deletion (tombstone).
    Del {
        /// The key to delete.
        key: Vec<u8>,
    },
}

/// Errors that can occur during WAL operations.
///
/// Format errors (bad type byte, CRC mismatch, short read) are not
/// surfaced as an error variant: per the recovery contract, replay treats
/// all of them as "end of durable log" and stops cleanly.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Append-only WAL writer.
///
/// Each record is serialized into a scratch buffer, checksummed, and written
/// to the file with a single `write_all` call. When `sync` is `true`, every
/// append is followed by `sync_all()` so the record is durable before the
/// call returns.
pub struct WalWriter {
    file: File,
    sync: bool,
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode. Existing bytes are left
    /// intact; new records are appended after them.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes one frame and appends it to the log.
    ///
    /// `value = None` writes a DELETE frame (`val_len` is 0 and no value
    /// bytes follow); `value = Some(v)` writes a PUT frame.
    pub fn append(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<(), WalError> {
        self.buf.clear();

        let rec_type = if value.is_some() { TYPE_PUT } else { TYPE_DELETE };
        self.buf.write_u8(rec_type)?;
        self.buf.write_u32::<LittleEndian>(key.len() as u32)?;
        self.buf.extend_from_slice(key);
        match value {
            Some(v) => {
                self.buf.write_u32::<LittleEndian>(v.len() as u32)?;
                self.buf.extend_from_slice(v);
            }
            None => {
                self.buf.write_u32::<LittleEndian>(0)?;
            }
        }

        let mut hasher = Crc32::new();
        hasher.update(&self.buf);
        let crc = hasher.finalize();
        self.buf.write_u32::<LittleEndian>(crc)?;

        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Convenience wrapper for a PUT record.
    pub fn append_put(&mut self, key: &[u8], value: &[u8]) -> Result<(), WalError> {
        self.append(key, Some(value))
    }

    /// Convenience wrapper for a DELETE record.
    pub fn append_delete(&mut self, key: &[u8]) -> Result<(), WalError> {
        self.append(key, None)
    }

    /// Flushes and fsyncs the underlying file.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the WAL file handle, flushing any buffered bytes first.
    pub fn close(mut self) -> Result<(), WalError> {
        self.file.flush()?;
        Ok(())
    }
}

/// Sequential WAL reader that replays frames from byte 0.
///
/// The reader is generic over any `Read` implementor, allowing it to be used
/// with real files (`WalReader<File>`) or in-memory buffers for testing.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    /// Constructs a reader from any `Read` implementor.
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every valid frame, calling `apply` for each one in order.
    ///
    /// Stops cleanly (without error) at the first of: EOF, a malformed type
    /// byte, a short read in any subsequent field, or a CRC mismatch. A
    /// truncated or corrupted tail is treated as "no further durable
    /// records" — this is how torn writes at the end of the log are
    /// tolerated. Returns the number of records successfully replayed.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<u64, WalError>
    where
        F: FnMut(WalRecord),
    {
        let mut count = 0u64;

        loop {
            let rec_type = match self.rdr.read_u8() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(count),
                Err(e) => return Err(WalError::Io(e)),
            };
            if rec_type != TYPE_PUT && rec_type != TYPE_DELETE {
                return Ok(count);
            }

            let key_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v as usize,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(count),
                Err(_) => return Ok(count),
            };
            let mut key = vec![0u8; key_len];
            if self.rdr.read_exact(&mut key).is_err() {
                return Ok(count);
            }

            let val_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v as usize,
                Err(_) => return Ok(count),
            };
            let mut value = vec![0u8; val_len];
            if self.rdr.read_exact(&mut value).is_err() {
                return Ok(count);
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(_) => return Ok(count),
            };

            let mut hasher = Crc32::new();
            hasher.update(&[rec_type]);
            hasher.update(&(key_len as u32).to_le_bytes());
            hasher.update(&key);
            hasher.update(&(val_len as u32).to_le_bytes());
            hasher.update(&value);
            if hasher.finalize() != crc {
                return Ok(count);
            }

            match rec_type {
                TYPE_PUT => apply(WalRecord::Put { key, value }),
                TYPE_DELETE => apply(WalRecord::Del { key }),
                _ => unreachable!(),
            }
            count += 1;
        }
    }

    /// Replays the log directly into a [`Memtable`], applying each record's
    /// put or delete. Returns the number of records replayed.
    pub fn recover(&mut self, mem: &mut Memtable) -> Result<u64, WalError> {
        let mut applied = 0u64;
        let n = self.replay(|rec| {
            match rec {
                WalRecord::Put { key, value } => mem.put(key, value),
                WalRecord::Del { key } => mem.delete(key),
            }
            applied += 1;
        })?;
        debug_assert_eq!(n, applied);
        Ok(n)
    }
}
