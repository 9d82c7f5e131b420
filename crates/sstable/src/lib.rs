//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the storage engine.
//!
//! When the in-memory [`memtable::Memtable`] exceeds its size threshold the
//! engine flushes it to disk as an SSTable. SSTables are *write-once,
//! read-many* — once created they are never modified (only replaced during
//! compaction).
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA SECTION (sorted key/value records)                        │
//! │                                                                 │
//! │ key_len (u32) | key | val_len (u32) | val | tombstone (u8)     │
//! │                                                                 │
//! │ ... repeated for each entry ...                                │
//! ├───────────────────────────────────────────────────────────────┤
//! │ INDEX SECTION (key -> record offset mapping)                   │
//! │                                                                 │
//! │ key_len (u32) | key | record_offset (u64)                      │
//! │                                                                 │
//! │ ... repeated for each entry ...                                │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always the last 24 bytes)                               │
//! │                                                                 │
//! │ index_offset (u64 LE) | entry_count (u64 LE)                   │
//! │ magic (u32 LE) "LSMT" | pad (u32 LE)                            │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The magic value `0x4C53_4D54` ("LSMT")
//! identifies the format. An empty SSTable (`entry_count == 0`) still
//! carries a valid footer with `index_offset == 0`.

mod format;
mod merge;
mod reader;
mod writer;

pub use format::{Footer, FOOTER_BYTES, SSTABLE_MAGIC};
pub use merge::MergeIterator;
pub use reader::{Record, SSTableIterator, SSTableReader};
pub use writer::SSTableWriter;
