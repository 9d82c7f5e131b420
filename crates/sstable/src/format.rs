//! SSTable binary format constants and footer read/write helpers.
//!
//! ## Footer (24 bytes) - magic `LSMT` (`0x4C53_4D54`)
//!
//! ```text
//! [index_offset: u64 LE][entry_count: u64 LE][magic: u32 LE][pad: u32 LE]
//! ```
//!
//! The reader seeks to `EOF - 24`, reads the footer, and verifies the
//! magic before trusting `index_offset`. `pad` is reserved and always
//! written as zero.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Result as IoResult, Seek, SeekFrom, Write};

/// Magic number identifying an SSTable footer (ASCII "LSMT").
pub const SSTABLE_MAGIC: u32 = 0x4C53_4D54;

/// Size of the footer in bytes: 8 (`index_offset`) + 8 (`entry_count`) +
/// 4 (`magic`) + 4 (`pad`).
pub const FOOTER_BYTES: u64 = 8 + 8 + 4 + 4;

/// Parsed SSTable footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Absolute byte offset where the index section starts.
    pub index_offset: u64,
    /// Number of records in the data section (including tombstones).
    pub entry_count: u64,
}

/// Writes the footer to `w`.
pub fn write_footer<W: Write>(w: &mut W, index_offset: u64, entry_count: u64) -> IoResult<()> {
    w.write_u64::<LittleEndian>(index_offset)?;
    w.write_u64::<LittleEndian>(entry_count)?;
    w.write_u32::<LittleEndian>(SSTABLE_MAGIC)?;
    w.write_u32::<LittleEndian>(0)?; // pad
    Ok(())
}

/// Reads and validates the footer from `r`.
///
/// The reader is seeked to the end to determine file size, then to
/// `filesize - FOOTER_BYTES`. After this call the cursor sits at EOF.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> IoResult<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < FOOTER_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for SSTable footer",
        ));
    }

    r.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
    let index_offset = r.read_u64::<LittleEndian>()?;
    let entry_count = r.read_u64::<LittleEndian>()?;
    let magic = r.read_u32::<LittleEndian>()?;
    let _pad = r.read_u32::<LittleEndian>()?;

    if magic != SSTABLE_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown SSTable magic: {:#x}", magic),
        ));
    }

    Ok(Footer {
        index_offset,
        entry_count,
    })
}
