//! Footer discovery. A Parquet file ends with the 4-byte `PAR1` marker,
//! preceded by the little-endian 32-bit footer length, preceded by the
//! Thrift-Compact-encoded metadata.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use super::parse::parse_metadata;
use super::{Metadata, ParquetError};
use crate::error::Result;
use crate::mem::arena::Arena;
use crate::mem::pool::{Block, BlockPool};

pub const FOOTER_MAGIC: &[u8; 4] = b"PAR1";

const DEFAULT_FOOTER_BUFFER: usize = 4096;
const ARENA_STEP: u32 = 4096;
const ARENA_LIMIT: u32 = 32 * 4096;

/// The footer bytes of one file, kept inside a pooled block. The metadata
/// content spans `start..start + len`, the length word and marker follow.
pub struct Footer {
    block: Block,
    start: usize,
    len: usize,
}

impl Footer {
    pub fn bytes(&self) -> &[u8] {
        &self.block.as_slice()[self.start..self.start + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fills `buf` from `source` at `offset`, retrying short reads. A read of
/// zero before the buffer is full means the file lied about its size.
fn read_at_exact<R: Read + Seek>(source: &mut R, offset: u64, buf: &mut [u8]) -> Result<()> {
    source.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;

    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => return Err(ParquetError::InvalidFile.into()),
            Ok(read) => filled += read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Reads the footer from a positioned byte source. The initial 4 KiB
/// buffer is regrown once to the next power of two covering the declared
/// footer; a footer that still does not fit is invalid.
pub fn read_footer<R: Read + Seek>(source: &mut R, pool: &BlockPool) -> Result<Footer> {
    let file_size = source.seek(SeekFrom::End(0))?;

    if file_size < 8 {
        return Err(ParquetError::InvalidFile.into());
    }

    let mut buffer_size = DEFAULT_FOOTER_BUFFER;

    loop {
        let mut block = pool.acquire(buffer_size)?;
        let block_len = block.len();
        let tail = file_size.min(block_len as u64) as usize;

        // the file tail is aligned to the end of the block
        let result = read_at_exact(
            source,
            file_size - tail as u64,
            &mut block.as_mut_slice()[block_len - tail..],
        );

        if let Err(err) = result {
            pool.release(block);
            return Err(err);
        }

        let slice = block.as_slice();

        if &slice[block_len - 4..] != FOOTER_MAGIC {
            pool.release(block);
            return Err(ParquetError::InvalidFile.into());
        }

        let mut word = [0u8; 4];
        word.copy_from_slice(&slice[block_len - 8..block_len - 4]);
        let footer_len = u32::from_le_bytes(word) as usize;

        if footer_len + 8 <= tail {
            debug!(footer_len, buffer_size, "footer located");

            return Ok(Footer {
                block,
                start: block_len - 8 - footer_len,
                len: footer_len,
            });
        }

        pool.release(block);

        // the declared footer is larger than what was read
        if footer_len as u64 + 8 > file_size || buffer_size > DEFAULT_FOOTER_BUFFER {
            return Err(ParquetError::InvalidFile.into());
        }

        buffer_size = (footer_len + 8).next_power_of_two();
        debug!(buffer_size, "footer buffer regrown");
    }
}

/// One open Parquet file: its footer bytes and the arena that will own
/// the parsed metadata strings.
pub struct ParquetFile {
    arena: Arena,
    footer: Footer,
}

impl ParquetFile {
    pub fn open(path: &Path, pool: &BlockPool) -> Result<Self> {
        let mut file = File::open(path)?;
        let footer = read_footer(&mut file, pool)?;

        Ok(Self {
            arena: Arena::new(pool.clone(), ARENA_STEP, ARENA_LIMIT),
            footer,
        })
    }

    /// Builds a source-independent handle for tests and in-memory use.
    pub fn from_source<R: Read + Seek>(source: &mut R, pool: &BlockPool) -> Result<Self> {
        let footer = read_footer(source, pool)?;

        Ok(Self {
            arena: Arena::new(pool.clone(), ARENA_STEP, ARENA_LIMIT),
            footer,
        })
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Parses the footer into a metadata tree whose strings live in this
    /// file's arena.
    pub fn parse(&mut self) -> Result<Metadata> {
        let Self { arena, footer } = self;
        parse_metadata(arena, footer.bytes())
    }
}
