//! Drive loops wiring the iterators, the DOM renderer, and an output
//! sink together. Backpressure from the bounded buffers is handled here:
//! drain the sink, then ask the producer to continue.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::dom::{DomWriter, Token};
use crate::error::Result;
use crate::format::OutBuf;
use crate::mem::arena::Arena;
use crate::mem::pool::BlockPool;
use crate::parquet::{materialize, Metadata, MetadataIter, ParquetError, ParquetFile, SchemaWriter};
use crate::thrift::dom::ThriftDomIter;

const OUTPUT_BUFFER: usize = 4096;

fn render_batch<W: Write>(
    writer: &mut DomWriter,
    batch: &[Token<'_>],
    out: &mut OutBuf,
    sink: &mut W,
) -> Result<()> {
    let mut consumed = 0;

    while consumed < batch.len() {
        consumed += writer.write(&batch[consumed..], out)?;

        sink.write_all(out.as_slice())?;
        out.clear();
    }

    Ok(())
}

/// Renders a parsed metadata tree as indented text.
pub fn render_metadata<W: Write>(metadata: &Metadata, arena: &Arena, sink: &mut W) -> Result<()> {
    let mut iter = MetadataIter::new(metadata, arena);
    let mut writer = DomWriter::new();
    let mut out = OutBuf::with_capacity(OUTPUT_BUFFER);

    loop {
        let batch = iter.next()?;

        if batch.is_empty() {
            break;
        }

        render_batch(&mut writer, batch, &mut out, sink)?;
    }

    sink.flush()?;
    Ok(())
}

/// `show` subcommand: print the metadata tree of a Parquet file.
pub fn show_metadata<W: Write>(path: &Path, pool: &BlockPool, sink: &mut W) -> Result<()> {
    debug!(path = %path.display(), "showing metadata");

    let mut file = ParquetFile::open(path, pool)?;
    let metadata = file.parse()?;

    render_metadata(&metadata, file.arena(), sink)
}

/// `schema` subcommand: print the schema tree of a Parquet file.
pub fn show_schema<W: Write>(path: &Path, pool: &BlockPool, sink: &mut W) -> Result<()> {
    debug!(path = %path.display(), "showing schema");

    let mut file = ParquetFile::open(path, pool)?;
    let metadata = file.parse()?;

    let schemas = metadata
        .schemas
        .as_deref()
        .ok_or(ParquetError::InvalidValue)?;
    let root = materialize(schemas)?;

    let mut writer = SchemaWriter::new(file.arena(), &root);
    let mut out = OutBuf::with_capacity(OUTPUT_BUFFER);

    loop {
        let done = writer.write(&mut out);

        sink.write_all(out.as_slice())?;
        out.clear();

        if done {
            break;
        }
    }

    sink.flush()?;
    Ok(())
}

/// `thrift` subcommand: dump a raw Thrift Compact structure from a file.
pub fn dump_thrift<W: Write>(path: &Path, sink: &mut W) -> Result<()> {
    debug!(path = %path.display(), "dumping thrift structure");

    let bytes = std::fs::read(path)?;
    let mut iter = ThriftDomIter::new(&bytes);
    let mut writer = DomWriter::new();
    let mut out = OutBuf::with_capacity(OUTPUT_BUFFER);

    loop {
        let batch = iter.next()?;

        if batch.is_empty() {
            break;
        }

        render_batch(&mut writer, batch, &mut out, sink)?;
    }

    sink.flush()?;
    Ok(())
}
