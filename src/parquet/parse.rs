//! Maps Thrift Compact bytes onto the metadata tree. Each struct level
//! wires a field table indexed by Thrift field id; every handler is
//! all-or-nothing and reverts the arena on failure.

use tracing::debug;

use super::metadata::{
    ColumnChunk, ColumnMeta, Metadata, PageEncodingStats, RowGroup, SchemaElement,
};
use super::ParquetError;
use crate::error::Result;
use crate::mem::arena::{Arena, Text};
use crate::thrift::reader;
use crate::thrift::CompactType;

/// Reads one field value into the target struct and returns the bytes
/// consumed. Slot 0 is reserved; ids outside the table are rejected.
type FieldReader<T> = fn(&mut T, CompactType, &mut Arena, &[u8]) -> Result<usize>;

/// Runs the field-dispatch loop of one struct: header, handler, repeat
/// until the stop byte.
fn read_struct_content<T>(
    target: &mut T,
    fields: &[Option<FieldReader<T>>],
    arena: &mut Arena,
    buf: &[u8],
) -> Result<usize> {
    let mut read = 0;
    let mut prev_id = 0u16;

    loop {
        let (header, n) = reader::read_struct_header(&buf[read..], prev_id)?;
        read += n;

        if header.field_type == CompactType::Stop {
            return Ok(read);
        }

        prev_id = header.field_id;

        let handler = fields
            .get(usize::from(header.field_id))
            .copied()
            .flatten()
            .ok_or(ParquetError::InvalidType)?;

        read += handler(target, header.field_type, arena, &buf[read..])?;
    }
}

fn expect_i32_positive(field_type: CompactType, buf: &[u8]) -> Result<(i32, usize)> {
    if field_type != CompactType::I32 {
        return Err(ParquetError::InvalidType.into());
    }

    let (value, read) = reader::read_i32(buf)?;

    if value < 0 {
        return Err(ParquetError::InvalidValue.into());
    }

    Ok((value, read))
}

fn expect_i64_positive(field_type: CompactType, buf: &[u8]) -> Result<(i64, usize)> {
    if field_type != CompactType::I64 {
        return Err(ParquetError::InvalidType.into());
    }

    let (value, read) = reader::read_i64(buf)?;

    if value < 0 {
        return Err(ParquetError::InvalidValue.into());
    }

    Ok((value, read))
}

fn expect_string(arena: &mut Arena, field_type: CompactType, buf: &[u8]) -> Result<(Text, usize)> {
    if field_type != CompactType::Binary {
        return Err(ParquetError::InvalidType.into());
    }

    let (size, header) = reader::read_binary_header(buf)?;
    let (content, read) = reader::read_binary_content(&buf[header..], size)?;

    let text = std::str::from_utf8(content).map_err(|_| ParquetError::InvalidValue)?;
    let handle = arena.intern(text.as_bytes())?;

    Ok((handle, header + read))
}

/// Reads a list of struct elements, rolling the arena back to the
/// pre-list cursor when any element fails.
fn expect_struct_list<T>(
    arena: &mut Arena,
    field_type: CompactType,
    buf: &[u8],
    element: fn(&mut Arena, &[u8]) -> Result<(T, usize)>,
) -> Result<(Vec<T>, usize)> {
    if field_type != CompactType::List {
        return Err(ParquetError::InvalidType.into());
    }

    let (header, mut read) = reader::read_list_header(buf)?;

    if header.element_type != CompactType::Struct {
        return Err(ParquetError::InvalidType.into());
    }

    let mark = arena.save();
    let mut items = Vec::with_capacity(header.size as usize);

    for _ in 0..header.size {
        match element(arena, &buf[read..]) {
            Ok((item, n)) => {
                items.push(item);
                read += n;
            }
            Err(err) => {
                arena.revert(mark)?;
                return Err(err);
            }
        }
    }

    Ok((items, read))
}

fn expect_i32_list(field_type: CompactType, buf: &[u8]) -> Result<(Vec<i32>, usize)> {
    if field_type != CompactType::List {
        return Err(ParquetError::InvalidType.into());
    }

    let (header, mut read) = reader::read_list_header(buf)?;

    if header.element_type != CompactType::I32 {
        return Err(ParquetError::InvalidType.into());
    }

    let mut items = Vec::with_capacity(header.size as usize);

    for _ in 0..header.size {
        let (value, n) = expect_i32_positive(CompactType::I32, &buf[read..])?;
        items.push(value);
        read += n;
    }

    Ok((items, read))
}

fn expect_text_list(
    arena: &mut Arena,
    field_type: CompactType,
    buf: &[u8],
) -> Result<(Vec<Text>, usize)> {
    if field_type != CompactType::List {
        return Err(ParquetError::InvalidType.into());
    }

    let (header, mut read) = reader::read_list_header(buf)?;

    if header.element_type != CompactType::Binary {
        return Err(ParquetError::InvalidType.into());
    }

    let mark = arena.save();
    let mut items = Vec::with_capacity(header.size as usize);

    for _ in 0..header.size {
        match expect_string(arena, CompactType::Binary, &buf[read..]) {
            Ok((text, n)) => {
                items.push(text);
                read += n;
            }
            Err(err) => {
                arena.revert(mark)?;
                return Err(err);
            }
        }
    }

    Ok((items, read))
}

/// Reads a nested struct field, reverting the arena when its content
/// fails.
fn expect_struct<T>(
    arena: &mut Arena,
    field_type: CompactType,
    buf: &[u8],
    element: fn(&mut Arena, &[u8]) -> Result<(T, usize)>,
) -> Result<(T, usize)> {
    if field_type != CompactType::Struct {
        return Err(ParquetError::InvalidType.into());
    }

    let mark = arena.save();

    match element(arena, buf) {
        Ok(done) => Ok(done),
        Err(err) => {
            arena.revert(mark)?;
            Err(err)
        }
    }
}

/// Consumes a field registered as intentionally ignored.
fn ignore_field<T>(
    _target: &mut T,
    field_type: CompactType,
    _arena: &mut Arena,
    buf: &[u8],
) -> Result<usize> {
    Ok(reader::skip_field(field_type, buf)?)
}

// page_encoding_stats: page_type(1), encoding(2), count(3)

const ENCODING_STATS_FIELDS: [Option<FieldReader<PageEncodingStats>>; 4] = [
    None,
    Some(|stats, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        stats.page_type = Some(value);
        Ok(read)
    }),
    Some(|stats, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        stats.encoding = Some(value);
        Ok(read)
    }),
    Some(|stats, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        stats.count = Some(value);
        Ok(read)
    }),
];

fn read_encoding_stats(arena: &mut Arena, buf: &[u8]) -> Result<(PageEncodingStats, usize)> {
    let mut stats = PageEncodingStats::default();
    let read = read_struct_content(&mut stats, &ENCODING_STATS_FIELDS, arena, buf)?;
    Ok((stats, read))
}

// column_meta: data_type(1), encodings(2), path_in_schema(3),
// compression_codec(4), num_values(5), total_uncompressed_size(6),
// total_compressed_size(7), key_value_metadata(8, ignored),
// data_page_offset(9), index_page_offset(10), dictionary_page_offset(11),
// statistics(12, ignored), encoding_stats(13)

const COLUMN_META_FIELDS: [Option<FieldReader<ColumnMeta>>; 14] = [
    None,
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        meta.data_type = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (values, read) = expect_i32_list(ty, buf)?;
        meta.encodings = Some(values);
        Ok(read)
    }),
    Some(|meta, ty, arena, buf| {
        let (values, read) = expect_text_list(arena, ty, buf)?;
        meta.path_in_schema = Some(values);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        meta.compression_codec = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.num_values = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.total_uncompressed_size = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.total_compressed_size = Some(value);
        Ok(read)
    }),
    Some(ignore_field),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.data_page_offset = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.index_page_offset = Some(value);
        Ok(read)
    }),
    Some(|meta, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        meta.dictionary_page_offset = Some(value);
        Ok(read)
    }),
    Some(ignore_field),
    Some(|meta, ty, arena, buf| {
        let (items, read) = expect_struct_list(arena, ty, buf, read_encoding_stats)?;
        meta.encoding_stats = Some(items);
        Ok(read)
    }),
];

fn read_column_meta(arena: &mut Arena, buf: &[u8]) -> Result<(ColumnMeta, usize)> {
    let mut meta = ColumnMeta::default();
    let read = read_struct_content(&mut meta, &COLUMN_META_FIELDS, arena, buf)?;
    Ok((meta, read))
}

// column_chunk: file_path(1), file_offset(2), meta(3)

const COLUMN_CHUNK_FIELDS: [Option<FieldReader<ColumnChunk>>; 4] = [
    None,
    Some(|chunk, ty, arena, buf| {
        let (text, read) = expect_string(arena, ty, buf)?;
        chunk.file_path = Some(text);
        Ok(read)
    }),
    Some(|chunk, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        chunk.file_offset = Some(value);
        Ok(read)
    }),
    Some(|chunk, ty, arena, buf| {
        let (meta, read) = expect_struct(arena, ty, buf, read_column_meta)?;
        chunk.meta = Some(meta);
        Ok(read)
    }),
];

fn read_column_chunk(arena: &mut Arena, buf: &[u8]) -> Result<(ColumnChunk, usize)> {
    let mut chunk = ColumnChunk::default();
    let read = read_struct_content(&mut chunk, &COLUMN_CHUNK_FIELDS, arena, buf)?;
    Ok((chunk, read))
}

// row_group: columns(1), total_byte_size(2), num_rows(3),
// sorting_columns(4, ignored), file_offset(5), total_compressed_size(6),
// ordinal(7, ignored)

const ROW_GROUP_FIELDS: [Option<FieldReader<RowGroup>>; 8] = [
    None,
    Some(|group, ty, arena, buf| {
        let (items, read) = expect_struct_list(arena, ty, buf, read_column_chunk)?;
        group.columns = Some(items);
        Ok(read)
    }),
    Some(|group, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        group.total_byte_size = Some(value);
        Ok(read)
    }),
    Some(|group, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        group.num_rows = Some(value);
        Ok(read)
    }),
    Some(ignore_field),
    Some(|group, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        group.file_offset = Some(value);
        Ok(read)
    }),
    Some(|group, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        group.total_compressed_size = Some(value);
        Ok(read)
    }),
    Some(ignore_field),
];

fn read_row_group(arena: &mut Arena, buf: &[u8]) -> Result<(RowGroup, usize)> {
    let mut group = RowGroup::default();
    let read = read_struct_content(&mut group, &ROW_GROUP_FIELDS, arena, buf)?;
    Ok((group, read))
}

// schema_element: data_type(1), type_length(2), repetition_type(3),
// name(4), num_children(5), converted_type(6)

const SCHEMA_ELEMENT_FIELDS: [Option<FieldReader<SchemaElement>>; 7] = [
    None,
    Some(|element, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        element.data_type = Some(value);
        Ok(read)
    }),
    Some(|element, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        element.type_length = Some(value);
        Ok(read)
    }),
    Some(|element, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        element.repetition_type = Some(value);
        Ok(read)
    }),
    Some(|element, ty, arena, buf| {
        let (text, read) = expect_string(arena, ty, buf)?;
        element.name = Some(text);
        Ok(read)
    }),
    Some(|element, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        element.num_children = Some(value);
        Ok(read)
    }),
    Some(|element, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        element.converted_type = Some(value);
        Ok(read)
    }),
];

fn read_schema_element(arena: &mut Arena, buf: &[u8]) -> Result<(SchemaElement, usize)> {
    let mut element = SchemaElement::default();
    let read = read_struct_content(&mut element, &SCHEMA_ELEMENT_FIELDS, arena, buf)?;
    Ok((element, read))
}

// file metadata: version(1), schemas(2), num_rows(3), row_groups(4),
// key_value_metadata(5, ignored), created_by(6)

const METADATA_FIELDS: [Option<FieldReader<Metadata>>; 7] = [
    None,
    Some(|metadata, ty, _arena, buf| {
        let (value, read) = expect_i32_positive(ty, buf)?;
        metadata.version = Some(value);
        Ok(read)
    }),
    Some(|metadata, ty, arena, buf| {
        let (items, read) = expect_struct_list(arena, ty, buf, read_schema_element)?;
        metadata.schemas = Some(items);
        Ok(read)
    }),
    Some(|metadata, ty, _arena, buf| {
        let (value, read) = expect_i64_positive(ty, buf)?;
        metadata.num_rows = Some(value);
        Ok(read)
    }),
    Some(|metadata, ty, arena, buf| {
        let (items, read) = expect_struct_list(arena, ty, buf, read_row_group)?;
        metadata.row_groups = Some(items);
        Ok(read)
    }),
    Some(ignore_field),
    Some(|metadata, ty, arena, buf| {
        let (text, read) = expect_string(arena, ty, buf)?;
        metadata.created_by = Some(text);
        Ok(read)
    }),
];

/// Parses one Thrift-Compact-encoded file footer. On failure the arena is
/// rolled back to where it was before the call.
pub fn parse_metadata(arena: &mut Arena, buf: &[u8]) -> Result<Metadata> {
    let mark = arena.save();
    let mut metadata = Metadata::default();

    match read_struct_content(&mut metadata, &METADATA_FIELDS, arena, buf) {
        Ok(read) => {
            debug!(read, "footer parsed");
            Ok(metadata)
        }
        Err(err) => {
            arena.revert(mark)?;
            Err(err)
        }
    }
}
