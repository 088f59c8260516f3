//! Walks the metadata tree as an explicit LIFO of work items and produces
//! bounded batches of DOM tokens. Every handler checks the token and
//! queue headroom against its worst case before touching either, so a
//! full token buffer simply pauses the walk until the caller drains it.

use super::metadata::{
    ColumnChunk, ColumnMeta, Metadata, PageEncodingStats, RowGroup, SchemaElement,
    COMPRESSION_NAMES, CONVERTED_TYPE_NAMES, DATA_TYPE_NAMES, ENCODING_NAMES, PAGE_TYPE_NAMES,
    REPETITION_TYPE_NAMES,
};
use super::ParquetError;
use crate::dom::{Token, Value};
use crate::mem::arena::{Arena, Text};

pub const TOKEN_CAPACITY: usize = 256;
pub const QUEUE_CAPACITY: usize = 256;

/// Cursor over a homogeneous sequence of the metadata tree.
#[derive(Debug, Clone, Copy)]
enum Items<'a> {
    Schemas(&'a [SchemaElement]),
    RowGroups(&'a [RowGroup]),
    Columns(&'a [ColumnChunk]),
    Stats(&'a [PageEncodingStats]),
    Encodings(&'a [i32]),
    Texts(&'a [Text]),
}

impl<'a> Items<'a> {
    fn is_empty(&self) -> bool {
        match self {
            Items::Schemas(items) => items.is_empty(),
            Items::RowGroups(items) => items.is_empty(),
            Items::Columns(items) => items.is_empty(),
            Items::Stats(items) => items.is_empty(),
            Items::Encodings(items) => items.is_empty(),
            Items::Texts(items) => items.is_empty(),
        }
    }

    fn split_first(self) -> Option<(Node<'a>, Items<'a>)> {
        match self {
            Items::Schemas(items) => items
                .split_first()
                .map(|(first, rest)| (Node::Schema(first), Items::Schemas(rest))),
            Items::RowGroups(items) => items
                .split_first()
                .map(|(first, rest)| (Node::RowGroup(first), Items::RowGroups(rest))),
            Items::Columns(items) => items
                .split_first()
                .map(|(first, rest)| (Node::Column(first), Items::Columns(rest))),
            Items::Stats(items) => items
                .split_first()
                .map(|(first, rest)| (Node::Stats(first), Items::Stats(rest))),
            Items::Encodings(items) => items.split_first().map(|(first, rest)| {
                (
                    Node::Enum {
                        value: *first,
                        names: ENCODING_NAMES,
                    },
                    Items::Encodings(rest),
                )
            }),
            Items::Texts(items) => items
                .split_first()
                .map(|(first, rest)| (Node::Text(*first), Items::Texts(rest))),
        }
    }
}

/// Content to emit for one value or struct of the tree.
#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    I32(i32),
    I64(i64),
    Text(Text),
    Enum {
        value: i32,
        names: &'static [&'static str],
    },
    Metadata(&'a Metadata),
    Schema(&'a SchemaElement),
    RowGroup(&'a RowGroup),
    Column(&'a ColumnChunk),
    ColumnMeta(&'a ColumnMeta),
    Stats(&'a PageEncodingStats),
}

/// One deferred unit of emission on the LIFO stack. Successors are pushed
/// in reverse execution order.
#[derive(Debug, Clone, Copy)]
enum Work<'a> {
    StructOpen(&'static str),
    StructClose(&'static str),
    ArrayOpen,
    ArrayClose,
    ValueClose,
    IndexClose,
    Field {
        name: &'static str,
        kind: &'static str,
        node: Node<'a>,
    },
    Array {
        name: &'static str,
        kind: &'static str,
        items: Items<'a>,
    },
    Index {
        kind: &'static str,
        items: Items<'a>,
    },
    Node(Node<'a>),
}

pub struct MetadataIter<'a> {
    arena: &'a Arena,
    queue: Vec<Work<'a>>,
    tokens: Vec<Token<'a>>,
    token_capacity: usize,
    queue_capacity: usize,
}

impl<'a> MetadataIter<'a> {
    pub fn new(metadata: &'a Metadata, arena: &'a Arena) -> Self {
        Self::with_capacity(metadata, arena, TOKEN_CAPACITY, QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        metadata: &'a Metadata,
        arena: &'a Arena,
        token_capacity: usize,
        queue_capacity: usize,
    ) -> Self {
        let mut queue = Vec::with_capacity(queue_capacity);
        queue.push(Work::Node(Node::Metadata(metadata)));

        Self {
            arena,
            queue,
            tokens: Vec::with_capacity(token_capacity),
            token_capacity,
            queue_capacity,
        }
    }

    pub fn done(&self) -> bool {
        self.queue.is_empty()
    }

    /// Produces the next batch of tokens. An empty batch means the walk
    /// is complete.
    pub fn next(&mut self) -> Result<&[Token<'a>], ParquetError> {
        self.tokens.clear();

        while let Some(item) = self.queue.pop() {
            match self.step(item) {
                Ok(()) => {}
                Err(ParquetError::BufferTooSmall) => {
                    self.queue.push(item);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(&self.tokens)
    }

    fn need_tokens(&self, slots: usize) -> Result<(), ParquetError> {
        if self.tokens.len() + slots > self.token_capacity {
            return Err(ParquetError::BufferTooSmall);
        }

        Ok(())
    }

    fn need_queue(&self, slots: usize) -> Result<(), ParquetError> {
        if self.queue.len() + slots > self.queue_capacity {
            return Err(ParquetError::CapacityOverflow);
        }

        Ok(())
    }

    fn step(&mut self, item: Work<'a>) -> Result<(), ParquetError> {
        match item {
            Work::StructOpen(name) => {
                self.need_tokens(1)?;
                self.tokens.push(Token::StructStart(name));
            }
            Work::StructClose(name) => {
                self.need_tokens(1)?;
                self.tokens.push(Token::StructEnd(name));
            }
            Work::ArrayOpen => {
                self.need_tokens(1)?;
                self.tokens.push(Token::ArrayStart);
            }
            Work::ArrayClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::ArrayEnd);
            }
            Work::ValueClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::ValueEnd);
            }
            Work::IndexClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::IndexEnd);
            }
            Work::Field { name, kind, node } => {
                self.need_tokens(4)?;
                self.need_queue(2)?;

                self.tokens.push(Token::KeyStart("text"));
                self.tokens.push(Token::Literal(Value::Text(name)));
                self.tokens.push(Token::KeyEnd);
                self.tokens.push(Token::ValueStart(kind));

                self.queue.push(Work::ValueClose);
                self.queue.push(Work::Node(node));
            }
            Work::Array { name, kind, items } => {
                self.need_tokens(4)?;
                self.need_queue(4)?;

                self.tokens.push(Token::KeyStart("text"));
                self.tokens.push(Token::Literal(Value::Text(name)));
                self.tokens.push(Token::KeyEnd);
                self.tokens.push(Token::ValueStart(kind));

                self.queue.push(Work::ValueClose);
                self.queue.push(Work::ArrayClose);
                self.queue.push(Work::Index { kind, items });
                self.queue.push(Work::ArrayOpen);
            }
            Work::Index { kind, items } => {
                if items.is_empty() {
                    return Ok(());
                }

                self.need_tokens(1)?;
                self.need_queue(3)?;

                if let Some((node, rest)) = items.split_first() {
                    self.tokens.push(Token::IndexStart(kind));

                    self.queue.push(Work::Index { kind, items: rest });
                    self.queue.push(Work::IndexClose);
                    self.queue.push(Work::Node(node));
                }
            }
            Work::Node(node) => self.dump_node(node)?,
        }

        Ok(())
    }

    fn dump_node(&mut self, node: Node<'a>) -> Result<(), ParquetError> {
        match node {
            Node::I32(value) => {
                self.need_tokens(1)?;
                self.tokens.push(Token::Literal(Value::I32(value)));
            }
            Node::I64(value) => {
                self.need_tokens(1)?;
                self.tokens.push(Token::Literal(Value::I64(value)));
            }
            Node::Text(text) => {
                self.need_tokens(1)?;
                self.tokens
                    .push(Token::Literal(Value::Text(self.arena.text(text))));
            }
            Node::Enum { value, names } => {
                self.need_tokens(1)?;

                match super::metadata::enum_name(names, value) {
                    Some(name) => self.tokens.push(Token::Literal(Value::Text(name))),
                    None => self.tokens.push(Token::Literal(Value::I32(value))),
                }
            }
            Node::Metadata(metadata) => self.dump_metadata(metadata)?,
            Node::Schema(element) => self.dump_schema_element(element)?,
            Node::RowGroup(group) => self.dump_row_group(group)?,
            Node::Column(chunk) => self.dump_column_chunk(chunk)?,
            Node::ColumnMeta(meta) => self.dump_column_meta(meta)?,
            Node::Stats(stats) => self.dump_encoding_stats(stats)?,
        }

        Ok(())
    }

    fn dump_metadata(&mut self, metadata: &'a Metadata) -> Result<(), ParquetError> {
        self.need_queue(7)?;

        self.queue.push(Work::StructClose("metadata"));

        if let Some(created_by) = metadata.created_by {
            self.queue.push(Work::Field {
                name: "created_by",
                kind: "text",
                node: Node::Text(created_by),
            });
        }

        if let Some(row_groups) = &metadata.row_groups {
            self.queue.push(Work::Array {
                name: "row_groups",
                kind: "struct",
                items: Items::RowGroups(row_groups),
            });
        }

        if let Some(num_rows) = metadata.num_rows {
            self.queue.push(Work::Field {
                name: "num_rows",
                kind: "i64",
                node: Node::I64(num_rows),
            });
        }

        if let Some(schemas) = &metadata.schemas {
            self.queue.push(Work::Array {
                name: "schemas",
                kind: "struct",
                items: Items::Schemas(schemas),
            });
        }

        if let Some(version) = metadata.version {
            self.queue.push(Work::Field {
                name: "version",
                kind: "i32",
                node: Node::I32(version),
            });
        }

        self.queue.push(Work::StructOpen("metadata"));
        Ok(())
    }

    fn dump_schema_element(&mut self, element: &'a SchemaElement) -> Result<(), ParquetError> {
        self.need_queue(8)?;

        self.queue.push(Work::StructClose("schema_element"));

        if let Some(converted_type) = element.converted_type {
            self.queue.push(Work::Field {
                name: "converted_type",
                kind: "enum",
                node: Node::Enum {
                    value: converted_type,
                    names: CONVERTED_TYPE_NAMES,
                },
            });
        }

        if let Some(num_children) = element.num_children {
            self.queue.push(Work::Field {
                name: "num_children",
                kind: "i32",
                node: Node::I32(num_children),
            });
        }

        if let Some(name) = element.name {
            self.queue.push(Work::Field {
                name: "name",
                kind: "text",
                node: Node::Text(name),
            });
        }

        if let Some(repetition_type) = element.repetition_type {
            self.queue.push(Work::Field {
                name: "repetition_type",
                kind: "enum",
                node: Node::Enum {
                    value: repetition_type,
                    names: REPETITION_TYPE_NAMES,
                },
            });
        }

        if let Some(type_length) = element.type_length {
            self.queue.push(Work::Field {
                name: "type_length",
                kind: "i32",
                node: Node::I32(type_length),
            });
        }

        if let Some(data_type) = element.data_type {
            self.queue.push(Work::Field {
                name: "data_type",
                kind: "enum",
                node: Node::Enum {
                    value: data_type,
                    names: DATA_TYPE_NAMES,
                },
            });
        }

        self.queue.push(Work::StructOpen("schema_element"));
        Ok(())
    }

    fn dump_row_group(&mut self, group: &'a RowGroup) -> Result<(), ParquetError> {
        self.need_queue(7)?;

        self.queue.push(Work::StructClose("row_group"));

        if let Some(total_compressed_size) = group.total_compressed_size {
            self.queue.push(Work::Field {
                name: "total_compressed_size",
                kind: "i64",
                node: Node::I64(total_compressed_size),
            });
        }

        // zero means "unset" for legacy writers
        if let Some(file_offset) = group.file_offset {
            if file_offset > 0 {
                self.queue.push(Work::Field {
                    name: "file_offset",
                    kind: "i64",
                    node: Node::I64(file_offset),
                });
            }
        }

        if let Some(num_rows) = group.num_rows {
            self.queue.push(Work::Field {
                name: "num_rows",
                kind: "i64",
                node: Node::I64(num_rows),
            });
        }

        if let Some(total_byte_size) = group.total_byte_size {
            self.queue.push(Work::Field {
                name: "total_byte_size",
                kind: "i64",
                node: Node::I64(total_byte_size),
            });
        }

        if let Some(columns) = &group.columns {
            self.queue.push(Work::Array {
                name: "columns",
                kind: "struct",
                items: Items::Columns(columns),
            });
        }

        self.queue.push(Work::StructOpen("row_group"));
        Ok(())
    }

    fn dump_column_chunk(&mut self, chunk: &'a ColumnChunk) -> Result<(), ParquetError> {
        self.need_queue(5)?;

        self.queue.push(Work::StructClose("column-chunk"));

        if let Some(meta) = &chunk.meta {
            self.queue.push(Work::Node(Node::ColumnMeta(meta)));
        }

        if let Some(file_path) = chunk.file_path {
            self.queue.push(Work::Field {
                name: "file_path",
                kind: "text",
                node: Node::Text(file_path),
            });
        }

        if let Some(file_offset) = chunk.file_offset {
            if file_offset > 0 {
                self.queue.push(Work::Field {
                    name: "file_offset",
                    kind: "i64",
                    node: Node::I64(file_offset),
                });
            }
        }

        self.queue.push(Work::StructOpen("column-chunk"));
        Ok(())
    }

    fn dump_column_meta(&mut self, meta: &'a ColumnMeta) -> Result<(), ParquetError> {
        self.need_queue(13)?;

        self.queue.push(Work::StructClose("column-meta"));

        if let Some(encoding_stats) = &meta.encoding_stats {
            self.queue.push(Work::Array {
                name: "encoding_stats",
                kind: "struct",
                items: Items::Stats(encoding_stats),
            });
        }

        if let Some(dictionary_page_offset) = meta.dictionary_page_offset {
            self.queue.push(Work::Field {
                name: "dictionary_page_offset",
                kind: "i64",
                node: Node::I64(dictionary_page_offset),
            });
        }

        if let Some(index_page_offset) = meta.index_page_offset {
            self.queue.push(Work::Field {
                name: "index_page_offset",
                kind: "i64",
                node: Node::I64(index_page_offset),
            });
        }

        if let Some(data_page_offset) = meta.data_page_offset {
            self.queue.push(Work::Field {
                name: "data_page_offset",
                kind: "i64",
                node: Node::I64(data_page_offset),
            });
        }

        if let Some(total_compressed_size) = meta.total_compressed_size {
            self.queue.push(Work::Field {
                name: "total_compressed_size",
                kind: "i64",
                node: Node::I64(total_compressed_size),
            });
        }

        if let Some(total_uncompressed_size) = meta.total_uncompressed_size {
            self.queue.push(Work::Field {
                name: "total_uncompressed_size",
                kind: "i64",
                node: Node::I64(total_uncompressed_size),
            });
        }

        if let Some(num_values) = meta.num_values {
            self.queue.push(Work::Field {
                name: "num_values",
                kind: "i64",
                node: Node::I64(num_values),
            });
        }

        if let Some(compression_codec) = meta.compression_codec {
            self.queue.push(Work::Field {
                name: "compression_codec",
                kind: "enum",
                node: Node::Enum {
                    value: compression_codec,
                    names: COMPRESSION_NAMES,
                },
            });
        }

        if let Some(path_in_schema) = &meta.path_in_schema {
            self.queue.push(Work::Array {
                name: "path_in_schema",
                kind: "str",
                items: Items::Texts(path_in_schema),
            });
        }

        if let Some(encodings) = &meta.encodings {
            self.queue.push(Work::Array {
                name: "encodings",
                kind: "i32",
                items: Items::Encodings(encodings),
            });
        }

        if let Some(data_type) = meta.data_type {
            self.queue.push(Work::Field {
                name: "data_type",
                kind: "enum",
                node: Node::Enum {
                    value: data_type,
                    names: DATA_TYPE_NAMES,
                },
            });
        }

        self.queue.push(Work::StructOpen("column-meta"));
        Ok(())
    }

    fn dump_encoding_stats(&mut self, stats: &'a PageEncodingStats) -> Result<(), ParquetError> {
        self.need_queue(5)?;

        self.queue.push(Work::StructClose("encoding-stats"));

        if let Some(count) = stats.count {
            self.queue.push(Work::Field {
                name: "count",
                kind: "i32",
                node: Node::I32(count),
            });
        }

        if let Some(encoding) = stats.encoding {
            self.queue.push(Work::Field {
                name: "encoding",
                kind: "enum",
                node: Node::Enum {
                    value: encoding,
                    names: ENCODING_NAMES,
                },
            });
        }

        if let Some(page_type) = stats.page_type {
            self.queue.push(Work::Field {
                name: "page_type",
                kind: "enum",
                node: Node::Enum {
                    value: page_type,
                    names: PAGE_TYPE_NAMES,
                },
            });
        }

        self.queue.push(Work::StructOpen("encoding-stats"));
        Ok(())
    }
}
