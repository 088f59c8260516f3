//! Turns a raw Thrift Compact structure into DOM tokens without any
//! schema: struct keys are the numeric field ids, values follow their
//! wire type. Same work-stack and backpressure contract as the metadata
//! iterator.

use super::reader;
use super::{CompactType, ThriftError};
use crate::dom::{Token, Value};

pub const TOKEN_CAPACITY: usize = 256;
pub const QUEUE_CAPACITY: usize = 256;

/// One deferred unit of emission; successors are pushed in reverse
/// execution order.
#[derive(Debug, Clone, Copy)]
enum Work {
    StructOpen,
    Fields { prev_field_id: u16 },
    Value { value_type: CompactType, in_list: bool },
    Items { remaining: u32, element_type: CompactType },
    ValueClose,
    IndexClose,
    ArrayClose,
}

pub struct ThriftDomIter<'a> {
    buf: &'a [u8],
    pos: usize,
    queue: Vec<Work>,
    tokens: Vec<Token<'a>>,
    token_capacity: usize,
    queue_capacity: usize,
}

impl<'a> ThriftDomIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_capacity(buf, TOKEN_CAPACITY, QUEUE_CAPACITY)
    }

    pub fn with_capacity(buf: &'a [u8], token_capacity: usize, queue_capacity: usize) -> Self {
        let mut queue = Vec::with_capacity(queue_capacity);
        queue.push(Work::StructOpen);

        Self {
            buf,
            pos: 0,
            queue,
            tokens: Vec::with_capacity(token_capacity),
            token_capacity,
            queue_capacity,
        }
    }

    pub fn done(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Produces the next batch of tokens. An empty batch means the walk
    /// is complete.
    pub fn next(&mut self) -> Result<&[Token<'a>], ThriftError> {
        self.tokens.clear();

        while let Some(item) = self.queue.pop() {
            match self.step(item) {
                Ok(()) => {}
                Err(ThriftError::BufferTooSmall) => {
                    self.queue.push(item);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(&self.tokens)
    }

    fn need_tokens(&self, slots: usize) -> Result<(), ThriftError> {
        if self.tokens.len() + slots > self.token_capacity {
            return Err(ThriftError::BufferTooSmall);
        }

        Ok(())
    }

    fn need_queue(&self, slots: usize) -> Result<(), ThriftError> {
        if self.queue.len() + slots > self.queue_capacity {
            return Err(ThriftError::CapacityOverflow);
        }

        Ok(())
    }

    fn step(&mut self, item: Work) -> Result<(), ThriftError> {
        match item {
            Work::StructOpen => {
                self.need_tokens(1)?;
                self.need_queue(1)?;

                self.tokens.push(Token::StructStart("struct"));
                self.queue.push(Work::Fields { prev_field_id: 0 });
            }
            Work::Fields { prev_field_id } => self.next_field(prev_field_id)?,
            Work::Value {
                value_type,
                in_list,
            } => self.next_value(value_type, in_list)?,
            Work::Items {
                remaining,
                element_type,
            } => self.next_item(remaining, element_type)?,
            Work::ValueClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::ValueEnd);
            }
            Work::IndexClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::IndexEnd);
            }
            Work::ArrayClose => {
                self.need_tokens(1)?;
                self.tokens.push(Token::ArrayEnd);
            }
        }

        Ok(())
    }

    fn next_field(&mut self, prev_field_id: u16) -> Result<(), ThriftError> {
        // worst case: the full key preamble; checked before any byte is
        // consumed so a pause replays cleanly
        self.need_tokens(4)?;
        self.need_queue(3)?;

        let (header, read) = reader::read_struct_header(&self.buf[self.pos..], prev_field_id)?;
        self.pos += read;

        if header.field_type == CompactType::Stop {
            self.tokens.push(Token::StructEnd("struct"));
            return Ok(());
        }

        self.tokens.push(Token::KeyStart("i32"));
        self.tokens
            .push(Token::Literal(Value::I32(i32::from(header.field_id))));
        self.tokens.push(Token::KeyEnd);
        self.tokens.push(Token::ValueStart(header.field_type.name()));

        self.queue.push(Work::Fields {
            prev_field_id: header.field_id,
        });
        self.queue.push(Work::ValueClose);
        self.queue.push(Work::Value {
            value_type: header.field_type,
            in_list: false,
        });

        Ok(())
    }

    fn next_value(&mut self, value_type: CompactType, in_list: bool) -> Result<(), ThriftError> {
        match value_type {
            CompactType::BoolTrue | CompactType::BoolFalse => {
                self.need_tokens(1)?;

                let value = if in_list {
                    let (value, read) = reader::read_bool(&self.buf[self.pos..])?;
                    self.pos += read;
                    value
                } else {
                    value_type == CompactType::BoolTrue
                };

                self.tokens
                    .push(Token::Literal(Value::Text(if value { "true" } else { "false" })));
            }
            CompactType::I8 => {
                self.need_tokens(1)?;
                let (value, read) = reader::read_i8(&self.buf[self.pos..])?;
                self.pos += read;
                self.tokens.push(Token::Literal(Value::I32(i32::from(value))));
            }
            CompactType::I16 => {
                self.need_tokens(1)?;
                let (value, read) = reader::read_i16(&self.buf[self.pos..])?;
                self.pos += read;
                self.tokens.push(Token::Literal(Value::I32(i32::from(value))));
            }
            CompactType::I32 => {
                self.need_tokens(1)?;
                let (value, read) = reader::read_i32(&self.buf[self.pos..])?;
                self.pos += read;
                self.tokens.push(Token::Literal(Value::I32(value)));
            }
            CompactType::I64 => {
                self.need_tokens(1)?;
                let (value, read) = reader::read_i64(&self.buf[self.pos..])?;
                self.pos += read;
                self.tokens.push(Token::Literal(Value::I64(value)));
            }
            CompactType::Binary => {
                self.need_tokens(1)?;

                let (size, header) = reader::read_binary_header(&self.buf[self.pos..])?;
                let (content, read) =
                    reader::read_binary_content(&self.buf[self.pos + header..], size)?;

                self.pos += header + read;
                self.tokens.push(Token::Literal(Value::Bytes(content)));
            }
            CompactType::List | CompactType::Set => {
                self.need_tokens(1)?;
                self.need_queue(2)?;

                let (header, read) = reader::read_list_header(&self.buf[self.pos..])?;
                self.pos += read;

                self.tokens.push(Token::ArrayStart);

                self.queue.push(Work::ArrayClose);
                self.queue.push(Work::Items {
                    remaining: header.size,
                    element_type: header.element_type,
                });
            }
            CompactType::Struct => {
                self.need_tokens(1)?;
                self.need_queue(1)?;

                self.tokens.push(Token::StructStart("struct"));
                self.queue.push(Work::Fields { prev_field_id: 0 });
            }
            // no dump support for these wire types
            CompactType::Stop
            | CompactType::Double
            | CompactType::Map
            | CompactType::Uuid => return Err(ThriftError::InvalidValue),
        }

        Ok(())
    }

    fn next_item(&mut self, remaining: u32, element_type: CompactType) -> Result<(), ThriftError> {
        if remaining == 0 {
            return Ok(());
        }

        self.need_tokens(1)?;
        self.need_queue(3)?;

        self.tokens.push(Token::IndexStart(element_type.name()));

        self.queue.push(Work::Items {
            remaining: remaining - 1,
            element_type,
        });
        self.queue.push(Work::IndexClose);
        self.queue.push(Work::Value {
            value_type: element_type,
            in_list: true,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<'a>(iter: &mut ThriftDomIter<'a>) -> Vec<Token<'a>> {
        let mut all = Vec::new();

        loop {
            let batch = iter.next().unwrap();

            if batch.is_empty() {
                return all;
            }

            all.extend_from_slice(batch);
        }
    }

    #[test]
    fn iterates_empty_struct() {
        let mut iter = ThriftDomIter::new(&[0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![Token::StructStart("struct"), Token::StructEnd("struct")]
        );
    }

    #[test]
    fn iterates_single_i32_field() {
        // field-id delta 1, type i32, value 10, stop
        let mut iter = ThriftDomIter::new(&[0x15, 0x14, 0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::KeyEnd,
                Token::ValueStart("i32"),
                Token::Literal(Value::I32(10)),
                Token::ValueEnd,
                Token::StructEnd("struct"),
            ]
        );
    }

    #[test]
    fn iterates_nested_empty_list() {
        // field-id delta 7, type list, size 0 of i8, stop
        let mut iter = ThriftDomIter::new(&[0x79, 0x03, 0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(7)),
                Token::KeyEnd,
                Token::ValueStart("list"),
                Token::ArrayStart,
                Token::ArrayEnd,
                Token::ValueEnd,
                Token::StructEnd("struct"),
            ]
        );
    }

    #[test]
    fn iterates_list_of_i32_with_indices() {
        // field 1: list of two i32 values 1 and 2
        let mut iter = ThriftDomIter::new(&[0x19, 0x25, 0x02, 0x04, 0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::KeyEnd,
                Token::ValueStart("list"),
                Token::ArrayStart,
                Token::IndexStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::IndexEnd,
                Token::IndexStart("i32"),
                Token::Literal(Value::I32(2)),
                Token::IndexEnd,
                Token::ArrayEnd,
                Token::ValueEnd,
                Token::StructEnd("struct"),
            ]
        );
    }

    #[test]
    fn iterates_binary_and_bool_fields() {
        // field 1: binary "hi"; field 2: bool true
        let mut iter = ThriftDomIter::new(&[0x18, 0x02, b'h', b'i', 0x11, 0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::KeyEnd,
                Token::ValueStart("binary"),
                Token::Literal(Value::Bytes(b"hi")),
                Token::ValueEnd,
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(2)),
                Token::KeyEnd,
                Token::ValueStart("bool"),
                Token::Literal(Value::Text("true")),
                Token::ValueEnd,
                Token::StructEnd("struct"),
            ]
        );
    }

    #[test]
    fn iterates_nested_struct() {
        // field 1: struct { field 1: i32 5 }
        let mut iter = ThriftDomIter::new(&[0x1c, 0x15, 0x0a, 0x00, 0x00]);
        let tokens = collect(&mut iter);

        assert_eq!(
            tokens,
            vec![
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::KeyEnd,
                Token::ValueStart("struct"),
                Token::StructStart("struct"),
                Token::KeyStart("i32"),
                Token::Literal(Value::I32(1)),
                Token::KeyEnd,
                Token::ValueStart("i32"),
                Token::Literal(Value::I32(5)),
                Token::ValueEnd,
                Token::StructEnd("struct"),
                Token::ValueEnd,
                Token::StructEnd("struct"),
            ]
        );
    }

    #[test]
    fn rejects_unsupported_wire_type() {
        // field 1 declared as double
        let mut iter = ThriftDomIter::new(&[0x17, 0, 0, 0, 0, 0, 0, 0, 0, 0x00]);

        let result = loop {
            match iter.next() {
                Ok(batch) if batch.is_empty() => panic!("expected an error"),
                Ok(_) => continue,
                Err(err) => break err,
            }
        };

        assert_eq!(result, ThriftError::InvalidValue);
    }

    #[test]
    fn small_token_buffer_pauses_and_resumes() {
        let bytes = [0x15, 0x14, 0x00];
        let mut iter = ThriftDomIter::with_capacity(&bytes, 4, QUEUE_CAPACITY);
        let mut all = Vec::new();
        let mut batches = 0;

        loop {
            let batch = iter.next().unwrap();

            if batch.is_empty() {
                break;
            }

            batches += 1;
            all.extend_from_slice(batch);
        }

        assert!(batches > 1, "expected the walk to pause at least once");

        let mut reference = ThriftDomIter::new(&bytes);
        assert_eq!(all, collect(&mut reference));
    }
}
