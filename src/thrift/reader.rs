//! Stateless Compact Protocol decoders. Every function takes a byte slice
//! positioned at the value and returns the decoded value together with the
//! number of bytes consumed.

use super::{CompactType, ListHeader, StructHeader, ThriftError};

type ReadResult<T> = Result<(T, usize), ThriftError>;

/// Unsigned LEB128 varint, at most 5 bytes; the 5th byte may only carry
/// the low nibble.
pub fn read_u32(buf: &[u8]) -> ReadResult<u32> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let mut read: usize = 0;

    loop {
        if read >= buf.len() {
            return Err(ThriftError::BufferOverflow);
        }

        let next = buf[read];
        read += 1;

        if shift == 28 && next & 0xf0 != 0 {
            return Err(ThriftError::VarintOverflow);
        }

        value |= u32::from(next & 0x7f) << shift;

        if next & 0x80 == 0 {
            return Ok((value, read));
        }

        shift += 7;
        if shift > 28 {
            return Err(ThriftError::VarintOverflow);
        }
    }
}

/// Unsigned LEB128 varint, at most 10 bytes; the 10th byte may only carry
/// the top bit of the value.
pub fn read_u64(buf: &[u8]) -> ReadResult<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut read: usize = 0;

    loop {
        if read >= buf.len() {
            return Err(ThriftError::BufferOverflow);
        }

        let next = buf[read];
        read += 1;

        if shift == 63 && next & 0xfe != 0 {
            return Err(ThriftError::VarintOverflow);
        }

        value |= u64::from(next & 0x7f) << shift;

        if next & 0x80 == 0 {
            return Ok((value, read));
        }

        shift += 7;
        if shift > 63 {
            return Err(ThriftError::VarintOverflow);
        }
    }
}

/// Zig-zag encoded i32.
pub fn read_i32(buf: &[u8]) -> ReadResult<i32> {
    let (value, read) = read_u32(buf)?;
    Ok((((value >> 1) as i32) ^ -((value & 1) as i32), read))
}

/// Zig-zag encoded i64.
pub fn read_i64(buf: &[u8]) -> ReadResult<i64> {
    let (value, read) = read_u64(buf)?;
    Ok((((value >> 1) as i64) ^ -((value & 1) as i64), read))
}

/// Zig-zag encoded i16; values outside the i16 range are malformed.
pub fn read_i16(buf: &[u8]) -> ReadResult<i16> {
    let (value, read) = read_i32(buf)?;

    i16::try_from(value)
        .map(|value| (value, read))
        .map_err(|_| ThriftError::VarintOverflow)
}

/// A single raw byte.
pub fn read_i8(buf: &[u8]) -> ReadResult<i8> {
    match buf.first() {
        Some(&byte) => Ok((byte as i8, 1)),
        None => Err(ThriftError::BufferOverflow),
    }
}

/// A bool encoded as a list element: one byte carrying the bool type code.
pub fn read_bool(buf: &[u8]) -> ReadResult<bool> {
    match buf.first() {
        Some(1) => Ok((true, 1)),
        Some(2) => Ok((false, 1)),
        Some(_) => Err(ThriftError::InvalidValue),
        None => Err(ThriftError::BufferOverflow),
    }
}

/// One struct-field header byte: low nibble is the type, high nibble a
/// delta added to `prev_field_id`. A zero byte terminates the struct; a
/// zero delta on any other type is rejected.
pub fn read_struct_header(buf: &[u8], prev_field_id: u16) -> ReadResult<StructHeader> {
    let byte = match buf.first() {
        Some(&byte) => byte,
        None => return Err(ThriftError::BufferOverflow),
    };

    if byte == 0 {
        return Ok((
            StructHeader {
                field_id: 0,
                field_type: CompactType::Stop,
            },
            1,
        ));
    }

    let field_type = CompactType::try_from(byte & 0x0f)?;
    let delta = u16::from(byte >> 4);

    if delta == 0 {
        return Err(ThriftError::InvalidValue);
    }

    let field_id = prev_field_id
        .checked_add(delta)
        .ok_or(ThriftError::InvalidValue)?;

    Ok((
        StructHeader {
            field_id,
            field_type,
        },
        1,
    ))
}

/// One list header byte: high nibble is a short size (0-14), low nibble
/// the element type; a high nibble of 15 means an extended varint size
/// follows.
pub fn read_list_header(buf: &[u8]) -> ReadResult<ListHeader> {
    let byte = match buf.first() {
        Some(&byte) => byte,
        None => return Err(ThriftError::BufferOverflow),
    };

    let element_type = CompactType::try_from(byte & 0x0f)?;
    let short = u32::from(byte >> 4);

    if short < 15 {
        return Ok((
            ListHeader {
                size: short,
                element_type,
            },
            1,
        ));
    }

    let (size, read) = read_u32(&buf[1..])?;

    Ok((
        ListHeader { size, element_type },
        1 + read,
    ))
}

/// Length prefix of a binary value: a raw varint that must fit in i32.
pub fn read_binary_header(buf: &[u8]) -> ReadResult<u32> {
    let (size, read) = read_u32(buf)?;

    if size > i32::MAX as u32 {
        return Err(ThriftError::InvalidValue);
    }

    Ok((size, read))
}

/// The `size` content bytes following a binary header.
pub fn read_binary_content(buf: &[u8], size: u32) -> ReadResult<&[u8]> {
    let size = size as usize;

    if buf.len() < size {
        return Err(ThriftError::BufferOverflow);
    }

    Ok((&buf[..size], size))
}

/// Skips one struct field of the given type, returning the bytes
/// consumed. Struct-context bools live entirely in the field header.
pub fn skip_field(field_type: CompactType, buf: &[u8]) -> Result<usize, ThriftError> {
    match field_type {
        CompactType::BoolTrue | CompactType::BoolFalse => Ok(0),
        other => skip_value(other, buf),
    }
}

fn skip_fixed(buf: &[u8], size: usize) -> Result<usize, ThriftError> {
    if buf.len() < size {
        return Err(ThriftError::BufferOverflow);
    }

    Ok(size)
}

/// Skips one value of the given type in list/map context, where bools
/// occupy one byte.
fn skip_value(value_type: CompactType, buf: &[u8]) -> Result<usize, ThriftError> {
    match value_type {
        CompactType::Stop => Err(ThriftError::InvalidValue),
        CompactType::BoolTrue | CompactType::BoolFalse => skip_fixed(buf, 1),
        CompactType::I8 => skip_fixed(buf, 1),
        CompactType::I16 | CompactType::I32 => read_u32(buf).map(|(_, read)| read),
        CompactType::I64 => read_u64(buf).map(|(_, read)| read),
        CompactType::Double => skip_fixed(buf, 8),
        CompactType::Uuid => skip_fixed(buf, 16),
        CompactType::Binary => {
            let (size, header) = read_binary_header(buf)?;
            let (_, read) = read_binary_content(&buf[header..], size)?;
            Ok(header + read)
        }
        CompactType::List | CompactType::Set => {
            let (header, mut read) = read_list_header(buf)?;

            for _ in 0..header.size {
                read += skip_value(header.element_type, &buf[read..])?;
            }

            Ok(read)
        }
        CompactType::Map => {
            let (size, mut read) = read_u32(buf)?;

            if size == 0 {
                return Ok(read);
            }

            // one byte packs the key and value types
            let types = match buf.get(read) {
                Some(&types) => types,
                None => return Err(ThriftError::BufferOverflow),
            };
            read += 1;

            let key_type = CompactType::try_from(types >> 4)?;
            let value_type = CompactType::try_from(types & 0x0f)?;

            for _ in 0..size {
                read += skip_value(key_type, &buf[read..])?;
                read += skip_value(value_type, &buf[read..])?;
            }

            Ok(read)
        }
        CompactType::Struct => {
            let mut read = 0;
            let mut prev_field_id = 0;

            loop {
                let (header, n) = read_struct_header(&buf[read..], prev_field_id)?;
                read += n;

                if header.field_type == CompactType::Stop {
                    return Ok(read);
                }

                prev_field_id = header.field_id;
                read += skip_field(header.field_type, &buf[read..])?;
            }
        }
    }
}
