pub mod dom;
pub mod reader;

use thiserror::Error;

use crate::error::THRIFT_ERROR_BASE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThriftError {
    /// The input slice ended before the value did.
    #[error("truncated input")]
    BufferOverflow,

    /// A varint carries more bits than its declared width.
    #[error("malformed varint")]
    VarintOverflow,

    /// A header or value breaks a protocol rule.
    #[error("invalid value")]
    InvalidValue,

    /// The token batch of the DOM iterator is full; drain and retry.
    #[error("token buffer is too small")]
    BufferTooSmall,

    /// The DOM iterator work stack is blown; not retriable.
    #[error("work queue capacity exceeded")]
    CapacityOverflow,
}

impl ThriftError {
    pub fn code(&self) -> i64 {
        match self {
            ThriftError::BufferOverflow => THRIFT_ERROR_BASE - 0x01,
            ThriftError::VarintOverflow => THRIFT_ERROR_BASE - 0x02,
            ThriftError::InvalidValue => THRIFT_ERROR_BASE - 0x03,
            ThriftError::BufferTooSmall => THRIFT_ERROR_BASE - 0x04,
            ThriftError::CapacityOverflow => THRIFT_ERROR_BASE - 0x05,
        }
    }
}

/// Thrift Compact Protocol element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompactType {
    Stop = 0,
    BoolTrue = 1,
    BoolFalse = 2,
    I8 = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
    Uuid = 13,
}

impl TryFrom<u8> for CompactType {
    type Error = ThriftError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompactType::Stop),
            1 => Ok(CompactType::BoolTrue),
            2 => Ok(CompactType::BoolFalse),
            3 => Ok(CompactType::I8),
            4 => Ok(CompactType::I16),
            5 => Ok(CompactType::I32),
            6 => Ok(CompactType::I64),
            7 => Ok(CompactType::Double),
            8 => Ok(CompactType::Binary),
            9 => Ok(CompactType::List),
            10 => Ok(CompactType::Set),
            11 => Ok(CompactType::Map),
            12 => Ok(CompactType::Struct),
            13 => Ok(CompactType::Uuid),
            _ => Err(ThriftError::InvalidValue),
        }
    }
}

impl CompactType {
    pub fn name(self) -> &'static str {
        match self {
            CompactType::Stop => "stop",
            CompactType::BoolTrue | CompactType::BoolFalse => "bool",
            CompactType::I8 => "i8",
            CompactType::I16 => "i16",
            CompactType::I32 => "i32",
            CompactType::I64 => "i64",
            CompactType::Double => "double",
            CompactType::Binary => "binary",
            CompactType::List => "list",
            CompactType::Set => "set",
            CompactType::Map => "map",
            CompactType::Struct => "struct",
            CompactType::Uuid => "uuid",
        }
    }
}

/// Header of one struct field: the resolved field id and the value type.
/// `Stop` terminates the struct with a field id of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructHeader {
    pub field_id: u16,
    pub field_type: CompactType,
}

/// Header of a list: element count and element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub size: u32,
    pub element_type: CompactType,
}
