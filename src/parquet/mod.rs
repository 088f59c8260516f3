pub mod footer;
pub mod iter;
pub mod metadata;
pub mod parse;
pub mod schema;

pub use footer::ParquetFile;
pub use iter::MetadataIter;
pub use metadata::Metadata;
pub use schema::{materialize, SchemaNode, SchemaWriter};

use thiserror::Error;

use crate::error::PARQUET_ERROR_BASE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParquetError {
    /// A field carries a Thrift type other than the one its id declares.
    #[error("unexpected field type")]
    InvalidType,

    /// A semantic rule is violated, e.g. a negative count.
    #[error("invalid field value")]
    InvalidValue,

    /// The file is not a Parquet file or its footer is broken.
    #[error("invalid parquet file")]
    InvalidFile,

    /// The token batch is full; drain it and retry.
    #[error("token buffer is too small")]
    BufferTooSmall,

    /// The iterator work queue is blown; not retriable.
    #[error("work queue capacity exceeded")]
    CapacityOverflow,
}

impl ParquetError {
    pub fn code(&self) -> i64 {
        match self {
            ParquetError::InvalidType => PARQUET_ERROR_BASE - 0x02,
            ParquetError::InvalidValue => PARQUET_ERROR_BASE - 0x03,
            ParquetError::InvalidFile => PARQUET_ERROR_BASE - 0x04,
            ParquetError::BufferTooSmall => PARQUET_ERROR_BASE - 0x05,
            ParquetError::CapacityOverflow => PARQUET_ERROR_BASE - 0x06,
        }
    }
}
