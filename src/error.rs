use thiserror::Error;

use crate::dom::DomError;
use crate::format::FormatError;
use crate::mem::arena::ArenaError;
use crate::mem::pool::PoolError;
use crate::parquet::ParquetError;
use crate::thrift::ThriftError;

/// First error code; everything above it is reserved for the OS.
pub const ERROR_BASE: i64 = -256;

/// Number of codes reserved per domain.
pub const ERROR_BLOCK_SIZE: i64 = 16;

pub const THRIFT_ERROR_BASE: i64 = ERROR_BASE - 0 * ERROR_BLOCK_SIZE;
pub const MALLOC_ERROR_BASE: i64 = ERROR_BASE - 1 * ERROR_BLOCK_SIZE;
pub const PARQUET_ERROR_BASE: i64 = ERROR_BASE - 2 * ERROR_BLOCK_SIZE;
pub const DOM_ERROR_BASE: i64 = ERROR_BASE - 3 * ERROR_BLOCK_SIZE;
pub const FORMAT_ERROR_BASE: i64 = ERROR_BASE - 4 * ERROR_BLOCK_SIZE;
pub const ARENA_ERROR_BASE: i64 = ERROR_BASE - 5 * ERROR_BLOCK_SIZE;
pub const ARGV_ERROR_BASE: i64 = ERROR_BASE - 6 * ERROR_BLOCK_SIZE;

const ERROR_BASE_MIN: i64 = ARGV_ERROR_BASE - ERROR_BLOCK_SIZE;

const DOMAIN_NAMES: [&str; 7] = [
    "thrift", "malloc", "parquet", "dom", "format", "arena", "argv",
];

/// Maps an encoded error code to its domain name, or `"unknown"` for
/// anything outside the reserved range (OS errors included).
pub fn domain(code: i64) -> &'static str {
    if code > ERROR_BASE || code <= ERROR_BASE_MIN {
        return "unknown";
    }

    DOMAIN_NAMES[((ERROR_BASE - code) / ERROR_BLOCK_SIZE) as usize]
}

/// Extracts the offset within the domain block, or 0 outside the range.
pub fn offset(code: i64) -> i64 {
    if code > ERROR_BASE || code <= ERROR_BASE_MIN {
        return 0;
    }

    (-code) % ERROR_BLOCK_SIZE
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Thrift error: {0}")]
    Thrift(#[from] ThriftError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The encoded code carried across the CLI boundary and decoded by the
    /// `%r` directive. IO errors have no domain block and map to -1.
    pub fn code(&self) -> i64 {
        match self {
            Error::Thrift(err) => err.code(),
            Error::Pool(err) => err.code(),
            Error::Parquet(err) => err.code(),
            Error::Dom(err) => err.code(),
            Error::Format(err) => err.code(),
            Error::Arena(err) => err.code(),
            Error::Io(_) => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_thrift_code_to_domain() {
        assert_eq!(domain(THRIFT_ERROR_BASE - 0x05), "thrift");
    }

    #[test]
    fn converts_thrift_code_to_offset() {
        assert_eq!(offset(THRIFT_ERROR_BASE - 0x05), 0x05);
    }

    #[test]
    fn converts_parquet_code() {
        assert_eq!(domain(PARQUET_ERROR_BASE - 0x04), "parquet");
        assert_eq!(offset(PARQUET_ERROR_BASE - 0x04), 0x04);
    }

    #[test]
    fn detects_system_error() {
        assert_eq!(domain(-1), "unknown");
        assert_eq!(offset(-1), 0);
    }

    #[test]
    fn detects_unknown_error() {
        assert_eq!(domain(-9999), "unknown");
    }
}
