pub mod cli;
pub mod dom;
pub mod error;
pub mod format;
pub mod mem;
pub mod parquet;
pub mod show;
pub mod thrift;

pub use error::{Error, Result};
pub use parquet::{Metadata, ParquetFile};
