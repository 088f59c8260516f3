//! The in-memory metadata tree. Every field is optional; `None` means the
//! footer did not carry it. Enumeration-valued fields keep their raw i32
//! so values newer than the name tables still print as numbers.

use crate::mem::arena::Text;

/// Flat schema record. The list is DFS-ordered: the root comes first and
/// carries no repetition type, each node declares its child count, and
/// descendants follow contiguously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaElement {
    pub data_type: Option<i32>,
    pub type_length: Option<i32>,
    pub repetition_type: Option<i32>,
    pub name: Option<Text>,
    pub num_children: Option<i32>,
    pub converted_type: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageEncodingStats {
    pub page_type: Option<i32>,
    pub encoding: Option<i32>,
    pub count: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMeta {
    pub data_type: Option<i32>,
    pub encodings: Option<Vec<i32>>,
    pub path_in_schema: Option<Vec<Text>>,
    pub compression_codec: Option<i32>,
    pub num_values: Option<i64>,
    pub total_uncompressed_size: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub data_page_offset: Option<i64>,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub encoding_stats: Option<Vec<PageEncodingStats>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnChunk {
    pub file_path: Option<Text>,
    pub file_offset: Option<i64>,
    pub meta: Option<ColumnMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowGroup {
    pub columns: Option<Vec<ColumnChunk>>,
    pub total_byte_size: Option<i64>,
    pub num_rows: Option<i64>,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub version: Option<i32>,
    pub schemas: Option<Vec<SchemaElement>>,
    pub num_rows: Option<i64>,
    pub row_groups: Option<Vec<RowGroup>>,
    pub created_by: Option<Text>,
}

pub static DATA_TYPE_NAMES: &[&str] = &[
    "BOOLEAN",
    "INT32",
    "INT64",
    "INT96",
    "FLOAT",
    "DOUBLE",
    "BYTE_ARRAY",
    "FIXED_LEN_BYTE_ARRAY",
];

pub static REPETITION_TYPE_NAMES: &[&str] = &["REQUIRED", "OPTIONAL", "REPEATED"];

pub static CONVERTED_TYPE_NAMES: &[&str] = &[
    "UTF8",
    "MAP",
    "MAP_KEY_VALUE",
    "LIST",
    "ENUM",
    "DECIMAL",
    "DATE",
    "TIME_MILLIS",
    "TIME_MICROS",
    "TIMESTAMP_MILLIS",
    "TIMESTAMP_MICROS",
    "UINT8",
    "UINT16",
    "UINT32",
    "UINT64",
    "INT8",
    "INT16",
    "INT32",
    "INT64",
    "JSON",
    "BSON",
    "INTERVAL",
];

pub static ENCODING_NAMES: &[&str] = &[
    "PLAIN",
    "GROUP_VAR_INT",
    "PLAIN_DICTIONARY",
    "RLE",
    "BIT_PACKED",
    "DELTA_BINARY_PACKED",
    "DELTA_LENGTH_BYTE_ARRAY",
    "DELTA_BYTE_ARRAY",
    "RLE_DICTIONARY",
    "BYTE_STREAM_SPLIT",
];

pub static COMPRESSION_NAMES: &[&str] = &[
    "UNCOMPRESSED",
    "SNAPPY",
    "GZIP",
    "LZO",
    "BROTLI",
    "LZ4",
    "ZSTD",
    "LZ4_RAW",
];

pub static PAGE_TYPE_NAMES: &[&str] = &[
    "DATA_PAGE",
    "INDEX_PAGE",
    "DICTIONARY_PAGE",
    "DATA_PAGE_V2",
];

/// Name of an enumeration value, or `None` when the value is outside the
/// table.
pub fn enum_name(names: &'static [&'static str], value: i32) -> Option<&'static str> {
    usize::try_from(value).ok().and_then(|index| names.get(index).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_enum_values() {
        assert_eq!(enum_name(DATA_TYPE_NAMES, 1), Some("INT32"));
        assert_eq!(enum_name(COMPRESSION_NAMES, 1), Some("SNAPPY"));
        assert_eq!(enum_name(REPETITION_TYPE_NAMES, 2), Some("REPEATED"));
    }

    #[test]
    fn rejects_out_of_range_enum_values() {
        assert_eq!(enum_name(DATA_TYPE_NAMES, 8), None);
        assert_eq!(enum_name(DATA_TYPE_NAMES, -1), None);
    }
}
