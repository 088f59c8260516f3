//! Public-surface tests for the formatter and the DOM renderer driving
//! each other through tight buffers.

use parqlens::dom::{DomWriter, Token, Value};
use parqlens::format::{Arg, Format, FormatError, OutBuf};

#[test]
fn formatter_resumes_through_a_tight_buffer() {
    let args = [
        Arg::Text("schemas"),
        Arg::Int(12),
        Arg::Uint(0xdeadbeef),
    ];

    let mut format = Format::new("%s has %d entries at %x", &args);
    let mut out = OutBuf::with_capacity(8);
    let mut rendered = Vec::new();

    for _ in 0..16 {
        match format.write(&mut out) {
            Ok(()) => {
                rendered.extend_from_slice(out.as_slice());
                break;
            }
            Err(FormatError::BufferTooSmall) => {
                rendered.extend_from_slice(out.as_slice());
                out.clear();
            }
        }
    }

    // %x needs 18 bytes and can never fit an 8-byte buffer
    assert_eq!(
        String::from_utf8(rendered).unwrap(),
        "schemas has 12 entries at "
    );
}

#[test]
fn formatter_completes_with_roomy_buffer() {
    let args = [
        Arg::Text("schemas"),
        Arg::Int(12),
        Arg::Uint(0xdeadbeef),
    ];

    let mut out = OutBuf::with_capacity(64);
    Format::new("%s has %d entries at %x", &args)
        .write(&mut out)
        .unwrap();

    assert_eq!(
        std::str::from_utf8(out.as_slice()).unwrap(),
        "schemas has 12 entries at 0x00000000deadbeef"
    );
}

#[test]
fn renderer_output_is_identical_across_buffer_sizes() {
    let tokens = [
        Token::StructStart("metadata"),
        Token::KeyStart("text"),
        Token::Literal(Value::Text("created_by")),
        Token::KeyEnd,
        Token::ValueStart("text"),
        Token::Literal(Value::Text("integration tests")),
        Token::ValueEnd,
        Token::KeyStart("text"),
        Token::Literal(Value::Text("num_rows")),
        Token::KeyEnd,
        Token::ValueStart("i64"),
        Token::Literal(Value::I64(1234567890123)),
        Token::ValueEnd,
        Token::StructEnd("metadata"),
    ];

    let mut reference = Vec::new();

    for capacity in [16usize, 64, 4096] {
        let mut writer = DomWriter::new();
        let mut out = OutBuf::with_capacity(capacity);
        let mut rendered = Vec::new();
        let mut consumed = 0;

        while consumed < tokens.len() {
            consumed += writer.write(&tokens[consumed..], &mut out).unwrap();
            rendered.extend_from_slice(out.as_slice());
            out.clear();
        }

        if reference.is_empty() {
            reference = rendered;
        } else {
            assert_eq!(rendered, reference, "capacity {capacity} diverged");
        }
    }

    assert_eq!(
        String::from_utf8(reference).unwrap(),
        "metadata-start\n created_by: integration tests\n num_rows: 1234567890123\nmetadata-end\n"
    );
}
