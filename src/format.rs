//! A tiny printf with a resumable buffer contract. Directives with a fixed
//! footprint (`%d`, `%x`, `%i`, `%r`) either complete or advance zero
//! bytes; unbounded ones (`%s`, `%a`, `%e`) make partial progress and
//! resume mid-argument on the next call.

use thiserror::Error;

use crate::error::{domain, offset, ERROR_BASE, FORMAT_ERROR_BASE};

const MARKER: u8 = b'%';
const ASCII_MIN: u8 = 0x20;
const ASCII_MAX: u8 = 0x7e;
const ASCII_FALLBACK: u8 = b'.';
const DECIMAL_MAX_LEN: usize = 20;
const HEX_LEN: usize = 18;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("output buffer is too small")]
    BufferTooSmall,
}

impl FormatError {
    pub fn code(&self) -> i64 {
        match self {
            FormatError::BufferTooSmall => FORMAT_ERROR_BASE - 0x01,
        }
    }
}

/// One substitution argument.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Text(&'a str),
    Int(i64),
    Uint(u64),
    Bytes(&'a [u8]),
}

/// Caller-owned output buffer with a hard capacity. The drive loops drain
/// it into the sink whenever a producer reports `BufferTooSmall`.
pub struct OutBuf {
    bytes: Vec<u8>,
    capacity: usize,
}

impl OutBuf {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= self.capacity {
            return false;
        }

        self.bytes.push(byte);
        true
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Resume point of a formatting run: position in the format string, index
/// of the next argument, and progress inside an unbounded directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatCursor {
    fmt_pos: usize,
    arg_pos: usize,
    partial: u64,
}

/// One formatting run over a format string and its argument vector.
pub struct Format<'a> {
    fmt: &'a [u8],
    args: &'a [Arg<'a>],
    cursor: FormatCursor,
}

impl<'a> Format<'a> {
    pub fn new(fmt: &'a str, args: &'a [Arg<'a>]) -> Self {
        Self::resume(fmt, args, FormatCursor::default())
    }

    /// Continues an interrupted run; `cursor` must come from the same
    /// format string and argument vector.
    pub fn resume(fmt: &'a str, args: &'a [Arg<'a>], cursor: FormatCursor) -> Self {
        Self {
            fmt: fmt.as_bytes(),
            args,
            cursor,
        }
    }

    pub fn cursor(&self) -> FormatCursor {
        self.cursor
    }

    fn arg(&self, index: usize) -> Option<Arg<'a>> {
        self.args.get(self.cursor.arg_pos + index).copied()
    }

    /// Renders until the format string is exhausted or the buffer fills.
    /// On `BufferTooSmall` the cursor stays at the directive (or inside
    /// the long run) that could not complete; drain the buffer and call
    /// again.
    pub fn write(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        while self.cursor.fmt_pos < self.fmt.len() {
            let byte = self.fmt[self.cursor.fmt_pos];

            if byte != MARKER {
                if !out.push(byte) {
                    return Err(FormatError::BufferTooSmall);
                }

                self.cursor.fmt_pos += 1;
                continue;
            }

            match self.fmt.get(self.cursor.fmt_pos + 1).copied() {
                Some(b's') => self.substitute_string(out)?,
                Some(b'd') => self.substitute_decimal(out)?,
                Some(b'x') => self.substitute_hex(out)?,
                Some(b'i') => self.substitute_indent(out)?,
                Some(b'a') => self.substitute_ascii(out)?,
                Some(b'e') => self.substitute_endless(out)?,
                Some(b'r') => self.substitute_result(out)?,
                Some(MARKER) => {
                    if !out.push(MARKER) {
                        return Err(FormatError::BufferTooSmall);
                    }

                    self.cursor.fmt_pos += 2;
                }
                Some(other) => {
                    if out.remaining() < 2 {
                        return Err(FormatError::BufferTooSmall);
                    }

                    out.push(MARKER);
                    out.push(other);
                    self.cursor.fmt_pos += 2;
                }
                None => {
                    // a trailing marker is emitted verbatim
                    if !out.push(MARKER) {
                        return Err(FormatError::BufferTooSmall);
                    }

                    self.cursor.fmt_pos += 1;
                }
            }
        }

        Ok(())
    }

    fn take_text(&self, index: usize) -> &'a str {
        match self.arg(index) {
            Some(Arg::Text(text)) => text,
            _ => "",
        }
    }

    fn take_int(&self, index: usize) -> i64 {
        match self.arg(index) {
            Some(Arg::Int(value)) => value,
            Some(Arg::Uint(value)) => value as i64,
            _ => 0,
        }
    }

    fn take_uint(&self, index: usize) -> u64 {
        match self.arg(index) {
            Some(Arg::Uint(value)) => value,
            Some(Arg::Int(value)) => value as u64,
            _ => 0,
        }
    }

    fn finish_directive(&mut self, consumed_args: usize) {
        self.cursor.fmt_pos += 2;
        self.cursor.arg_pos += consumed_args;
        self.cursor.partial = 0;
    }

    fn substitute_string(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let text = self.take_text(0).as_bytes();

        while (self.cursor.partial as usize) < text.len() {
            if !out.push(text[self.cursor.partial as usize]) {
                return Err(FormatError::BufferTooSmall);
            }

            self.cursor.partial += 1;
        }

        self.finish_directive(1);
        Ok(())
    }

    fn substitute_ascii(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let bytes = match self.arg(0) {
            Some(Arg::Bytes(bytes)) => bytes,
            Some(Arg::Text(text)) => text.as_bytes(),
            _ => &[],
        };

        while (self.cursor.partial as usize) < bytes.len() {
            let byte = bytes[self.cursor.partial as usize];
            let printable = (ASCII_MIN..=ASCII_MAX).contains(&byte);

            if !out.push(if printable { byte } else { ASCII_FALLBACK }) {
                return Err(FormatError::BufferTooSmall);
            }

            self.cursor.partial += 1;
        }

        self.finish_directive(1);
        Ok(())
    }

    fn substitute_endless(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let text = self.take_text(0).as_bytes();
        let count = self.take_uint(1);

        // whole repetitions only; resumes at the repetition that did not fit
        while self.cursor.partial < count {
            if out.remaining() < text.len() {
                return Err(FormatError::BufferTooSmall);
            }

            for &byte in text {
                out.push(byte);
            }

            self.cursor.partial += 1;
        }

        self.finish_directive(2);
        Ok(())
    }

    fn substitute_decimal(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let rendered = render_decimal(self.take_int(0));

        if out.remaining() < rendered.len() {
            return Err(FormatError::BufferTooSmall);
        }

        for &byte in rendered.as_bytes() {
            out.push(byte);
        }

        self.finish_directive(1);
        Ok(())
    }

    fn substitute_hex(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        const ALPHABET: &[u8; 16] = b"0123456789abcdef";
        let value = self.take_uint(0);

        if out.remaining() < HEX_LEN {
            return Err(FormatError::BufferTooSmall);
        }

        out.push(b'0');
        out.push(b'x');

        for index in (0..16).rev() {
            out.push(ALPHABET[((value >> (index * 4)) & 0x0f) as usize]);
        }

        self.finish_directive(1);
        Ok(())
    }

    fn substitute_indent(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let count = self.take_uint(0);

        if (out.remaining() as u64) < count {
            return Err(FormatError::BufferTooSmall);
        }

        for _ in 0..count {
            out.push(b' ');
        }

        self.finish_directive(1);
        Ok(())
    }

    fn substitute_result(&mut self, out: &mut OutBuf) -> Result<(), FormatError> {
        let code = self.take_int(0);
        let name = domain(code);

        if code <= ERROR_BASE && name != "unknown" {
            let rendered = render_decimal(offset(code));

            if out.remaining() < name.len() + 1 + rendered.len() {
                return Err(FormatError::BufferTooSmall);
            }

            for &byte in name.as_bytes() {
                out.push(byte);
            }
            out.push(b'#');
            for &byte in rendered.as_bytes() {
                out.push(byte);
            }
        } else {
            let rendered = render_decimal(code);

            if out.remaining() < rendered.len() {
                return Err(FormatError::BufferTooSmall);
            }

            for &byte in rendered.as_bytes() {
                out.push(byte);
            }
        }

        self.finish_directive(1);
        Ok(())
    }
}

fn render_decimal(value: i64) -> String {
    let mut digits = [0u8; DECIMAL_MAX_LEN];
    let mut index = 0;
    // negate into unsigned space so i64::MIN does not overflow
    let mut magnitude = value.unsigned_abs();

    while magnitude > 0 {
        digits[index] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        index += 1;
    }

    if index == 0 {
        digits[index] = b'0';
        index += 1;
    }

    let mut rendered = String::with_capacity(index + 1);

    if value < 0 {
        rendered.push('-');
    }

    while index > 0 {
        index -= 1;
        rendered.push(digits[index] as char);
    }

    rendered
}

/// One-shot formatting; the whole result must fit in `out`.
pub fn format_into(out: &mut OutBuf, fmt: &str, args: &[Arg<'_>]) -> Result<(), FormatError> {
    Format::new(fmt, args).write(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::THRIFT_ERROR_BASE;

    fn render(capacity: usize, fmt: &str, args: &[Arg<'_>]) -> String {
        let mut out = OutBuf::with_capacity(capacity);
        format_into(&mut out, fmt, args).unwrap();
        String::from_utf8(out.as_slice().to_vec()).unwrap()
    }

    #[test]
    fn formats_without_substitutions() {
        assert_eq!(render(30, "Hello, World!", &[]), "Hello, World!");
    }

    #[test]
    fn formats_string_substitution() {
        assert_eq!(
            render(30, "Hello, %s!", &[Arg::Text("World")]),
            "Hello, World!"
        );
    }

    #[test]
    fn formats_hex_substitution() {
        assert_eq!(
            render(30, "Value: %x", &[Arg::Uint(0x1234abcd01020304)]),
            "Value: 0x1234abcd01020304"
        );
    }

    #[test]
    fn formats_decimal_substitutions() {
        assert_eq!(
            render(32, "Value: %d", &[Arg::Int(123456789)]),
            "Value: 123456789"
        );
        assert_eq!(
            render(32, "Value: %d", &[Arg::Int(-123456789)]),
            "Value: -123456789"
        );
        assert_eq!(render(32, "Value: %d", &[Arg::Int(0)]), "Value: 0");
        assert_eq!(
            render(32, "Value: %d", &[Arg::Int(i64::MIN)]),
            "Value: -9223372036854775808"
        );
    }

    #[test]
    fn formats_indent() {
        assert_eq!(render(16, "%ix", &[Arg::Uint(3)]), "   x");
    }

    #[test]
    fn formats_ascii_with_fallback() {
        assert_eq!(
            render(16, "%a", &[Arg::Bytes(&[b'a', 0x00, b'b', 0x7f])]),
            "a.b."
        );
    }

    #[test]
    fn formats_endless_repeats() {
        assert_eq!(
            render(32, "%e%s", &[Arg::Text(" |  "), Arg::Uint(2), Arg::Text("leaf")]),
            " |   |  leaf"
        );
    }

    #[test]
    fn formats_marker_escape() {
        assert_eq!(render(16, "50%% done%%", &[]), "50% done%");
    }

    #[test]
    fn formats_unknown_directive_verbatim() {
        assert_eq!(render(16, "a %q b", &[]), "a %q b");
    }

    #[test]
    fn formats_trailing_marker() {
        assert_eq!(render(16, "done%", &[]), "done%");
    }

    #[test]
    fn formats_known_error_code() {
        assert_eq!(
            render(32, "error=%r", &[Arg::Int(THRIFT_ERROR_BASE - 0x05)]),
            "error=thrift#5"
        );
    }

    #[test]
    fn formats_unknown_error_code_as_decimal() {
        assert_eq!(render(32, "error=%r", &[Arg::Int(-1)]), "error=-1");
        assert_eq!(render(32, "error=%r", &[Arg::Int(42)]), "error=42");
    }

    #[test]
    fn resumes_plain_text() {
        let mut out = OutBuf::with_capacity(14);
        let mut format = Format::new("This is a very long string.", &[]);

        assert_eq!(
            format.write(&mut out).unwrap_err(),
            FormatError::BufferTooSmall
        );
        assert_eq!(out.as_slice(), b"This is a very");

        out.clear();
        format.write(&mut out).unwrap();
        assert_eq!(out.as_slice(), b" long string.");
    }

    #[test]
    fn resumes_string_substitution() {
        let args = [Arg::Text("very long string")];
        let mut out = OutBuf::with_capacity(14);
        let mut format = Format::new("Value: %s", &args);

        // first call fills the buffer mid-argument
        assert_eq!(
            format.write(&mut out).unwrap_err(),
            FormatError::BufferTooSmall
        );
        assert_eq!(out.as_slice(), b"Value: very lo");

        // the drained buffer continues exactly where the argument stopped
        out.clear();
        format.write(&mut out).unwrap();
        assert_eq!(out.as_slice(), b"ng string");
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn resumes_hex_substitution_whole() {
        let args = [Arg::Uint(0x1234abcd01020304)];
        let mut out = OutBuf::with_capacity(20);
        let mut format = Format::new("Value: %x", &args);

        assert_eq!(
            format.write(&mut out).unwrap_err(),
            FormatError::BufferTooSmall
        );
        // fixed-footprint directives advance zero bytes on overflow
        assert_eq!(out.as_slice(), b"Value: ");

        out.clear();
        format.write(&mut out).unwrap();
        assert_eq!(out.as_slice(), b"0x1234abcd01020304");
    }

    #[test]
    fn resumes_across_two_arguments() {
        let args = [Arg::Text("ABCDEFGH"), Arg::Text("12345678")];
        let mut out = OutBuf::with_capacity(10);
        let mut format = Format::new("%s-%s", &args);

        assert_eq!(
            format.write(&mut out).unwrap_err(),
            FormatError::BufferTooSmall
        );
        assert_eq!(out.as_slice(), b"ABCDEFGH-1");

        out.clear();
        format.write(&mut out).unwrap();
        assert_eq!(out.as_slice(), b"2345678");
    }

    #[test]
    fn resumes_endless_by_repetition() {
        let args = [Arg::Text("abcd"), Arg::Uint(3)];
        let mut out = OutBuf::with_capacity(10);
        let mut format = Format::new("%e", &args);

        assert_eq!(
            format.write(&mut out).unwrap_err(),
            FormatError::BufferTooSmall
        );
        assert_eq!(out.as_slice(), b"abcdabcd");

        out.clear();
        format.write(&mut out).unwrap();
        assert_eq!(out.as_slice(), b"abcd");
    }
}
