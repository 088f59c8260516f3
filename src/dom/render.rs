//! Renders DOM token batches as an indented `name-start`/`name-end` text
//! tree. Rendering is resumable: when the output buffer fills mid-token,
//! the formatter cursor is kept and the same token continues on the next
//! call after the caller drained the buffer.

use super::{DomError, Token, Value};
use crate::format::{Arg, Format, FormatCursor, FormatError, OutBuf};

/// State applied to the writer once a token rendered completely.
#[derive(Debug, Clone, Copy)]
struct Effect {
    indent_delta: i64,
    inline: bool,
}

const NEUTRAL: Effect = Effect {
    indent_delta: 0,
    inline: false,
};

#[derive(Default)]
pub struct DomWriter {
    indent: u64,
    // true while the cursor sits after a key or value opening on the
    // current line
    inline: bool,
    resume: Option<FormatCursor>,
}

impl DomWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders tokens until the slice or the buffer is exhausted. Returns
    /// the number of fully rendered tokens; fewer than `tokens.len()`
    /// means the buffer filled and the caller should drain it and call
    /// again with the remaining tokens.
    pub fn write<'t>(
        &mut self,
        tokens: &[Token<'t>],
        out: &mut OutBuf,
    ) -> Result<usize, DomError> {
        for (index, token) in tokens.iter().enumerate() {
            let closes = matches!(token, Token::StructEnd(_) | Token::ArrayEnd);

            if closes && self.indent == 0 {
                return Err(DomError::InvalidType);
            }

            match self.render(token, out) {
                Ok(()) => {}
                Err(FormatError::BufferTooSmall) => return Ok(index),
            }
        }

        Ok(tokens.len())
    }

    fn render(&mut self, token: &Token<'_>, out: &mut OutBuf) -> Result<(), FormatError> {
        let indent = self.indent;
        let below = indent.saturating_sub(1);

        let (fmt, args, effect): (&str, [Arg<'_>; 2], Effect) = match *token {
            Token::StructStart(name) => (
                "%i%s-start\n",
                [Arg::Uint(indent), Arg::Text(name)],
                Effect {
                    indent_delta: 1,
                    inline: false,
                },
            ),
            Token::StructEnd(name) => (
                "%i%s-end\n",
                [Arg::Uint(below), Arg::Text(name)],
                Effect {
                    indent_delta: -1,
                    inline: false,
                },
            ),
            Token::ArrayStart => {
                let fmt = if self.inline {
                    "array-start\n"
                } else {
                    "%iarray-start\n"
                };

                (
                    fmt,
                    [Arg::Uint(indent), Arg::Uint(0)],
                    Effect {
                        indent_delta: 1,
                        inline: false,
                    },
                )
            }
            Token::ArrayEnd => (
                "%iarray-end",
                [Arg::Uint(below), Arg::Uint(0)],
                Effect {
                    indent_delta: -1,
                    inline: true,
                },
            ),
            Token::KeyStart(_) => (
                "%i",
                [Arg::Uint(indent), Arg::Uint(0)],
                Effect {
                    indent_delta: 0,
                    inline: true,
                },
            ),
            Token::KeyEnd => (
                ": ",
                [Arg::Uint(0), Arg::Uint(0)],
                Effect {
                    indent_delta: 0,
                    inline: true,
                },
            ),
            Token::ValueStart(_) => (
                "",
                [Arg::Uint(0), Arg::Uint(0)],
                Effect {
                    indent_delta: 0,
                    inline: true,
                },
            ),
            Token::ValueEnd => ("\n", [Arg::Uint(0), Arg::Uint(0)], NEUTRAL),
            // index markers delimit array elements without visual output
            Token::IndexStart(_) => ("", [Arg::Uint(0), Arg::Uint(0)], NEUTRAL),
            Token::IndexEnd => ("", [Arg::Uint(0), Arg::Uint(0)], NEUTRAL),
            Token::Literal(value) => {
                let (fmt, arg) = match value {
                    Value::I32(value) => {
                        if self.inline {
                            ("%d", Arg::Int(i64::from(value)))
                        } else {
                            ("%i%d\n", Arg::Int(i64::from(value)))
                        }
                    }
                    Value::I64(value) => {
                        if self.inline {
                            ("%d", Arg::Int(value))
                        } else {
                            ("%i%d\n", Arg::Int(value))
                        }
                    }
                    Value::Text(text) => {
                        if self.inline {
                            ("%s", Arg::Text(text))
                        } else {
                            ("%i%s\n", Arg::Text(text))
                        }
                    }
                    Value::Bytes(bytes) => {
                        if self.inline {
                            ("%a", Arg::Bytes(bytes))
                        } else {
                            ("%i%a\n", Arg::Bytes(bytes))
                        }
                    }
                };

                if self.inline {
                    (fmt, [arg, Arg::Uint(0)], self.keep_inline())
                } else {
                    (fmt, [Arg::Uint(indent), arg], NEUTRAL)
                }
            }
        };

        let cursor = self.resume.take().unwrap_or_default();
        let mut format = Format::resume(fmt, &args, cursor);

        match format.write(out) {
            Ok(()) => {
                self.indent = apply_indent(self.indent, effect.indent_delta);
                self.inline = effect.inline;
                Ok(())
            }
            Err(err) => {
                self.resume = Some(format.cursor());
                Err(err)
            }
        }
    }

    fn keep_inline(&self) -> Effect {
        Effect {
            indent_delta: 0,
            inline: true,
        }
    }
}

fn apply_indent(indent: u64, delta: i64) -> u64 {
    if delta < 0 {
        indent.saturating_sub(delta.unsigned_abs())
    } else {
        indent + delta as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tokens: &[Token<'_>]) -> String {
        let mut writer = DomWriter::new();
        let mut out = OutBuf::with_capacity(4096);

        let consumed = writer.write(tokens, &mut out).unwrap();
        assert_eq!(consumed, tokens.len());

        String::from_utf8(out.as_slice().to_vec()).unwrap()
    }

    #[test]
    fn renders_empty_struct() {
        let text = render(&[Token::StructStart("metadata"), Token::StructEnd("metadata")]);
        assert_eq!(text, "metadata-start\nmetadata-end\n");
    }

    #[test]
    fn renders_scalar_field() {
        let text = render(&[
            Token::StructStart("metadata"),
            Token::KeyStart("text"),
            Token::Literal(Value::Text("version")),
            Token::KeyEnd,
            Token::ValueStart("i32"),
            Token::Literal(Value::I32(1)),
            Token::ValueEnd,
            Token::StructEnd("metadata"),
        ]);

        assert_eq!(text, "metadata-start\n version: 1\nmetadata-end\n");
    }

    #[test]
    fn renders_empty_array_value() {
        let text = render(&[
            Token::StructStart("metadata"),
            Token::KeyStart("text"),
            Token::Literal(Value::Text("schemas")),
            Token::KeyEnd,
            Token::ValueStart("struct"),
            Token::ArrayStart,
            Token::ArrayEnd,
            Token::ValueEnd,
            Token::StructEnd("metadata"),
        ]);

        assert_eq!(
            text,
            "metadata-start\n schemas: array-start\n array-end\nmetadata-end\n"
        );
    }

    #[test]
    fn renders_array_of_primitives() {
        let text = render(&[
            Token::KeyStart("text"),
            Token::Literal(Value::Text("encodings")),
            Token::KeyEnd,
            Token::ValueStart("i32"),
            Token::ArrayStart,
            Token::IndexStart("i32"),
            Token::Literal(Value::Text("PLAIN")),
            Token::IndexEnd,
            Token::IndexStart("i32"),
            Token::Literal(Value::I32(99)),
            Token::IndexEnd,
            Token::ArrayEnd,
            Token::ValueEnd,
        ]);

        assert_eq!(text, "encodings: array-start\n PLAIN\n 99\narray-end\n");
    }

    #[test]
    fn renders_escaped_bytes() {
        let text = render(&[
            Token::KeyStart("text"),
            Token::Literal(Value::Text("blob")),
            Token::KeyEnd,
            Token::ValueStart("binary"),
            Token::Literal(Value::Bytes(&[b'o', b'k', 0x01])),
            Token::ValueEnd,
        ]);

        assert_eq!(text, "blob: ok.\n");
    }

    #[test]
    fn rejects_close_without_open() {
        let mut writer = DomWriter::new();
        let mut out = OutBuf::with_capacity(64);

        assert_eq!(
            writer.write(&[Token::ArrayEnd], &mut out).unwrap_err(),
            DomError::InvalidType
        );
    }

    #[test]
    fn resumes_mid_token() {
        let tokens = [
            Token::StructStart("metadata"),
            Token::StructEnd("metadata"),
        ];

        let mut writer = DomWriter::new();
        let mut out = OutBuf::with_capacity(10);

        // first token does not fit; nothing consumed beyond it
        let consumed = writer.write(&tokens, &mut out).unwrap();
        assert_eq!(consumed, 0);
        assert_eq!(out.as_slice(), b"metadata-s");

        out.clear();
        let consumed = writer.write(&tokens, &mut out).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(out.as_slice(), b"tart\nmetad");

        out.clear();
        let consumed = writer.write(&tokens[1..], &mut out).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(out.as_slice(), b"ata-end\n");
    }
}
