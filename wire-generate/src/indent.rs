// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Result, Write};

/// Writer that prefixes every non-empty line with the current indentation.
/// Emitted Rust uses four-space indents throughout.
pub struct IndentedWriter<T> {
    out: T,
    indentation: usize,
    at_beginning_of_line: bool,
}

impl<T> IndentedWriter<T> {
    pub fn new(out: T) -> Self {
        Self {
            out,
            indentation: 0,
            at_beginning_of_line: true,
        }
    }

    pub fn indent(&mut self) {
        self.indentation += 4;
    }

    pub fn unindent(&mut self) {
        self.indentation = self.indentation.saturating_sub(4);
    }
}

impl<T: Write> Write for IndentedWriter<T> {
    fn write(&mut self, mut buf: &[u8]) -> Result<usize> {
        let mut bytes_written = 0;

        while !buf.is_empty() {
            let (before_newline, has_newline, after_newline) =
                if let Some(idx) = buf.iter().position(|&b| b == b'\n') {
                    (&buf[..idx], true, &buf[idx + 1..])
                } else {
                    (buf, false, &buf[buf.len()..])
                };

            if self.at_beginning_of_line && !before_newline.is_empty() {
                for _ in 0..self.indentation {
                    self.out.write_all(b" ")?;
                }
                self.at_beginning_of_line = false;
            }

            self.out.write_all(before_newline)?;
            bytes_written += before_newline.len();

            if has_newline {
                self.out.write_all(b"\n")?;
                bytes_written += 1;
                self.at_beginning_of_line = true;
            }

            buf = after_newline;
        }

        Ok(bytes_written)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() -> Result<()> {
        let mut buffer: Vec<u8> = Vec::new();

        let mut out = IndentedWriter::new(&mut buffer);

        writeln!(out, "pub mod a {{")?;
        out.indent();
        writeln!(out, "pub fn b() {{")?;
        out.indent();
        writeln!(out, "c();")?;
        writeln!(out)?;
        out.unindent();
        writeln!(out, "}}")?;
        out.unindent();
        writeln!(out, "}}")?;

        let expect: &[u8] = b"\
pub mod a {
    pub fn b() {
        c();

    }
}
";
        assert_eq!(buffer, expect);

        Ok(())
    }
}
