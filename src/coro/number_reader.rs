//! Streaming whitespace-separated base-10 integer reader.

use std::fs::File;
use std::io::{self, Read};

const CHUNK_SIZE: usize = 4096;

/// Reads one base-10 integer at a time out of a file, skipping runs of
/// whitespace, and re-filling its internal page-sized buffer as needed --
/// including when a token straddles a chunk boundary.
pub struct FileNumberReader {
    file: File,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    eof: bool,
}

impl FileNumberReader {
    pub fn new(file: File) -> FileNumberReader {
        FileNumberReader {
            file,
            buf: vec![0u8; CHUNK_SIZE],
            pos: 0,
            len: 0,
            eof: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }

        let left = self.len - self.pos;
        self.buf.copy_within(self.pos..self.len, 0);
        self.pos = 0;
        self.len = left;

        let n = self.file.read(&mut self.buf[left..])?;
        if n == 0 {
            self.eof = true;
        }
        self.len += n;
        Ok(())
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.pos >= self.len {
            self.refill()?;
            if self.pos >= self.len {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos]))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Read the next whitespace-delimited base-10 integer, or `None` at EOF.
    pub fn next_number(&mut self) -> io::Result<Option<i32>> {
        // Skip whitespace, refilling across chunk boundaries as needed.
        loop {
            match self.peek()? {
                Some(b) if b.is_ascii_whitespace() => self.advance(),
                _ => break,
            }
        }

        let mut saw_digit = false;
        let mut negative = false;
        let mut value: i64 = 0;

        if let Some(b'-') = self.peek()? {
            negative = true;
            self.advance();
        }

        loop {
            match self.peek()? {
                Some(b) if b.is_ascii_digit() => {
                    saw_digit = true;
                    value = value * 10 + (b - b'0') as i64;
                    self.advance();
                }
                _ => break,
            }
        }

        if !saw_digit {
            return Ok(None);
        }

        let value = if negative { -value } else { value };
        Ok(Some(value as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};

    fn reader_over(contents: &str) -> FileNumberReader {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        FileNumberReader::new(f)
    }

    #[test]
    fn reads_simple_sequence() {
        let mut r = reader_over("3 1 2\n");
        assert_eq!(r.next_number().unwrap(), Some(3));
        assert_eq!(r.next_number().unwrap(), Some(1));
        assert_eq!(r.next_number().unwrap(), Some(2));
        assert_eq!(r.next_number().unwrap(), None);
    }

    #[test]
    fn handles_negative_numbers() {
        let mut r = reader_over("-5 6");
        assert_eq!(r.next_number().unwrap(), Some(-5));
        assert_eq!(r.next_number().unwrap(), Some(6));
    }

    #[test]
    fn spans_chunk_boundary() {
        // Build a token that straddles the internal 4096-byte chunk size.
        let mut s = " ".repeat(CHUNK_SIZE - 2);
        s.push_str("123");
        let mut r = reader_over(&s);
        assert_eq!(r.next_number().unwrap(), Some(123));
        assert_eq!(r.next_number().unwrap(), None);
    }

    #[test]
    fn empty_file_yields_none() {
        let mut r = reader_over("");
        assert_eq!(r.next_number().unwrap(), None);
    }
}
