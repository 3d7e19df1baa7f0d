use std::io::{BufRead, Read};

use crate::error::FeedError;
use crate::transport::FeedConnection;

/// Newline-delimited JSON over any blocking reader.
///
/// Пустые строки (keep-alive провайдера) пропускаются, `\r` в конце
/// строки обрезается. EOF означает штатное закрытие потока.
pub struct JsonLinesConnection<R> {
    reader: R,
    /// Максимальная длина строки в байтах (0 = без ограничения).
    max_length: usize,
    line: Vec<u8>,
}

impl<R: BufRead + Send> JsonLinesConnection<R> {
    pub fn new(reader: R, max_length: usize) -> Self {
        Self {
            reader,
            max_length,
            line: Vec::with_capacity(8192),
        }
    }

    /// Read one raw line into `self.line`. Never buffers more than
    /// `max_length` plus the `\r\n` terminator.
    fn read_raw_line(&mut self) -> Result<usize, FeedError> {
        self.line.clear();
        if self.max_length == 0 {
            return Ok(self.reader.read_until(b'\n', &mut self.line)?);
        }

        let limit = self.max_length as u64 + 2;
        let n = self.reader.by_ref().take(limit).read_until(b'\n', &mut self.line)?;
        if n as u64 == limit && self.line.last() != Some(&b'\n') {
            return Err(self.too_long(n));
        }
        Ok(n)
    }

    fn too_long(&self, len: usize) -> FeedError {
        FeedError::format_err(format!("line too long: {len}+ bytes (max {})", self.max_length))
    }
}

impl<R: BufRead + Send> FeedConnection for JsonLinesConnection<R> {
    fn next_event(&mut self) -> Result<Option<serde_json::Value>, FeedError> {
        loop {
            if self.read_raw_line()? == 0 {
                return Ok(None);
            }

            let line = std::str::from_utf8(&self.line)
                .map_err(|e| FeedError::format_err(format!("line is not UTF-8: {e}")))?
                .trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }

            if self.max_length > 0 && line.len() > self.max_length {
                return Err(self.too_long(line.len()));
            }

            let value = serde_json::from_str(line)?;
            return Ok(Some(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn skips_keep_alive_lines() {
        let data = "\r\n{\"id_str\":\"1\"}\r\n\n   \n{\"id_str\":\"2\"}\n";
        let mut conn = JsonLinesConnection::new(Cursor::new(data), 0);

        let first = conn.next_event().unwrap().unwrap();
        assert_eq!(first["id_str"], "1");
        let second = conn.next_event().unwrap().unwrap();
        assert_eq!(second["id_str"], "2");
        assert!(conn.next_event().unwrap().is_none());
    }

    #[test]
    fn last_line_without_newline_is_delivered() {
        let mut conn = JsonLinesConnection::new(Cursor::new("{\"a\":1}"), 0);
        assert_eq!(conn.next_event().unwrap().unwrap()["a"], 1);
        assert!(conn.next_event().unwrap().is_none());
    }

    #[test]
    fn garbage_is_format_error() {
        let mut conn = JsonLinesConnection::new(Cursor::new("Exceeded connection limit\n"), 0);
        let err = conn.next_event().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    /// Reader that yields `remaining` bytes of `x` and never a newline;
    /// fails the test if the connection reads past the limit.
    struct Endless {
        remaining: usize,
    }

    impl std::io::Read for Endless {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            assert!(self.remaining > 0, "read past the line limit");
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'x');
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn stops_reading_an_unterminated_line_at_the_limit() {
        let reader = std::io::BufReader::with_capacity(4, Endless { remaining: 64 });
        let mut conn = JsonLinesConnection::new(reader, 16);
        let err = conn.next_event().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().contains("line too long"));
        assert!(conn.line.len() <= 18);
    }

    #[test]
    fn line_of_exactly_max_length_is_accepted() {
        let mut conn = JsonLinesConnection::new(Cursor::new("{\"a\":12}\r\n"), 8);
        assert_eq!(conn.next_event().unwrap().unwrap()["a"], 12);
    }

    #[test]
    fn invalid_utf8_is_format_error() {
        let mut conn = JsonLinesConnection::new(Cursor::new(&b"{\"a\":\"\xff\"}\n"[..]), 0);
        let err = conn.next_event().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn enforces_max_length() {
        let mut conn = JsonLinesConnection::new(Cursor::new("{\"text\":\"0123456789\"}\n"), 8);
        let err = conn.next_event().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().contains("line too long"));
    }
}
