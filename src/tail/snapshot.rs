use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;

/// One decoded line plus the byte range it occupies in the file
/// (delimiter included when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub start: u64,
    pub end: u64,
    pub text: String,
    /// False for an in-progress final line with no delimiter yet.
    pub terminated: bool,
}

/// The trailing lines of one file at a point in time. Immutable once
/// built; the caller advances the target offset after consuming it.
#[derive(Debug, Default)]
pub struct LineWindow {
    pub lines: Vec<LineRecord>,
    /// First byte not covered by the window (end-of-file at read time).
    pub end_offset: u64,
    /// The window's bytes exactly as stored in the file.
    pub raw: Bytes,
}

/// Read forward from `offset` to end-of-file, splitting on `delimiter`.
///
/// A trailing segment without a final delimiter is an in-progress line:
/// it is part of the window but flagged unterminated, and follow mode
/// later continues it from `end_offset` without re-emitting.
pub fn read_window<R: Read + Seek>(
    file: &mut R,
    offset: u64,
    delimiter: u8,
) -> io::Result<LineWindow> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(split_window(buf, offset, delimiter))
}

fn split_window(buf: Vec<u8>, offset: u64, delimiter: u8) -> LineWindow {
    let mut lines = Vec::new();
    let mut start = 0usize;
    for (i, &b) in buf.iter().enumerate() {
        if b == delimiter {
            lines.push(LineRecord {
                start: offset + start as u64,
                end: offset + i as u64 + 1,
                text: String::from_utf8_lossy(&buf[start..i]).into_owned(),
                terminated: true,
            });
            start = i + 1;
        }
    }
    if start < buf.len() {
        lines.push(LineRecord {
            start: offset + start as u64,
            end: offset + buf.len() as u64,
            text: String::from_utf8_lossy(&buf[start..]).into_owned(),
            terminated: false,
        });
    }

    let end_offset = offset + buf.len() as u64;
    LineWindow {
        lines,
        end_offset,
        raw: Bytes::from(buf),
    }
}

/// Forward-only variant for FIFOs and other non-seekable inputs: reads to
/// end-of-stream keeping only the last `n` lines, so memory is bounded by
/// the line count rather than the stream length.
pub fn read_stream_window<R: Read>(input: &mut R, n: u64, delimiter: u8) -> io::Result<LineWindow> {
    let mut kept: VecDeque<Vec<u8>> = VecDeque::new();
    let mut partial: Vec<u8> = Vec::new();
    let mut total: u64 = 0;

    let mut chunk = vec![0u8; super::CHUNK_SIZE];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total += read as u64;
        for &b in &chunk[..read] {
            partial.push(b);
            if b == delimiter {
                kept.push_back(std::mem::take(&mut partial));
                if kept.len() as u64 > n {
                    kept.pop_front();
                }
            }
        }
    }
    if !partial.is_empty() {
        kept.push_back(partial);
        if kept.len() as u64 > n {
            kept.pop_front();
        }
    }
    if n == 0 {
        kept.clear();
    }

    let raw: Vec<u8> = kept.iter().flat_map(|line| line.iter().copied()).collect();
    let window_start = total - raw.len() as u64;
    Ok(split_window(raw, window_start, delimiter))
}

/// Byte-count variant for non-seekable inputs: the last `count` bytes of
/// the stream, kept in a rolling buffer.
pub fn read_stream_bytes<R: Read>(input: &mut R, count: u64, delimiter: u8) -> io::Result<LineWindow> {
    let mut kept: VecDeque<u8> = VecDeque::new();
    let mut total: u64 = 0;

    let mut chunk = vec![0u8; super::CHUNK_SIZE];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total += read as u64;
        kept.extend(chunk[..read].iter().copied());
        while kept.len() as u64 > count {
            kept.pop_front();
        }
    }

    let raw: Vec<u8> = kept.into_iter().collect();
    let window_start = total - raw.len() as u64;
    Ok(split_window(raw, window_start, delimiter))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_window_splits_lines_with_ranges() {
        let mut cur = Cursor::new(&b"a\nb\nc\n"[..]);
        let window = read_window(&mut cur, 2, b'\n').unwrap();
        assert_eq!(window.end_offset, 6);
        assert_eq!(&window.raw[..], b"b\nc\n");
        assert_eq!(window.lines.len(), 2);
        assert_eq!(window.lines[0].text, "b");
        assert_eq!(window.lines[0].start, 2);
        assert_eq!(window.lines[0].end, 4);
        assert!(window.lines[1].terminated);
    }

    #[test]
    fn test_window_partial_trailing_line() {
        let mut cur = Cursor::new(&b"a\npartial"[..]);
        let window = read_window(&mut cur, 0, b'\n').unwrap();
        assert_eq!(window.lines.len(), 2);
        assert_eq!(window.lines[1].text, "partial");
        assert!(!window.lines[1].terminated);
        assert_eq!(window.end_offset, 9);
    }

    #[test]
    fn test_window_at_eof_is_empty() {
        let mut cur = Cursor::new(&b"a\nb\n"[..]);
        let window = read_window(&mut cur, 4, b'\n').unwrap();
        assert!(window.lines.is_empty());
        assert_eq!(window.end_offset, 4);
    }

    #[test]
    fn test_stream_window_keeps_last_lines() {
        let mut cur = Cursor::new(&b"a\nb\nc\nd\n"[..]);
        let window = read_stream_window(&mut cur, 2, b'\n').unwrap();
        assert_eq!(&window.raw[..], b"c\nd\n");
        assert_eq!(window.end_offset, 8);
        assert_eq!(window.lines[0].start, 4);
    }

    #[test]
    fn test_stream_window_whole_input_when_short() {
        let mut cur = Cursor::new(&b"a\nb"[..]);
        let window = read_stream_window(&mut cur, 10, b'\n').unwrap();
        assert_eq!(&window.raw[..], b"a\nb");
        assert!(!window.lines[1].terminated);
    }

    #[test]
    fn test_stream_window_n_zero() {
        let mut cur = Cursor::new(&b"a\nb\n"[..]);
        let window = read_stream_window(&mut cur, 0, b'\n').unwrap();
        assert!(window.raw.is_empty());
        assert!(window.lines.is_empty());
    }

    #[test]
    fn test_stream_bytes_rolling_tail() {
        let mut cur = Cursor::new(&b"abcdefgh"[..]);
        let window = read_stream_bytes(&mut cur, 3, b'\n').unwrap();
        assert_eq!(&window.raw[..], b"fgh");
        assert_eq!(window.end_offset, 8);
    }
}
