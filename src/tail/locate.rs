use std::io::{self, Read, Seek, SeekFrom};

/// Block size for backward scanning and follow-mode reads (8KB)
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Find the byte offset at which the last `n` lines of `file` begin.
///
/// Seeks to end-of-file and reads fixed-size chunks backward, scanning
/// each chunk right-to-left for `delimiter`, so the cost is proportional
/// to the bytes actually needed rather than the file size. A delimiter as
/// the very last byte terminates the final line and does not start an
/// empty one. Returns 0 when the file holds fewer than `n` lines.
pub fn locate_lines<R: Read + Seek>(file: &mut R, n: u64, delimiter: u8) -> io::Result<u64> {
    let size = file.seek(SeekFrom::End(0))?;
    if n == 0 {
        return Ok(size);
    }
    if size == 0 {
        return Ok(0);
    }

    // A trailing delimiter closes the final line; skip it before counting.
    let mut scan_end = size;
    file.seek(SeekFrom::Start(size - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == delimiter {
        scan_end -= 1;
    }

    let mut remaining = n;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut pos = scan_end;

    while pos > 0 {
        let chunk_len = CHUNK_SIZE.min(pos as usize);
        let chunk_start = pos - chunk_len as u64;
        file.seek(SeekFrom::Start(chunk_start))?;
        let chunk = &mut buf[..chunk_len];
        file.read_exact(chunk)?;

        for i in (0..chunk_len).rev() {
            if chunk[i] == delimiter {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(chunk_start + i as u64 + 1);
                }
            }
        }
        pos = chunk_start;
    }

    Ok(0)
}

/// Byte-count variant (`-c`): the offset of the last `count` bytes.
pub fn locate_bytes<R: Seek>(file: &mut R, count: u64) -> io::Result<u64> {
    let size = file.seek(SeekFrom::End(0))?;
    Ok(size.saturating_sub(count))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Forward-scan reference: offset of the last `n` lines.
    fn locate_reference(data: &[u8], n: u64, delimiter: u8) -> u64 {
        if n == 0 {
            return data.len() as u64;
        }
        let mut starts = vec![0u64];
        for (i, &b) in data.iter().enumerate() {
            if b == delimiter && i + 1 < data.len() {
                starts.push(i as u64 + 1);
            }
        }
        if data.is_empty() {
            return 0;
        }
        let skip = starts.len().saturating_sub(n as usize);
        starts[skip]
    }

    #[test]
    fn test_locate_matches_reference() {
        let data = b"a\nb\nc\n";
        for n in 0..5 {
            let mut cur = Cursor::new(&data[..]);
            assert_eq!(
                locate_lines(&mut cur, n, b'\n').unwrap(),
                locate_reference(data, n, b'\n'),
                "n = {}",
                n
            );
        }
    }

    #[test]
    fn test_locate_last_two_lines() {
        let mut cur = Cursor::new(&b"a\nb\nc\n"[..]);
        let offset = locate_lines(&mut cur, 2, b'\n').unwrap();
        assert_eq!(offset, 2);
        assert_eq!(&cur.get_ref()[offset as usize..], b"b\nc\n");
    }

    #[test]
    fn test_locate_no_trailing_delimiter() {
        let mut cur = Cursor::new(&b"a\nb\nc"[..]);
        assert_eq!(locate_lines(&mut cur, 1, b'\n').unwrap(), 4);
        assert_eq!(locate_lines(&mut cur, 2, b'\n').unwrap(), 2);
    }

    #[test]
    fn test_locate_n_zero_is_eof() {
        let mut cur = Cursor::new(&b"a\nb\n"[..]);
        assert_eq!(locate_lines(&mut cur, 0, b'\n').unwrap(), 4);
    }

    #[test]
    fn test_locate_n_exceeds_line_count() {
        let mut cur = Cursor::new(&b"a\nb\nc\n"[..]);
        assert_eq!(locate_lines(&mut cur, 100, b'\n').unwrap(), 0);
    }

    #[test]
    fn test_locate_empty_file() {
        let mut cur = Cursor::new(&b""[..]);
        assert_eq!(locate_lines(&mut cur, 10, b'\n').unwrap(), 0);
    }

    #[test]
    fn test_locate_single_line_no_delimiter() {
        let mut cur = Cursor::new(&b"hello"[..]);
        assert_eq!(locate_lines(&mut cur, 1, b'\n').unwrap(), 0);
    }

    #[test]
    fn test_locate_delimiter_only() {
        // one empty line terminated by the delimiter
        let mut cur = Cursor::new(&b"\n"[..]);
        assert_eq!(locate_lines(&mut cur, 1, b'\n').unwrap(), 0);
    }

    #[test]
    fn test_locate_spans_multiple_chunks() {
        // lines long enough that the scan crosses several 8 KiB chunks
        let mut data = Vec::new();
        for i in 0..100 {
            data.extend_from_slice(format!("{:0>500}\n", i).as_bytes());
        }
        for n in [1, 5, 50, 99, 100, 101] {
            let mut cur = Cursor::new(&data[..]);
            assert_eq!(
                locate_lines(&mut cur, n, b'\n').unwrap(),
                locate_reference(&data, n, b'\n'),
                "n = {}",
                n
            );
        }
    }

    #[test]
    fn test_locate_delimiter_on_chunk_boundary() {
        let mut data = vec![b'x'; CHUNK_SIZE - 1];
        data.push(b'\n');
        data.extend_from_slice(b"tail");
        let mut cur = Cursor::new(&data[..]);
        assert_eq!(locate_lines(&mut cur, 1, b'\n').unwrap(), CHUNK_SIZE as u64);
    }

    #[test]
    fn test_locate_idempotent() {
        let data = b"one\ntwo\nthree\n";
        let mut cur = Cursor::new(&data[..]);
        let first = locate_lines(&mut cur, 2, b'\n').unwrap();
        let second = locate_lines(&mut cur, 2, b'\n').unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_locate_nul_delimited() {
        let mut cur = Cursor::new(&b"a\0b\0c\0"[..]);
        assert_eq!(locate_lines(&mut cur, 2, b'\0').unwrap(), 2);
    }

    #[test]
    fn test_locate_bytes_tail() {
        let mut cur = Cursor::new(&b"abcdef"[..]);
        assert_eq!(locate_bytes(&mut cur, 4).unwrap(), 2);
        assert_eq!(locate_bytes(&mut cur, 100).unwrap(), 0);
    }
}
