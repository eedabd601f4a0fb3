use std::io::{self, Write};
use std::path::Path;

/// Single writer for everything that reaches stdout.
///
/// Tracks which file the previous block came from so a `==> path <==`
/// header is printed only when the source changes, and flushes after
/// every block so follow mode output appears immediately.
pub struct OutputWriter<W: Write> {
    out: W,
    headers: bool,
    last_index: Option<usize>,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(out: W, headers: bool) -> Self {
        Self {
            out,
            headers,
            last_index: None,
        }
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one block of content from the file at `index`.
    pub fn write_block(&mut self, index: usize, path: &Path, data: &[u8]) -> io::Result<()> {
        if self.headers && self.last_index != Some(index) {
            // first header flush against the top, later ones get a blank line
            if self.last_index.is_some() {
                self.out.write_all(b"\n")?;
            }
            writeln!(self.out, "==> {} <==", path.display())?;
        }
        self.last_index = Some(index);
        self.out.write_all(data)?;
        self.out.flush()
    }
}
