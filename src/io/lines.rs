//! Line reading over a byte-range partition.
//!
//! A partition owns every line whose first byte lies in `[start, end]`. A
//! partition that does not begin at byte 0 skips its first, possibly partial,
//! line, which the previous partition reads past its own end. Any contiguous
//! set of windows therefore yields every line exactly once.

use crate::error::JsonSourceError;
use crate::io::opener::{ByteStream, StreamOpener};
use crate::partition::FilePartition;
use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// Lazy iterator over the text lines of one partition.
///
/// Line terminators (`\n` or `\r\n`) are stripped. The underlying stream is
/// released as soon as the iterator is exhausted, hits an error, or is dropped.
pub struct LineReader {
    reader: Option<BufReader<ByteStream>>,
    path: PathBuf,
    pos: u64,
    /// `None` reads to end of stream.
    end: Option<u64>,
    buf: Vec<u8>,
}

impl LineReader {
    /// Open the lines of `partition`.
    ///
    /// Whole-file partitions read to end of stream, which is the only correct
    /// bound for decoded (compressed) input.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or positioned, or
    /// [`JsonSourceError::UnsplittablePartition`] for a partial window of an
    /// encoded file.
    pub fn open(opener: &dyn StreamOpener, partition: &FilePartition) -> Result<Self> {
        let path = partition.path.clone();
        if partition.is_whole_file() {
            let stream = opener.open(&path)?;
            return Ok(Self::from_stream(stream, path));
        }
        // Decoded offsets never line up with the raw window.
        if opener.is_encoded(&path)? {
            return Err(JsonSourceError::UnsplittablePartition {
                path,
                start: partition.start,
                length: partition.length,
            }
            .into());
        }

        let stream = opener.open_at(&path, partition.start)?;
        let mut reader = Self {
            reader: Some(BufReader::new(stream)),
            path,
            pos: partition.start,
            end: Some(partition.end()),
            buf: Vec::new(),
        };
        if partition.start > 0 {
            reader.skip_partial_line()?;
        }
        Ok(reader)
    }

    /// Read every line of an already opened stream.
    pub fn from_stream(stream: ByteStream, path: PathBuf) -> Self {
        Self {
            reader: Some(BufReader::new(stream)),
            path,
            pos: 0,
            end: None,
            buf: Vec::new(),
        }
    }

    fn skip_partial_line(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.as_mut() {
            let n = reader
                .read_until(b'\n', &mut self.buf)
                .with_context(|| format!("read {} at byte {}", self.path.display(), self.pos))?;
            self.pos += n as u64;
            self.buf.clear();
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::trace!(path = %self.path.display(), pos = self.pos, "line reader closed");
        }
    }
}

impl Iterator for LineReader {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some_and(|end| self.pos > end) {
            self.close();
            return None;
        }
        let reader = self.reader.as_mut()?;
        self.buf.clear();
        let n = match reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.close();
                return None;
            }
            Ok(n) => n,
            Err(e) => {
                let err = anyhow!(e)
                    .context(format!("read {} at byte {}", self.path.display(), self.pos));
                self.close();
                return Some(Err(err));
            }
        };
        let line_start = self.pos;
        self.pos += n as u64;

        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        match String::from_utf8(line) {
            Ok(s) => Some(Ok(s)),
            Err(e) => {
                let err = anyhow!(e).context(format!(
                    "invalid UTF-8 in {} at byte {line_start}",
                    self.path.display()
                ));
                self.close();
                Some(Err(err))
            }
        }
    }
}
