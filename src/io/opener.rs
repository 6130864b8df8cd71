//! Opening input files as byte streams.
//!
//! Every reader a source acquires goes through a [`StreamOpener`]. The
//! returned stream is owned by exactly one caller and closed when dropped, so a
//! partition read releases its handle whether it finishes, fails or is
//! abandoned part way through.

use crate::io::compression::{auto_detect_reader, detect_codec};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// An owned, decoded input stream.
pub type ByteStream = Box<dyn Read + Send>;

/// Source of byte streams for input files.
pub trait StreamOpener: Send + Sync {
    /// Open `path` from the beginning, decoding any compression.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its codec fails to
    /// initialize.
    fn open(&self, path: &Path) -> Result<ByteStream>;

    /// Open `path` positioned at raw byte `offset`.
    ///
    /// The default implementation opens from the start and discards
    /// `offset` bytes, which only equals a raw offset for a plain file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is shorter than needed
    /// to reach the offset, or is encoded and `offset` is not zero.
    fn open_at(&self, path: &Path, offset: u64) -> Result<ByteStream> {
        if offset > 0 && self.is_encoded(path)? {
            anyhow::bail!("cannot seek to byte {offset} in compressed file {}", path.display());
        }
        let mut stream = self.open(path)?;
        if offset > 0 {
            io::copy(&mut stream.by_ref().take(offset), &mut io::sink())
                .with_context(|| format!("skip to byte {offset} in {}", path.display()))?;
        }
        Ok(stream)
    }

    /// Whether [`open`](Self::open) decodes `path`, in which case raw byte
    /// offsets do not address its lines.
    ///
    /// # Errors
    /// Returns an error if the head of the file cannot be read.
    fn is_encoded(&self, path: &Path) -> Result<bool> {
        Ok(detect_codec(path)?.is_some())
    }

    /// Size of `path` in raw bytes.
    ///
    /// # Errors
    /// Returns an error if the file metadata cannot be read.
    fn file_len(&self, path: &Path) -> Result<u64> {
        let meta =
            std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        Ok(meta.len())
    }
}

/// Opens files from the local filesystem with transparent decompression.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl StreamOpener for FileOpener {
    fn open(&self, path: &Path) -> Result<ByteStream> {
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        auto_detect_reader(f, path)
            .with_context(|| format!("setup decompression for {}", path.display()))
    }

    fn open_at(&self, path: &Path, offset: u64) -> Result<ByteStream> {
        if offset == 0 {
            return self.open(path);
        }
        // Offsets address raw bytes; a compressed stream cannot be entered mid-way.
        if let Some(codec) = detect_codec(path)? {
            anyhow::bail!(
                "cannot seek to byte {offset} in {} compressed file {}",
                codec.name(),
                path.display()
            );
        }
        let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        f.seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek to byte {offset} in {}", path.display()))?;
        Ok(Box::new(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Implements only `open`, so `open_at` and `is_encoded` use the defaults.
    struct OpenOnly;

    impl StreamOpener for OpenOnly {
        fn open(&self, path: &Path) -> Result<ByteStream> {
            FileOpener.open(path)
        }
    }

    fn read_all(mut stream: ByteStream) -> Result<String> {
        let mut out = String::new();
        stream.read_to_string(&mut out)?;
        Ok(out)
    }

    #[test]
    fn offsets_address_raw_bytes_of_plain_files() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("plain.jsonl");
        fs::write(&path, "{\"a\":1}\n{\"a\":2}\n")?;

        assert_eq!(read_all(FileOpener.open_at(&path, 8)?)?, "{\"a\":2}\n");
        assert_eq!(read_all(OpenOnly.open_at(&path, 8)?)?, "{\"a\":2}\n");
        assert!(!OpenOnly.is_encoded(&path)?);
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn offsets_into_sniffed_gzip_are_refused() -> Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let tmp = tempfile::tempdir()?;
        // No compression extension: only the magic bytes give it away.
        let path = tmp.path().join("data.jsonl");
        let mut enc = GzEncoder::new(fs::File::create(&path)?, Compression::default());
        enc.write_all(b"{\"a\":1}\n{\"a\":2}\n")?;
        enc.finish()?;

        assert!(FileOpener.is_encoded(&path)?);
        assert!(FileOpener.open_at(&path, 4).is_err());
        assert!(OpenOnly.open_at(&path, 4).is_err());
        assert_eq!(read_all(FileOpener.open_at(&path, 0)?)?, "{\"a\":1}\n{\"a\":2}\n");
        Ok(())
    }
}
