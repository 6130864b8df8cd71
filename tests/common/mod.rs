//! Shared fixtures for integration tests.
#![allow(dead_code)]

use anyhow::Result;
use ironbeam_json::io::opener::{ByteStream, FileOpener, StreamOpener};
use ironbeam_json::{FilePartition, JsonDataSource, JsonOptions, Row, Schema};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Route library logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

pub fn whole(path: &Path) -> Result<FilePartition> {
    Ok(FilePartition::whole_file(path, std::fs::metadata(path)?.len()))
}

/// Infer with `opts` and read every given partition in order.
pub fn infer_and_read(
    files: &[PathBuf],
    parts: &[FilePartition],
    opts: &JsonOptions,
) -> Result<(Schema, Vec<Row>)> {
    let source = JsonDataSource::for_options(opts);
    let schema = source
        .infer_schema(files, opts)?
        .expect("at least one input file");
    let schema_arc = Arc::new(schema.clone());
    let mut rows = Vec::new();
    for p in parts {
        for row in source.read_partition(p, Arc::clone(&schema_arc), opts)? {
            rows.push(row?);
        }
    }
    Ok((schema, rows))
}

/// Opener that counts how many streams were opened and closed.
#[derive(Default, Clone)]
pub struct CountingOpener {
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl CountingOpener {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn track(&self, inner: ByteStream) -> ByteStream {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(Tracked {
            inner,
            closed: Arc::clone(&self.closed),
        })
    }
}

impl StreamOpener for CountingOpener {
    fn open(&self, path: &Path) -> Result<ByteStream> {
        Ok(self.track(FileOpener.open(path)?))
    }

    fn open_at(&self, path: &Path, offset: u64) -> Result<ByteStream> {
        Ok(self.track(FileOpener.open_at(path, offset)?))
    }
}

struct Tracked {
    inner: ByteStream,
    closed: Arc<AtomicUsize>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
