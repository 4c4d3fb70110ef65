//! Inputs that report how many bytes have been consumed from disk
//!
//! Progress is measured against the on-disk size of each input, so the counter
//! sits between the file and any decompression layer: for a compressed input
//! the position advances through the compressed bytes, just like the length.

use std::fs::File;
use std::io::{self, BufRead, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ReadError, Result};

/// Default read buffer size, shared by the record parsers
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Inputs shorter than this are never handed to the compression sniffer
const MIN_SNIFF_LEN: u64 = 5;

/// A reader that adds every byte it yields to a shared counter
pub struct CountingReader<R: Read> {
    inner: R,
    consumed: Arc<AtomicU64>,
}
impl<R: Read> CountingReader<R> {
    pub fn new(inner: R, consumed: Arc<AtomicU64>) -> Self {
        Self { inner, consumed }
    }
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// An opened input stream together with its size and position counter
pub struct TrackedInput {
    pub reader: Box<dyn Read + Send>,
    pub length: u64,
    pub consumed: Arc<AtomicU64>,
}
impl TrackedInput {
    /// Opens `path`, transparently decompressing it if needed
    pub fn open(path: &Path) -> Result<Self> {
        let cannot_open = |source| ReadError::CannotOpen {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(cannot_open)?;
        let length = file.metadata().map_err(cannot_open)?.len();
        let consumed = Arc::new(AtomicU64::new(0));
        let counting = CountingReader::new(file, consumed.clone());

        let inner: Box<dyn Read + Send> = if length >= MIN_SNIFF_LEN {
            let (reader, _compression) = niffler::send::get_reader(Box::new(counting))?;
            reader
        } else {
            Box::new(counting)
        };

        Ok(Self {
            reader: inner,
            length,
            consumed,
        })
    }
}

/// Reads one SAM line into `buf` without its line terminator
///
/// Returns `false` once the stream is exhausted.
pub fn read_trimmed_line<R: BufRead + ?Sized>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(true)
}
