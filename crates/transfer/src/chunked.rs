use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::{CHUNK_SIZE, TransferError};

/// Reads a source in fixed-size chunks through a single reusable buffer.
///
/// Every chunk except the last is exactly `chunk_size` bytes; short reads
/// from the underlying source are accumulated before a chunk is returned.
pub struct ChunkReader<R = File> {
    reader: R,
    buf: Vec<u8>,
    offset: u64,
}

impl ChunkReader<File> {
    /// Opens `path` for chunked reading.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        Ok(Self::new(file, chunk_size))
    }
}

impl<R: Read> ChunkReader<R> {
    /// Wraps `reader`. If `chunk_size` is 0, [`CHUNK_SIZE`] is used.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            reader,
            buf: vec![0u8; chunk_size],
            offset: 0,
        }
    }

    /// Reads the next chunk. Returns `None` at EOF.
    ///
    /// On error, bytes read into the current chunk so far are discarded.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>, TransferError> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        self.offset += filled as u64;
        Ok(Some(&self.buf[..filled]))
    }

    /// Bytes returned so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }
}
