use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::FingerprintError;

/// One fixed-size piece of a file.
#[derive(Debug, Clone)]
pub struct FileChunk {
    /// Zero-based part index, in file order.
    pub index: usize,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data. Only the last chunk may be shorter than the
    /// configured chunk size.
    pub data: Vec<u8>,
}

/// Reads a file in fixed-size chunks, in order.
///
/// This is the single chunking authority for the whole pipeline: the
/// fingerprinter hashes the chunks it yields, and the multipart uploader
/// sends them one per signed URL. Both therefore split files identically.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: u64,
    offset: u64,
    next_index: usize,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// Fails with [`FingerprintError::Config`] if `chunk_size` is zero.
    pub fn new(path: &Path, chunk_size: u64) -> Result<Self, FingerprintError> {
        if chunk_size == 0 {
            return Err(wsync_protocol::ConfigError::ZeroChunkSize.into());
        }
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            next_index: 0,
            file_size,
        })
    }

    /// Seeks to the given byte offset. The offset must be chunk-aligned
    /// for part indices to stay meaningful.
    pub fn seek_to(&mut self, offset: u64) -> Result<(), FingerprintError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        self.next_index = (offset / self.chunk_size) as usize;
        Ok(())
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<FileChunk>, FingerprintError> {
        if self.offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        let read_size = remaining.min(self.chunk_size) as usize;
        let mut buf = vec![0u8; read_size];
        let n = self.file.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);

        let chunk = FileChunk {
            index: self.next_index,
            offset: self.offset,
            data: buf,
        };
        self.offset += n as u64;
        self.next_index += 1;
        Ok(Some(chunk))
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size - self.offset
    }
}
