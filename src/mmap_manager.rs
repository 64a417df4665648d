//! Append-only chunked buffer backing the compiler's in-flight sparse array
//! and value-store bytes (spec §4.3).
//!
//! Grounded on `keyvi/include/keyvi/dictionary/fsa/internal/memory_map_manager.h`:
//! chunk files are created lazily under a temporary directory, and random
//! access either returns a direct slice (single-chunk span) or falls back to
//! a copy across at most two chunks.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

struct Chunk {
    file: File,
    data: Vec<u8>,
}

/// Append-only buffer chunked across temporary files.
///
/// Each chunk is `chunk_size` bytes; `append` and `push_back` extend the
/// logical tail, spanning chunk boundaries transparently. After [`persist`]
/// chunks are written out in order and the last chunk is truncated to its
/// logical length.
pub struct MemoryMapManager {
    chunk_size: usize,
    directory: PathBuf,
    filename_pattern: String,
    chunks: Vec<Chunk>,
    tail: usize,
}

impl MemoryMapManager {
    pub fn new(chunk_size: usize, directory: impl Into<PathBuf>, filename_pattern: impl Into<String>) -> Self {
        Self {
            chunk_size,
            directory: directory.into(),
            filename_pattern: filename_pattern.into(),
            chunks: Vec::new(),
            tail: 0,
        }
    }

    /// Current logical length of the buffer.
    pub fn tail(&self) -> usize {
        self.tail
    }

    fn chunk_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}.{}", self.filename_pattern, index))
    }

    fn ensure_chunk(&mut self, index: usize) -> Result<()> {
        while self.chunks.len() <= index {
            let n = self.chunks.len();
            let path = self.chunk_path(n);
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            self.chunks.push(Chunk {
                file,
                data: vec![0u8; self.chunk_size],
            });
        }
        Ok(())
    }

    /// Append `bytes` at the current tail, spanning chunks as needed.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_at(self.tail, bytes)?;
        self.tail += bytes.len();
        Ok(())
    }

    /// Single-byte append hot path.
    pub fn push_back(&mut self, byte: u8) -> Result<()> {
        self.append(&[byte])
    }

    fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut remaining = bytes;
        let mut pos = offset;
        while !remaining.is_empty() {
            let chunk_index = pos / self.chunk_size;
            let chunk_offset = pos % self.chunk_size;
            self.ensure_chunk(chunk_index)?;
            let span = (self.chunk_size - chunk_offset).min(remaining.len());
            self.chunks[chunk_index].data[chunk_offset..chunk_offset + span].copy_from_slice(&remaining[..span]);
            remaining = &remaining[span..];
            pos += span;
        }
        Ok(())
    }

    /// Write arbitrary bytes at an already-written offset (for patch-up writes,
    /// e.g. fixing up an earlier placeholder). Does not move the tail if
    /// `offset + bytes.len() <= tail()`.
    pub fn write_at_offset(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.write_at(offset, bytes)?;
        self.tail = self.tail.max(offset + bytes.len());
        Ok(())
    }

    /// Quick test: is `[offset, offset+length)` entirely within one chunk?
    pub fn get_address_quick_test_ok(&self, offset: usize, length: usize) -> bool {
        let chunk_offset = offset % self.chunk_size;
        length <= self.chunk_size - chunk_offset
    }

    /// Direct slice into a single chunk. Caller must have checked
    /// [`get_address_quick_test_ok`] first.
    pub fn get_address(&self, offset: usize, length: usize) -> &[u8] {
        let chunk_index = offset / self.chunk_size;
        let chunk_offset = offset % self.chunk_size;
        &self.chunks[chunk_index].data[chunk_offset..chunk_offset + length]
    }

    /// Random-access read that copies across at most two chunks.
    pub fn get_buffer(&self, offset: usize, out: &mut [u8]) {
        let length = out.len();
        if self.get_address_quick_test_ok(offset, length) {
            out.copy_from_slice(self.get_address(offset, length));
            return;
        }
        let chunk_index = offset / self.chunk_size;
        let chunk_offset = offset % self.chunk_size;
        let first_len = self.chunk_size - chunk_offset;
        out[..first_len].copy_from_slice(&self.chunks[chunk_index].data[chunk_offset..]);
        out[first_len..].copy_from_slice(&self.chunks[chunk_index + 1].data[..length - first_len]);
    }

    /// Exact content equality starting at `offset`, crossing at most one boundary.
    pub fn compare(&self, offset: usize, bytes: &[u8]) -> bool {
        if self.get_address_quick_test_ok(offset, bytes.len()) {
            return self.get_address(offset, bytes.len()) == bytes;
        }
        let mut buf = vec![0u8; bytes.len()];
        self.get_buffer(offset, &mut buf);
        buf == bytes
    }

    /// Flush all chunks in order to `stream`, writing only up to `end` bytes total.
    pub fn write(&self, stream: &mut impl Write, end: usize) -> Result<()> {
        let mut written = 0usize;
        for chunk in &self.chunks {
            if written >= end {
                break;
            }
            let take = (end - written).min(self.chunk_size);
            stream.write_all(&chunk.data[..take])?;
            written += take;
        }
        Ok(())
    }

    /// Persist chunk files to disk, truncating the last chunk to its logical
    /// tail. After this call chunks are read back from their files rather
    /// than from the in-memory buffer.
    pub fn persist(&mut self) -> Result<()> {
        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            let logical_len = if (i + 1) * self.chunk_size <= self.tail {
                self.chunk_size
            } else {
                self.tail.saturating_sub(i * self.chunk_size)
            };
            chunk.file.seek(SeekFrom::Start(0))?;
            chunk.file.write_all(&chunk.data[..logical_len])?;
            chunk.file.set_len(logical_len as u64)?;
            chunk.file.flush()?;
        }
        Ok(())
    }

    /// Directory used for temporary chunk files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for MemoryMapManager {
    fn drop(&mut self) {
        for index in 0..self.chunks.len() {
            let _ = std::fs::remove_file(self.chunk_path(index));
        }
    }
}

/// Read a chunk file back from disk (used by tests / after `persist`).
pub fn read_chunk_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
