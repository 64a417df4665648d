//! Pluggable compression strategies for value-store records (spec §4.9).
//!
//! Grounded on `keyvi/include/keyvi/compression/compression_strategy.h` and
//! `zstd_compression_strategy.h`: a small strategy trait selected either by
//! name (the `compression` config key) or by the one-byte tag that prefixes
//! every value-store record on disk.

use crate::error::{Error, Result};

/// The compression-algorithm byte that prefixes every value-store record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    None = 0,
    Zlib = 1,
    Snappy = 2,
    Zstd = 3,
}

impl CompressionAlgorithm {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            2 => Ok(Self::Snappy),
            3 => Ok(Self::Zstd),
            other => Err(Error::invalid_argument(format!(
                "unknown compression algorithm byte {other}"
            ))),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
        }
    }
}

/// A compression strategy. Implementations are stateless and thread-safe.
pub trait Compressor: Send + Sync {
    fn algorithm(&self) -> CompressionAlgorithm;
    fn compress(&self, data: &[u8]) -> Vec<u8>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::None
    }
    fn compress(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

pub struct ZlibCompressor {
    pub level: u32,
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Compressor for ZlibCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Zlib
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data).expect("in-memory write cannot fail");
        encoder.finish().expect("in-memory finish cannot fail")
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::malformed(format!("zlib decompression failed: {e}")))?;
        Ok(out)
    }
}

pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Snappy
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new()
            .compress_vec(data)
            .expect("snappy compression of in-memory buffer cannot fail")
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Error::malformed(format!("snappy decompression failed: {e}")))
    }
}

pub struct ZstdCompressor {
    pub level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl Compressor for ZstdCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Zstd
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        zstd::stream::encode_all(data, self.level).expect("in-memory zstd encode cannot fail")
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::decode_all(data).map_err(|e| Error::malformed(format!("zstd decompression failed: {e}")))
    }
}

/// Resolve the `compression` configuration key to a strategy.
pub fn by_name(name: &str) -> Result<Box<dyn Compressor>> {
    match name {
        "none" => Ok(Box::new(NoneCompressor)),
        "zlib" => Ok(Box::new(ZlibCompressor::default())),
        "snappy" => Ok(Box::new(SnappyCompressor)),
        "zstd" => Ok(Box::new(ZstdCompressor::default())),
        other => Err(Error::invalid_argument(format!("unknown compression name '{other}'"))),
    }
}

/// Resolve the on-disk algorithm byte to a strategy, for decode.
pub fn by_algorithm(algorithm: CompressionAlgorithm) -> Box<dyn Compressor> {
    match algorithm {
        CompressionAlgorithm::None => Box::new(NoneCompressor),
        CompressionAlgorithm::Zlib => Box::new(ZlibCompressor::default()),
        CompressionAlgorithm::Snappy => Box::new(SnappyCompressor),
        CompressionAlgorithm::Zstd => Box::new(ZstdCompressor::default()),
    }
}
