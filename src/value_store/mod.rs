//! Value stores: the payload half of a keyvi dictionary, keyed by the handle
//! (state value) an [`crate::compiler::FsaCompiler`] assigns a final state
//! (spec §4.4).
//!
//! Every concrete store (`key_only`, `int`, `string`, `json`,
//! `float_vector`) is grounded on the matching header under
//! `keyvi/include/keyvi/dictionary/fsa/internal/*_value_store.h`. `string`,
//! `json` and `float_vector` share the record-framing and
//! content-minimization machinery in [`RecordStore`]; `key_only` and `int`
//! are trivial enough that the handle itself carries the payload, matching
//! `int_value_store.h`'s own comment that "the value IS the handle".

pub mod float_vector;
pub mod int;
pub mod json;
pub mod key_only;
pub mod string;

use crate::compression::{self, Compressor};
use crate::error::{Error, Result};
use crate::minimization_hash::MinimizationHash;
use crate::varint;

/// One-byte tag persisted in the dictionary header identifying which
/// concrete value store a dictionary carries. The numbering is a stable
/// external wire format, not declaration order — byte 4 was the original
/// fsa value store and is kept reserved; a dictionary that claims it is
/// rejected on open rather than misread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueStoreType {
    KeyOnly = 1,
    Int = 2,
    String = 3,
    Json = 5,
    IntWeight = 6,
    FloatVector = 7,
}

impl ValueStoreType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Self::KeyOnly),
            2 => Ok(Self::Int),
            3 => Ok(Self::String),
            4 => Err(Error::invalid_argument("unknown/deprecated value store type".to_string())),
            5 => Ok(Self::Json),
            6 => Ok(Self::IntWeight),
            7 => Ok(Self::FloatVector),
            other => Err(Error::invalid_argument(format!("unknown value store type byte {other}"))),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::KeyOnly => "key_only",
            Self::Int => "int",
            Self::IntWeight => "int_weight",
            Self::String => "string",
            Self::Json => "json",
            Self::FloatVector => "float_vector",
        }
    }
}

/// Record framing shared by `string`/`json`/`float_vector`: a one-byte
/// compression-algorithm tag, a varint length of the (possibly compressed)
/// payload, then the payload bytes.
///
/// Below `compression_threshold` bytes the record is stored uncompressed
/// (tag `None`) regardless of the configured compressor, since the
/// compression header overhead would dominate tiny payloads.
pub struct RecordStore {
    buffer: Vec<u8>,
    minimization: Option<MinimizationHash>,
    compressor: Box<dyn Compressor>,
    compression_threshold: usize,
    values: u64,
    unique_values: u64,
}

impl RecordStore {
    pub fn new(compression_name: &str, compression_threshold: usize, minimize: bool, memory_limit: usize) -> Result<Self> {
        Ok(Self {
            buffer: Vec::new(),
            minimization: if minimize {
                Some(MinimizationHash::new((memory_limit / 64).max(1024), 8))
            } else {
                None
            },
            compressor: compression::by_name(compression_name)?,
            compression_threshold,
            values: 0,
            unique_values: 0,
        })
    }

    /// Append `payload`, deduplicating against previously stored records with
    /// identical framed bytes when minimization is enabled. Returns the
    /// handle (byte offset) to pass to [`decode_record`].
    pub fn add_record(&mut self, payload: &[u8]) -> u64 {
        let framed = frame_record(payload, self.compressor.as_ref(), self.compression_threshold);
        self.add_framed(framed)
    }

    /// Append an already-framed record (compression tag, length, body)
    /// verbatim, deduplicating it the same way [`add_record`] does. Used by
    /// the merger's minimize-merge path to copy a source dictionary's
    /// records without recompressing or reinterpreting them.
    pub fn add_record_verbatim(&mut self, framed: &[u8]) -> u64 {
        self.add_framed(framed.to_vec())
    }

    fn add_framed(&mut self, framed: Vec<u8>) -> u64 {
        self.values += 1;
        let hash_code = content_hash(&framed);

        if let Some(hash) = &self.minimization {
            if let Some(offset) = hash.get(hash_code, &framed, self.buffer.as_slice()) {
                return offset;
            }
        }

        let offset = self.buffer.len() as u64;
        self.buffer.extend_from_slice(&framed);
        self.unique_values += 1;
        if let Some(hash) = &mut self.minimization {
            hash.insert(hash_code, offset, framed.len() as u32);
        }
        offset
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Total number of `add_record`/`add_record_verbatim` calls, including
    /// ones that deduplicated onto an existing offset.
    pub fn values(&self) -> u64 {
        self.values
    }

    /// Number of distinct records actually stored (after deduplication).
    pub fn unique_values(&self) -> u64 {
        self.unique_values
    }
}

/// Byte length of the framed record (compression tag + varint length +
/// payload) starting at `offset`, without decompressing it. Used to slice
/// out a record for a verbatim merge copy.
pub fn record_span(buffer: &[u8], offset: u64) -> usize {
    let offset = offset as usize;
    let (len, consumed) = varint::decode(&buffer[offset + 1..]).expect("malformed value-store record length");
    1 + consumed + len as usize
}

fn content_hash(bytes: &[u8]) -> u64 {
    // FNV-1a: simple, stable, and adequate for a dedup hash (collisions just
    // cost an extra byte-compare, never correctness).
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn frame_record(payload: &[u8], compressor: &dyn Compressor, threshold: usize) -> Vec<u8> {
    let (algo, body) = if payload.len() >= threshold {
        (compressor.algorithm(), compressor.compress(payload))
    } else {
        (crate::compression::CompressionAlgorithm::None, payload.to_vec())
    };
    let mut out = Vec::with_capacity(body.len() + 11);
    out.push(algo.as_byte());
    varint::encode(body.len() as u64, &mut out);
    out.extend_from_slice(&body);
    out
}

/// Read a framed record back out of `buffer` at `offset`, decompressing if needed.
pub fn decode_record(buffer: &[u8], offset: u64) -> Result<Vec<u8>> {
    let offset = offset as usize;
    let algo = compression::CompressionAlgorithm::from_byte(buffer[offset])?;
    let (len, consumed) = varint::decode(&buffer[offset + 1..])
        .ok_or_else(|| Error::malformed("truncated value-store record length".to_string()))?;
    let body_start = offset + 1 + consumed;
    let body = &buffer[body_start..body_start + len as usize];
    compression::by_algorithm(algo).decompress(body)
}
