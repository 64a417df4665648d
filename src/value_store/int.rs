//! Integer value stores: plain `int` and `int` with an attached traversal
//! weight (spec §4.4).
//!
//! Grounded on `keyvi/include/keyvi/dictionary/fsa/internal/int_value_store.h`:
//! for the plain variant "the value IS the handle" — a zigzag-encoded signed
//! integer needs no separate backing buffer, so `add_value` and `decode` are
//! pure bit-twiddling. The weighted variant packs `(value, weight)` into a
//! small record buffer instead, since a pair no longer fits losslessly into
//! the handle alone.

use crate::value_store::RecordStore;
use crate::varint;

#[inline]
fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
fn zigzag_decode(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntValueStoreWriter;

impl IntValueStoreWriter {
    pub fn new() -> Self {
        Self
    }

    /// The handle a final state carries IS the zigzag-encoded value; there
    /// is nothing else to persist.
    pub fn add_value(&mut self, value: i64) -> u64 {
        zigzag_encode(value)
    }

    /// The handle already IS the value, so merging one in is just passing
    /// the source handle through unchanged.
    pub fn add_value_merge(&mut self, source_handle: u64) -> u64 {
        source_handle
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntValueStoreReader;

impl IntValueStoreReader {
    pub fn new(_bytes: &[u8]) -> Self {
        Self
    }

    pub fn decode(&self, handle: u64) -> i64 {
        zigzag_decode(handle)
    }
}

/// `(value, weight)` pairs, weight used by weighted traversal's completion
/// ranking. Stored as a tiny two-field record since the pair no longer fits
/// in a single handle.
pub struct IntWeightValueStoreWriter {
    records: RecordStore,
}

impl IntWeightValueStoreWriter {
    pub fn new(minimize: bool, memory_limit: usize) -> Self {
        Self {
            records: RecordStore::new("none", usize::MAX, minimize, memory_limit)
                .expect("'none' compression is always a valid name"),
        }
    }

    pub fn add_value(&mut self, value: i64, weight: u32) -> u64 {
        let mut payload = Vec::with_capacity(10);
        varint::encode(zigzag_encode(value), &mut payload);
        varint::encode(weight as u64, &mut payload);
        self.records.add_record(&payload)
    }

    /// Copies an already-encoded record from `source` (at `source_handle`)
    /// verbatim into this store, re-minimizing against records already
    /// added here. Used by the merger's minimize-merge path.
    pub fn add_value_merge(&mut self, source: &[u8], source_handle: u64) -> u64 {
        let span = crate::value_store::record_span(source, source_handle);
        self.records
            .add_record_verbatim(&source[source_handle as usize..source_handle as usize + span])
    }

    pub fn values(&self) -> u64 {
        self.records.values()
    }

    pub fn unique_values(&self) -> u64 {
        self.records.unique_values()
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.records.into_buffer()
    }
}

pub struct IntWeightValueStoreReader<'a> {
    buffer: &'a [u8],
}

impl<'a> IntWeightValueStoreReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    pub fn decode(&self, handle: u64) -> (i64, u32) {
        let raw = crate::value_store::decode_record(self.buffer, handle)
            .expect("malformed int-weight record");
        let (z, consumed) = varint::decode(&raw).expect("malformed value varint");
        let (w, _) = varint::decode(&raw[consumed..]).expect("malformed weight varint");
        (zigzag_decode(z), w as u32)
    }
}
