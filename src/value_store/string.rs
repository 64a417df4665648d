//! UTF-8 string value store (spec §4.4), grounded on
//! `keyvi/include/keyvi/dictionary/fsa/internal/string_value_store.h`: values
//! are framed records (compression tag + length + bytes) deduplicated by
//! content through [`RecordStore`], so two keys mapping to an identical
//! string share one copy on disk.

use crate::error::Result;
use crate::value_store::RecordStore;

pub struct StringValueStoreWriter {
    records: RecordStore,
}

impl StringValueStoreWriter {
    pub fn new(compression_name: &str, compression_threshold: usize, minimize: bool, memory_limit: usize) -> Result<Self> {
        Ok(Self {
            records: RecordStore::new(compression_name, compression_threshold, minimize, memory_limit)?,
        })
    }

    pub fn add_value(&mut self, value: &str) -> u64 {
        self.records.add_record(value.as_bytes())
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

pub struct StringValueStoreReader<'a> {
    buffer: &'a [u8],
}

impl<'a> StringValueStoreReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    pub fn decode(&self, handle: u64) -> Result<String> {
        let bytes = crate::value_store::decode_record(self.buffer, handle)?;
        String::from_utf8(bytes).map_err(|e| crate::error::Error::malformed(format!("non-utf8 string value: {e}")))
    }
}
