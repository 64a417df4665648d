//! JSON value store (spec §4.4), grounded on
//! `keyvi/include/keyvi/dictionary/fsa/internal/json_value_store.h`: same
//! framed-record/minimization machinery as [`super::string`], but values are
//! validated and re-serialized through `serde_json` so malformed input is
//! rejected at write time rather than silently stored.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::value_store::RecordStore;

pub struct JsonValueStoreWriter {
    records: RecordStore,
}

impl JsonValueStoreWriter {
    pub fn new(compression_name: &str, compression_threshold: usize, minimize: bool, memory_limit: usize) -> Result<Self> {
        Ok(Self {
            records: RecordStore::new(compression_name, compression_threshold, minimize, memory_limit)?,
        })
    }

    /// Parse `value` to validate it's well-formed JSON, then store its
    /// canonical (whitespace-minimal) serialization.
    pub fn add_value(&mut self, value: &str) -> Result<u64> {
        let parsed: Value = serde_json::from_str(value)?;
        self.add_parsed(&parsed)
    }

    pub fn add_parsed(&mut self, value: &Value) -> Result<u64> {
        let canonical = serde_json::to_vec(value)?;
        Ok(self.records.add_record(&canonical))
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

pub struct JsonValueStoreReader<'a> {
    buffer: &'a [u8],
}

impl<'a> JsonValueStoreReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    pub fn decode(&self, handle: u64) -> Result<Value> {
        let bytes = crate::value_store::decode_record(self.buffer, handle)?;
        serde_json::from_slice(&bytes).map_err(Error::from)
    }

    pub fn decode_str(&self, handle: u64) -> Result<String> {
        Ok(self.decode(handle)?.to_string())
    }
}
