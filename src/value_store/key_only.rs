//! Trivial value store for key-existence dictionaries: every key maps to the
//! same unit value, so there is nothing to persist beyond the automaton
//! itself (spec §4.4, grounded on keyvi's `KeyOnlyValueStore`).

use crate::error::Result;

/// The one and only handle a key-only dictionary's final states carry.
pub const UNIT_HANDLE: u64 = 0;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyOnlyValueStoreWriter;

impl KeyOnlyValueStoreWriter {
    pub fn new() -> Self {
        Self
    }

    /// No payload to store; every key gets the same handle.
    pub fn add_value(&mut self) -> u64 {
        UNIT_HANDLE
    }

    /// There is only ever one handle, so merging one in changes nothing.
    pub fn add_value_merge(&mut self, _source_handle: u64) -> u64 {
        UNIT_HANDLE
    }

    /// Nothing to persist.
    pub fn write(&self, _out: &mut impl std::io::Write) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyOnlyValueStoreReader;

impl KeyOnlyValueStoreReader {
    pub fn new(_bytes: &[u8]) -> Self {
        Self
    }

    pub fn decode(&self, _handle: u64) {}
}
