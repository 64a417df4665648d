//! On-disk file layout: magic bytes, length-prefixed JSON header records,
//! then the `labels`/`buckets`/value-store payload sections (spec §6).
//!
//! Grounded on `keyvi/include/keyvi/dictionary/dictionary_properties.h`:
//! the file opens with an 8-byte magic, a JSON "dictionary properties"
//! record, a JSON "sparse array properties" record, and — unless the
//! dictionary is key-only — a JSON "value store properties" record, each
//! prefixed by a big-endian `u32` byte length so a reader can skip sections
//! it doesn't care about. This differs from the varint framing value-store
//! records use internally — header records are few and rarely numeric-heavy,
//! so a fixed-width length keeps the framing itself trivial to parse.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value_store::ValueStoreType;

/// Magic bytes opening every keyvi dictionary file.
pub const MAGIC: &[u8; 8] = b"KEYVIFSA";

/// Top-level JSON header describing the whole dictionary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DictionaryProperties {
    pub version: u32,
    pub number_of_keys: u64,
    pub start_state: u64,
    pub number_of_states: u64,
    pub value_store_type: Option<u8>,
    /// Opaque user-supplied string, carried through unexamined.
    pub manifest: Option<String>,
}

impl DictionaryProperties {
    pub fn new(
        number_of_keys: u64,
        start_state: u64,
        number_of_states: u64,
        value_store_type: Option<ValueStoreType>,
        manifest: Option<String>,
    ) -> Self {
        Self {
            version: 1,
            number_of_keys,
            start_state,
            number_of_states,
            value_store_type: value_store_type.map(ValueStoreType::as_byte),
            manifest,
        }
    }

    pub fn value_store_type(&self) -> Result<Option<ValueStoreType>> {
        self.value_store_type.map(ValueStoreType::from_byte).transpose()
    }
}

/// Header for the `labels`/`buckets` sparse array section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SparseArrayProperties {
    pub labels_length: u64,
}

/// Header for the value-store section (absent for key-only dictionaries).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueStoreProperties {
    pub payload_length: u64,
    /// Total `add_value` calls, including ones that deduplicated onto an
    /// existing offset.
    pub values: u64,
    /// Distinct records actually stored, after deduplication.
    pub unique_values: u64,
    #[serde(rename = "__compression")]
    pub compression: String,
    pub vector_size: Option<u64>,
    pub single_precision_float: Option<bool>,
}

fn write_json_record<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    let len = u32::try_from(json.len()).map_err(|_| Error::invalid_argument("header record too large for a u32 length".to_string()))?;
    out.write_all(&len.to_be_bytes())?;
    out.write_all(&json)?;
    Ok(())
}

fn read_json_record<R: Read, T: for<'de> Deserialize<'de>>(input: &mut R) -> Result<T> {
    let mut len_bytes = [0u8; 4];
    input.read_exact(&mut len_bytes)?;
    let length = u32::from_be_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; length];
    input.read_exact(&mut buf)?;
    serde_json::from_slice(&buf).map_err(Error::from)
}

/// Full file header: magic, dictionary properties, sparse-array properties,
/// and (if present) value-store properties.
pub struct FileHeader {
    pub dictionary: DictionaryProperties,
    pub sparse_array: SparseArrayProperties,
    pub value_store: Option<ValueStoreProperties>,
}

impl FileHeader {
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(MAGIC)?;
        write_json_record(out, &self.dictionary)?;
        write_json_record(out, &self.sparse_array)?;
        if let Some(value_store) = &self.value_store {
            write_json_record(out, value_store)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        input.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::malformed("bad magic: not a keyvi dictionary file".to_string()));
        }
        let dictionary: DictionaryProperties = read_json_record(input)?;
        let sparse_array: SparseArrayProperties = read_json_record(input)?;
        let value_store = if dictionary.value_store_type()?.is_some() {
            Some(read_json_record(input)?)
        } else {
            None
        };
        Ok(Self {
            dictionary,
            sparse_array,
            value_store,
        })
    }
}
