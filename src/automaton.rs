//! Read-side bundle: mmaps a compiled dictionary file and dispatches to the
//! value-store reader matching its header (spec §4.6).
//!
//! Grounded on keyvi's `fsa/automata.h` constructor, which mmaps the whole
//! file once and slices out the `labels`/`buckets`/value-store regions by
//! the offsets recorded in the header. `LoadingStrategy` mirrors its
//! `loading_strategy_types` enum (lazy / populate / lazy-no-readahead),
//! forwarded to `memmap2`'s advice flags.

use std::fs::File;
use std::path::Path;

use memmap2::{Advice, Mmap};

use crate::error::{Error, Result};
use crate::properties::FileHeader;
use crate::sparse_array::SparseArrayView;
use crate::value_store::float_vector::FloatVectorValueStoreReader;
use crate::value_store::int::{IntValueStoreReader, IntWeightValueStoreReader};
use crate::value_store::json::JsonValueStoreReader;
use crate::value_store::string::StringValueStoreReader;
use crate::value_store::ValueStoreType;

/// A decoded value, typed according to the dictionary's `value_store_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Key-only dictionary: the key's presence is the only information.
    None,
    Int(i64),
    IntWeight(i64, u32),
    String(String),
    Json(serde_json::Value),
    FloatVector(Vec<f64>),
}

/// How eagerly the backing file's pages should be faulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStrategy {
    /// Default: let the OS page cache fault pages in on first touch.
    Lazy,
    /// Touch every page up front so later lookups never block on I/O.
    Populate,
    /// Like `Lazy`, but disables readahead (useful for pointer-chasing
    /// workloads where sequential readahead wastes bandwidth).
    LazyNoReadahead,
}

/// A compiled dictionary opened for reading, mmapped from disk.
pub struct Automaton {
    mmap: Mmap,
    labels_range: std::ops::Range<usize>,
    buckets_range: std::ops::Range<usize>,
    value_store_range: std::ops::Range<usize>,
    value_store_type: Option<ValueStoreType>,
    root_state: u64,
    number_of_keys: u64,
    vector_size: usize,
    single_precision_float: bool,
}

impl Automaton {
    pub fn open(path: impl AsRef<Path>, strategy: LoadingStrategy) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        match strategy {
            LoadingStrategy::Populate => mmap.advise(Advice::WillNeed)?,
            LoadingStrategy::LazyNoReadahead => mmap.advise(Advice::Random)?,
            LoadingStrategy::Lazy => {}
        }

        let mut cursor = std::io::Cursor::new(&mmap[..]);
        let header = FileHeader::read(&mut cursor)?;
        let header_len = cursor.position() as usize;

        let labels_len = header.sparse_array.labels_length as usize;
        let labels_start = header_len;
        let labels_end = labels_start + labels_len;
        let buckets_start = labels_end;
        let buckets_end = buckets_start + labels_len * 2;

        let value_store_type = header.dictionary.value_store_type()?;
        let (value_store_start, value_store_end) = match &header.value_store {
            Some(vs) => (buckets_end, buckets_end + vs.payload_length as usize),
            None => (buckets_end, buckets_end),
        };

        if mmap.len() < value_store_end {
            return Err(Error::malformed("dictionary file truncated relative to its header".to_string()));
        }

        let vector_size = header
            .value_store
            .as_ref()
            .and_then(|vs| vs.vector_size)
            .unwrap_or(0) as usize;
        let single_precision_float = header
            .value_store
            .as_ref()
            .and_then(|vs| vs.single_precision_float)
            .unwrap_or(true);

        let root_state = header.dictionary.start_state;

        Ok(Self {
            mmap,
            labels_range: labels_start..labels_end,
            buckets_range: buckets_start..buckets_end,
            value_store_range: value_store_start..value_store_end,
            value_store_type,
            root_state,
            number_of_keys: header.dictionary.number_of_keys,
            vector_size,
            single_precision_float,
        })
    }

    pub fn root_state(&self) -> u64 {
        self.root_state
    }

    pub fn number_of_keys(&self) -> u64 {
        self.number_of_keys
    }

    pub fn value_store_type(&self) -> Option<ValueStoreType> {
        self.value_store_type
    }

    pub fn view(&self) -> SparseArrayView<'_> {
        SparseArrayView::new(&self.mmap[self.labels_range.clone()], &self.mmap[self.buckets_range.clone()])
    }

    pub fn value_store_bytes(&self) -> &[u8] {
        &self.mmap[self.value_store_range.clone()]
    }

    pub fn vector_size(&self) -> usize {
        self.vector_size
    }

    pub fn single_precision_float(&self) -> bool {
        self.single_precision_float
    }

    /// Look up a key, returning its terminal state-value handle if present.
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        let view = self.view();
        let mut state = self.root_state;
        for &byte in key {
            state = view.try_walk(state, byte)?;
        }
        view.state_value(state)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Look up a key and decode its value according to this dictionary's
    /// `value_store_type`, dispatching to the matching reader.
    pub fn get_value(&self, key: &[u8]) -> Result<Option<DecodedValue>> {
        let Some(handle) = self.get(key) else {
            return Ok(None);
        };
        let decoded = match self.value_store_type {
            None | Some(ValueStoreType::KeyOnly) => DecodedValue::None,
            Some(ValueStoreType::Int) => DecodedValue::Int(IntValueStoreReader::new(&[]).decode(handle)),
            Some(ValueStoreType::IntWeight) => {
                let (value, weight) = IntWeightValueStoreReader::new(self.value_store_bytes()).decode(handle);
                DecodedValue::IntWeight(value, weight)
            }
            Some(ValueStoreType::String) => {
                DecodedValue::String(StringValueStoreReader::new(self.value_store_bytes()).decode(handle)?)
            }
            Some(ValueStoreType::Json) => DecodedValue::Json(JsonValueStoreReader::new(self.value_store_bytes()).decode(handle)?),
            Some(ValueStoreType::FloatVector) => {
                let reader = FloatVectorValueStoreReader::new(self.value_store_bytes(), self.vector_size, self.single_precision_float);
                DecodedValue::FloatVector(reader.decode(handle)?)
            }
        };
        Ok(Some(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::FsaCompiler;
    use crate::config::CompilerConfig;
    use crate::properties::{DictionaryProperties, SparseArrayProperties, ValueStoreProperties};
    use std::io::Write;

    fn write_key_only_dictionary(path: &Path, keys: &[&[u8]]) {
        let mut compiler = FsaCompiler::new(CompilerConfig::default());
        for (i, key) in keys.iter().enumerate() {
            compiler.add(key, i as u64).unwrap();
        }
        let compiled = compiler.finish().unwrap();

        let header = FileHeader {
            dictionary: DictionaryProperties::new(
                compiled.number_of_keys,
                compiled.root_state,
                compiled.number_of_states,
                None,
                None,
            ),
            sparse_array: SparseArrayProperties {
                labels_length: compiled.labels.len() as u64,
            },
            value_store: None,
        };

        let mut file = File::create(path).unwrap();
        header.write(&mut file).unwrap();
        file.write_all(&compiled.labels).unwrap();
        file.write_all(&compiled.buckets).unwrap();
    }

    #[test]
    fn test_open_and_lookup_key_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.keyvi");
        write_key_only_dictionary(&path, &[b"alpha", b"beta", b"gamma"]);

        let automaton = Automaton::open(&path, LoadingStrategy::Lazy).unwrap();
        assert!(automaton.contains_key(b"alpha"));
        assert!(automaton.contains_key(b"beta"));
        assert!(!automaton.contains_key(b"delta"));
        assert_eq!(automaton.number_of_keys(), 3);
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.keyvi");
        write_key_only_dictionary(&path, &[b"alpha"]);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

        assert!(Automaton::open(&path, LoadingStrategy::Lazy).is_err());
    }

    #[test]
    fn test_value_store_header_with_string_store() {
        let compiled_labels = vec![0xffu8; 512];
        let compiled_buckets = vec![0u8; 1024];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.keyvi");

        let header = FileHeader {
            dictionary: DictionaryProperties::new(0, 0, 1, Some(ValueStoreType::String), None),
            sparse_array: SparseArrayProperties {
                labels_length: compiled_labels.len() as u64,
            },
            value_store: Some(ValueStoreProperties {
                payload_length: 0,
                values: 0,
                unique_values: 0,
                compression: "none".to_string(),
                vector_size: None,
                single_precision_float: None,
            }),
        };
        let mut file = File::create(&path).unwrap();
        header.write(&mut file).unwrap();
        file.write_all(&compiled_labels).unwrap();
        file.write_all(&compiled_buckets).unwrap();
        drop(file);

        let automaton = Automaton::open(&path, LoadingStrategy::Lazy).unwrap();
        assert_eq!(automaton.value_store_type(), Some(ValueStoreType::String));
        assert!(automaton.value_store_bytes().is_empty());
    }

    #[test]
    fn test_get_value_decodes_string_store() {
        use crate::value_store::string::StringValueStoreWriter;

        let mut writer = StringValueStoreWriter::new("none", 32, true, 4096).unwrap();
        let mut compiler = FsaCompiler::new(CompilerConfig::default());
        let handle = writer.add_value("hello");
        compiler.add(b"greeting", handle).unwrap();
        let compiled = compiler.finish().unwrap();
        let value_store_buffer = writer.into_buffer();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.keyvi");
        let header = FileHeader {
            dictionary: DictionaryProperties::new(
                compiled.number_of_keys,
                compiled.root_state,
                compiled.number_of_states,
                Some(ValueStoreType::String),
                None,
            ),
            sparse_array: SparseArrayProperties {
                labels_length: compiled.labels.len() as u64,
            },
            value_store: Some(ValueStoreProperties {
                payload_length: value_store_buffer.len() as u64,
                values: 1,
                unique_values: 1,
                compression: "none".to_string(),
                vector_size: None,
                single_precision_float: None,
            }),
        };
        let mut file = File::create(&path).unwrap();
        header.write(&mut file).unwrap();
        file.write_all(&compiled.labels).unwrap();
        file.write_all(&compiled.buckets).unwrap();
        file.write_all(&value_store_buffer).unwrap();
        drop(file);

        let automaton = Automaton::open(&path, LoadingStrategy::Lazy).unwrap();
        assert_eq!(automaton.get_value(b"greeting").unwrap(), Some(DecodedValue::String("hello".to_string())));
        assert_eq!(automaton.get_value(b"missing").unwrap(), None);
    }
}
