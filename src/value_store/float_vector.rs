//! Fixed-length numeric vector value store (spec §4.4), grounded on
//! `keyvi/include/keyvi/dictionary/fsa/internal/float_vector_value_store.h`:
//! every value is a vector of the same configured length, stored as packed
//! little-endian floats and deduplicated by content like the other record
//! stores. `single_precision_float` in [`crate::config::CompilerConfig`]
//! selects `f32` vs `f64` element width.

use crate::error::{Error, Result};
use crate::value_store::RecordStore;

pub struct FloatVectorValueStoreWriter {
    records: RecordStore,
    vector_size: usize,
    single_precision: bool,
}

impl FloatVectorValueStoreWriter {
    pub fn new(
        vector_size: usize,
        single_precision: bool,
        compression_name: &str,
        compression_threshold: usize,
        minimize: bool,
        memory_limit: usize,
    ) -> Result<Self> {
        Ok(Self {
            records: RecordStore::new(compression_name, compression_threshold, minimize, memory_limit)?,
            vector_size,
            single_precision,
        })
    }

    pub fn add_value(&mut self, values: &[f64]) -> Result<u64> {
        if values.len() != self.vector_size {
            return Err(Error::invalid_argument(format!(
                "expected a vector of length {}, got {}",
                self.vector_size,
                values.len()
            )));
        }
        let mut payload = Vec::with_capacity(values.len() * if self.single_precision { 4 } else { 8 });
        if self.single_precision {
            for &v in values {
                payload.extend_from_slice(&(v as f32).to_le_bytes());
            }
        } else {
            for &v in values {
                payload.extend_from_slice(&v.to_le_bytes());
            }
        }
        Ok(self.records.add_record(&payload))
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

pub struct FloatVectorValueStoreReader<'a> {
    buffer: &'a [u8],
    vector_size: usize,
    single_precision: bool,
}

impl<'a> FloatVectorValueStoreReader<'a> {
    pub fn new(buffer: &'a [u8], vector_size: usize, single_precision: bool) -> Self {
        Self {
            buffer,
            vector_size,
            single_precision,
        }
    }

    pub fn decode(&self, handle: u64) -> Result<Vec<f64>> {
        let bytes = crate::value_store::decode_record(self.buffer, handle)?;
        let mut out = Vec::with_capacity(self.vector_size);
        if self.single_precision {
            for chunk in bytes.chunks_exact(4) {
                out.push(f32::from_le_bytes(chunk.try_into().unwrap()) as f64);
            }
        } else {
            for chunk in bytes.chunks_exact(8) {
                out.push(f64::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_vector_single_precision_roundtrip() {
        let mut writer = FloatVectorValueStoreWriter::new(3, true, "none", 32, true, 4096).unwrap();
        let handle = writer.add_value(&[1.5, -2.25, 0.0]).unwrap();
        let buffer = writer.into_buffer();
        let reader = FloatVectorValueStoreReader::new(&buffer, 3, true);
        assert_eq!(reader.decode(handle).unwrap(), vec![1.5, -2.25, 0.0]);
    }

    #[test]
    fn test_float_vector_double_precision_roundtrip() {
        let mut writer = FloatVectorValueStoreWriter::new(2, false, "none", 32, true, 4096).unwrap();
        let handle = writer.add_value(&[std::f64::consts::PI, 42.0]).unwrap();
        let buffer = writer.into_buffer();
        let reader = FloatVectorValueStoreReader::new(&buffer, 2, false);
        assert_eq!(reader.decode(handle).unwrap(), vec![std::f64::consts::PI, 42.0]);
    }

    #[test]
    fn test_float_vector_wrong_length_rejected() {
        let mut writer = FloatVectorValueStoreWriter::new(3, true, "none", 32, true, 4096).unwrap();
        assert!(writer.add_value(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_float_vector_merge_copies_source_record_verbatim() {
        let mut source = FloatVectorValueStoreWriter::new(2, true, "none", 32, true, 4096).unwrap();
        let source_handle = source.add_value(&[3.0, 4.0]).unwrap();
        let source_buffer = source.into_buffer();

        let mut dest = FloatVectorValueStoreWriter::new(2, true, "none", 32, true, 4096).unwrap();
        let dest_handle = dest.add_value_merge(&source_buffer, source_handle);
        let dest_buffer = dest.into_buffer();
        let reader = FloatVectorValueStoreReader::new(&dest_buffer, 2, true);
        assert_eq!(reader.decode(dest_handle).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_float_vector_dedup() {
        let mut writer = FloatVectorValueStoreWriter::new(2, true, "none", 32, true, 4096).unwrap();
        let h1 = writer.add_value(&[1.0, 2.0]).unwrap();
        let h2 = writer.add_value(&[1.0, 2.0]).unwrap();
        assert_eq!(h1, h2);
    }
}
