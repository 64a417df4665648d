//! Externally observable configuration keys (spec §6).
//!
//! `CompilerConfig` drives `FsaCompiler`; `MergeConfig` drives `Merger`.
//! Unknown keys passed through [`CompilerConfig::with_raw`] are ignored;
//! invalid values fail at construction, mirroring `DsvConfig`'s builder
//! style (`with_*` methods returning `Self`, `Default` for the common case).

use crate::error::{Error, Result};

/// Default chunk size used by `MemoryMapManager` during compilation (64 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Default in-memory budget for the minimization hash and value-store buffers (128 MiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 128 * 1024 * 1024;

/// Default JSON-compression threshold in bytes: packed buffers smaller than
/// this are stored uncompressed regardless of the configured compressor.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 32;

/// Parse a size string with an optional `_kb`/`_mb`/`_gb` suffix (case
/// insensitive), e.g. `"512"`, `"64mb"`, `"2GB"`.
///
/// Generalizes `succinctly`'s CLI-only `parse_size` into a reusable config
/// helper; same suffix grammar, same case-insensitivity.
pub fn parse_size(s: &str) -> Result<usize> {
    let trimmed = s.trim();
    let lower = trimmed.to_lowercase();

    if let Ok(bytes) = lower.parse::<usize>() {
        return Ok(bytes);
    }

    let (num_str, unit) = if lower.ends_with("_gb") || lower.ends_with("gb") {
        (lower.trim_end_matches("_gb").trim_end_matches("gb"), 1024 * 1024 * 1024)
    } else if lower.ends_with("_mb") || lower.ends_with("mb") {
        (lower.trim_end_matches("_mb").trim_end_matches("mb"), 1024 * 1024)
    } else if lower.ends_with("_kb") || lower.ends_with("kb") {
        (lower.trim_end_matches("_kb").trim_end_matches("kb"), 1024)
    } else {
        return Err(Error::invalid_argument(format!(
            "invalid size format '{s}': expected a plain integer or a _kb/_mb/_gb suffix"
        )));
    };

    num_str
        .trim()
        .parse::<usize>()
        .map(|n| n * unit)
        .map_err(|_| Error::invalid_argument(format!("invalid number in size '{s}'")))
}

/// Configuration for [`crate::compiler::FsaCompiler`].
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Memory budget for the minimization hash and in-memory sort buffers.
    pub memory_limit: usize,
    /// Directory for `MemoryMapManager`'s temporary chunk files.
    pub temporary_path: std::path::PathBuf,
    /// Key count above which the external-memory (disk-backed) sort is used
    /// instead of an in-memory sort.
    pub parallel_sort_threshold: usize,
    /// Name of the compression algorithm used by value-store codecs that support it.
    pub compression: String,
    /// Minimum packed-buffer size before compression is applied.
    pub compression_threshold: usize,
    /// Whether value minimization (content-addressed sharing) is enabled.
    pub minimization: bool,
    /// Fixed vector length for the float-vector value store.
    pub vector_size: usize,
    /// Use 32-bit floats (vs. widening) in the float-vector value store.
    pub single_precision_float: bool,
    /// Use stable-insert (last-write-wins on duplicate keys) semantics.
    pub stable_inserts: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            temporary_path: std::env::temp_dir(),
            parallel_sort_threshold: 1_000_000,
            compression: "none".to_string(),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            minimization: true,
            vector_size: 0,
            single_precision_float: true,
            stable_inserts: false,
        }
    }
}

impl CompilerConfig {
    /// Parse `memory_limit[_kb|_mb|_gb]` from a string value.
    pub fn with_memory_limit(mut self, value: &str) -> Result<Self> {
        self.memory_limit = parse_size(value)?;
        Ok(self)
    }

    pub fn with_temporary_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.temporary_path = path.into();
        self
    }

    pub fn with_compression(mut self, name: impl Into<String>) -> Self {
        self.compression = name.into();
        self
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn with_minimization(mut self, enabled: bool) -> Self {
        self.minimization = enabled;
        self
    }

    pub fn with_vector_size(mut self, size: usize) -> Self {
        self.vector_size = size;
        self
    }

    pub fn with_stable_inserts(mut self, enabled: bool) -> Self {
        self.stable_inserts = enabled;
        self
    }
}

/// Configuration for [`crate::merger::Merger`].
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// last-write-wins (true) vs first-write-wins (false) on duplicate keys across inputs.
    pub last_wins: bool,
    /// Copy value-store blobs byte-for-byte without re-minimization.
    pub append_merge: bool,
    pub temporary_path: std::path::PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            last_wins: true,
            append_merge: false,
            temporary_path: std::env::temp_dir(),
        }
    }
}

impl MergeConfig {
    pub fn with_last_wins(mut self, enabled: bool) -> Self {
        self.last_wins = enabled;
        self
    }

    pub fn with_append_merge(mut self, enabled: bool) -> Self {
        self.append_merge = enabled;
        self
    }
}
