//! N-way merge of already-compiled dictionaries into one (spec §4.8).
//!
//! Grounded on `keyvi/include/keyvi/dictionary/dictionary_merger_fwd.h` and
//! `dictionary_merger.h`: each input contributes a sorted stream of
//! `(key, value)` pairs (read off via [`crate::traverser::enumerate_all_with_weight`]),
//! which are interleaved by repeatedly taking the globally smallest key
//! across all stream heads. Keys present in more than one input are resolved
//! by `MergeConfig::last_wins` — the convention keyvi uses for stacking
//! incremental update segments on top of a base dictionary, where the
//! latest-added input should shadow older ones. A `deletions` set lets a
//! merge drop keys entirely (keyvi's tombstone mechanism for segment
//! compaction).
//!
//! Key-merging alone isn't enough for value stores that keep their payload
//! in a separate buffer (string/json/float-vector/int-weight): those need
//! the buffers themselves merged, which [`merge_value_stores`] does, either
//! by re-minimizing through each store's `add_value_merge` (the default) or,
//! when `MergeConfig::append_merge` is set, by concatenating the buffers
//! verbatim and shifting handles by a constant per input — no re-minimization,
//! O(total size) rather than O(record count).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::compiler::{CompiledAutomaton, FsaCompiler};
use crate::config::{CompilerConfig, MergeConfig};
use crate::error::Result;
use crate::sparse_array::SparseArrayView;
use crate::traverser;
use crate::value_store::{record_span, RecordStore};

/// One dictionary contributed to a merge. `rebase` maps this input's raw
/// value-store handle to the handle it should carry in the merged output —
/// identity for value stores where the handle needs no adjustment (key-only,
/// plain `int`), or an offset shift for record-backed stores whose payloads
/// were appended into a shared output buffer ahead of the merge.
pub struct MergeInput<'a> {
    pub view: SparseArrayView<'a>,
    pub root: u64,
    pub rebase: Box<dyn Fn(u64) -> u64 + 'a>,
}

impl<'a> MergeInput<'a> {
    pub fn new(view: SparseArrayView<'a>, root: u64) -> Self {
        Self {
            view,
            root,
            rebase: Box::new(|handle| handle),
        }
    }

    pub fn with_rebase(mut self, rebase: impl Fn(u64) -> u64 + 'a) -> Self {
        self.rebase = Box::new(rebase);
        self
    }
}

pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge `inputs` into a single minimized automaton, dropping any key in
    /// `deletions` and resolving cross-input duplicate keys per
    /// `MergeConfig::last_wins` (later entries in `inputs` win ties when
    /// `true`, earlier ones when `false`).
    pub fn merge(&self, inputs: Vec<MergeInput<'_>>, deletions: &HashSet<Vec<u8>>) -> Result<CompiledAutomaton> {
        let mut streams: Vec<VecDeque<(Vec<u8>, u64, Option<u32>)>> = inputs
            .iter()
            .map(|input| {
                traverser::enumerate_all_with_weight(&input.view, input.root, b"")
                    .into_iter()
                    .map(|(key, value, weight)| (key, (input.rebase)(value), weight))
                    .collect()
            })
            .collect();

        let mut compiler = FsaCompiler::new(CompilerConfig::default().with_stable_inserts(true));

        loop {
            let min_key = streams
                .iter()
                .filter_map(|s| s.front().map(|(k, _, _)| k.clone()))
                .min();
            let Some(min_key) = min_key else { break };

            let mut winner: Option<(usize, u64, Option<u32>)> = None;
            for (idx, stream) in streams.iter_mut().enumerate() {
                if stream.front().map(|(k, _, _)| k == &min_key).unwrap_or(false) {
                    let (_, value, weight) = stream.pop_front().expect("front checked above");
                    let take = match winner {
                        None => true,
                        Some((winning_idx, _, _)) => {
                            if self.config.last_wins {
                                idx > winning_idx
                            } else {
                                false
                            }
                        }
                    };
                    if take {
                        winner = Some((idx, value, weight));
                    }
                }
            }

            if deletions.contains(&min_key) {
                continue;
            }
            if let Some((_, value, weight)) = winner {
                compiler.add_weighted(&min_key, value, weight)?;
            }
        }

        compiler.finish()
    }

    /// Merge `sources` — paired FSA views and raw record-backed value-store
    /// buffers (string/json/float-vector/int-weight all share the same
    /// framing, so one code path handles all four) — into one automaton and
    /// one merged value-store buffer, rebasing handles automatically.
    ///
    /// Key-only and plain `int` dictionaries have no value-store buffer to
    /// merge (the handle either doesn't exist or already IS the value); use
    /// [`Merger::merge`] directly for those with an identity `rebase`.
    pub fn merge_with_value_store(
        &self,
        sources: Vec<MergeSource<'_>>,
        deletions: &HashSet<Vec<u8>>,
        compression_name: &str,
        compression_threshold: usize,
        memory_limit: usize,
    ) -> Result<(CompiledAutomaton, Vec<u8>)> {
        let buffers: Vec<&[u8]> = sources.iter().map(|s| s.value_store).collect();
        let (merged_buffer, rebases) =
            merge_value_stores(&self.config, compression_name, compression_threshold, memory_limit, &buffers)?;

        let inputs: Vec<MergeInput<'_>> = sources
            .into_iter()
            .zip(rebases)
            .map(|(source, rebase)| MergeInput::new(source.view, source.root).with_rebase(move |h| rebase(h)))
            .collect();

        let compiled = self.merge(inputs, deletions)?;
        Ok((compiled, merged_buffer))
    }
}

/// One dictionary contributed to a [`Merger::merge_with_value_store`] call:
/// its FSA view/root plus the raw bytes of its record-backed value store.
pub struct MergeSource<'a> {
    pub view: SparseArrayView<'a>,
    pub root: u64,
    pub value_store: &'a [u8],
}

/// Builds a single merged value-store buffer from each input's raw
/// record-backed buffer, per `config.append_merge`, and returns a per-input
/// function mapping that input's old handle to its handle in the merged
/// buffer.
///
/// `append_merge = true`: straight concatenation with a constant per-input
/// offset shift (keyvi's append-merge — no re-minimization, O(total size)).
/// `append_merge = false` (default): each input's records are copied through
/// a fresh [`RecordStore`] with minimization enabled, deduplicating content
/// shared across inputs the same way a single compile run would.
pub fn merge_value_stores(
    config: &MergeConfig,
    compression_name: &str,
    compression_threshold: usize,
    memory_limit: usize,
    inputs: &[&[u8]],
) -> Result<(Vec<u8>, Vec<Box<dyn Fn(u64) -> u64>>)> {
    if config.append_merge {
        let mut buffer = Vec::new();
        let mut rebases: Vec<Box<dyn Fn(u64) -> u64>> = Vec::with_capacity(inputs.len());
        for &input in inputs {
            let shift = buffer.len() as u64;
            buffer.extend_from_slice(input);
            rebases.push(Box::new(move |h| h + shift));
        }
        Ok((buffer, rebases))
    } else {
        let mut store = RecordStore::new(compression_name, compression_threshold, true, memory_limit)?;
        let mut rebases: Vec<Box<dyn Fn(u64) -> u64>> = Vec::with_capacity(inputs.len());
        for &input in inputs {
            let mut map: HashMap<u64, u64> = HashMap::new();
            let mut offset = 0u64;
            while (offset as usize) < input.len() {
                let span = record_span(input, offset);
                let framed = &input[offset as usize..offset as usize + span];
                map.insert(offset, store.add_record_verbatim(framed));
                offset += span as u64;
            }
            rebases.push(Box::new(move |h| {
                *map.get(&h).expect("merged handle must come from its own input's value store")
            }));
        }
        Ok((store.into_buffer(), rebases))
    }
}
