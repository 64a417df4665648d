//! Streaming FSA minimizer: the compiler that turns a sorted stream of
//! `(key, value_handle)` pairs into a minimized automaton (spec §4.5).
//!
//! Grounded on the classic Daciuk incremental-minimization algorithm keyvi's
//! `fsa/generator.h` implements: a "register" of unfinished states, one per
//! depth along the path from the root to the most recently inserted key.
//! Inserting a new key freezes every unfinished state deeper than the shared
//! prefix with the previous key — each freeze either reuses an
//! already-placed, content-identical state (a [`MinimizationHash`] lookup) or
//! places a brand new one via [`SparseArrayBuilder`].
//!
//! A frozen state's inner weight (see [`FsaCompiler::resolve_weight`]) is its
//! own explicit weight if one was given, otherwise the largest weight among
//! its already-placed children — mirroring keyvi's generator, which writes a
//! weight at every state rather than only at accepting ones, so that a
//! traverser reading a non-accepting state's weight on the way down still
//! sees something meaningful to inherit.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::lru_generations::LruOfGenerations;
use crate::sparse_array::SparseArrayBuilder;
use crate::varint;

/// Most states branch into only a handful of children; inlining up to 8
/// transitions avoids a heap allocation for the common case.
type Transitions = SmallVec<[(u8, u64); 8]>;

#[derive(Default)]
struct UnfinishedState {
    transitions: Transitions,
    value: Option<u64>,
    weight: Option<u32>,
}

/// Serialize a not-yet-placed state into the byte signature used to detect
/// an existing, content-identical state. Two states with the same signature
/// are guaranteed interchangeable: their transitions target the same
/// already-frozen offsets, they accept (or don't) with the same value, and
/// they carry the same resolved inner weight (`resolved_weight`, see
/// [`FsaCompiler::resolve_weight`] — not the raw `state.weight`, since an
/// interior state's effective weight also depends on its children).
fn signature_of(state: &UnfinishedState, resolved_weight: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    varint::encode(state.transitions.len() as u64, &mut bytes);
    for &(label, target) in &state.transitions {
        bytes.push(label);
        varint::encode(target, &mut bytes);
    }
    match state.value {
        Some(v) => {
            bytes.push(1);
            varint::encode(v, &mut bytes);
        }
        None => bytes.push(0),
    }
    varint::encode(resolved_weight as u64, &mut bytes);
    bytes
}

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// The result of a finished compilation: the sparse array's raw bytes, the
/// root state's offset, the number of distinct keys inserted, and the
/// number of distinct states actually placed (after minimization).
pub struct CompiledAutomaton {
    pub labels: Vec<u8>,
    pub buckets: Vec<u8>,
    pub root_state: u64,
    pub number_of_keys: u64,
    pub number_of_states: u64,
}

pub struct FsaCompiler {
    config: CompilerConfig,
    array: SparseArrayBuilder,
    register: Vec<UnfinishedState>,
    prev_key: Vec<u8>,
    signatures: Vec<u8>,
    sig_offset_to_state: HashMap<u64, u64>,
    minimization: Option<LruOfGenerations>,
    number_of_keys: u64,
    number_of_states: u64,
    finished: bool,
}

impl FsaCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        let minimization = if config.minimization {
            Some(LruOfGenerations::new(config.memory_limit, 4))
        } else {
            None
        };
        Self {
            config,
            array: SparseArrayBuilder::new(),
            register: vec![UnfinishedState::default()],
            prev_key: Vec::new(),
            signatures: Vec::new(),
            sig_offset_to_state: HashMap::new(),
            minimization,
            number_of_keys: 0,
            number_of_states: 0,
            finished: false,
        }
    }

    /// Insert a key-only entry (the value store carries no payload).
    pub fn add(&mut self, key: &[u8], value: u64) -> Result<()> {
        self.add_weighted(key, value, None)
    }

    /// Insert a key with an explicit inner weight for weighted traversal.
    pub fn add_weighted(&mut self, key: &[u8], value: u64, weight: Option<u32>) -> Result<()> {
        if self.finished {
            return Err(Error::AlreadyCompiled);
        }

        let common_prefix = common_prefix_len(&self.prev_key, key);

        if !self.prev_key.is_empty() && key == self.prev_key.as_slice() {
            if self.config.stable_inserts {
                // Last-write-wins: the not-yet-frozen leaf state still sits
                // at the bottom of the register.
                let leaf = self.register.last_mut().expect("register always has the leaf");
                leaf.value = Some(value);
                leaf.weight = weight;
                return Ok(());
            }
            return Err(Error::invalid_argument(format!(
                "duplicate key {key:?} with stable_inserts disabled"
            )));
        }

        if !self.prev_key.is_empty() && key < self.prev_key.as_slice() {
            return Err(Error::invalid_argument(
                "keys must be inserted in strictly ascending order".to_string(),
            ));
        }

        self.freeze_down_to(common_prefix);

        for &byte in &key[common_prefix..] {
            let _ = byte;
            self.register.push(UnfinishedState::default());
        }

        let leaf = self.register.last_mut().expect("register always has the leaf");
        leaf.value = Some(value);
        leaf.weight = weight;

        self.prev_key = key.to_vec();
        self.number_of_keys += 1;
        Ok(())
    }

    /// Freeze every unfinished state deeper than `target_depth`, wiring each
    /// into its parent's transition list under the previous key's byte at
    /// that depth.
    fn freeze_down_to(&mut self, target_depth: usize) {
        while self.register.len() - 1 > target_depth {
            let depth = self.register.len() - 1;
            let state = self.register.pop().expect("loop guard ensures non-root");
            let offset = self.finalize_state(state);
            let label = self.prev_key[depth - 1];
            self.register
                .last_mut()
                .expect("root is never popped")
                .transitions
                .push((label, offset));
        }
    }

    /// A state's resolved inner weight: its own explicit weight if the key
    /// ending there was inserted with one, otherwise the largest weight
    /// already written for one of its (already-placed) children. This is
    /// what lets an interior, non-accepting state carry a meaningful weight
    /// for top-down inheritance during weighted traversal — without it,
    /// every interior state would read back `0` and traversal would only
    /// ever see the root's weight.
    fn resolve_weight(&self, state: &UnfinishedState) -> u32 {
        if let Some(w) = state.weight {
            return w;
        }
        let view = self.array.view();
        state
            .transitions
            .iter()
            .map(|&(_, target)| view.inner_weight(target))
            .max()
            .unwrap_or(0)
    }

    /// Place `state` into the sparse array, or reuse an existing
    /// content-identical state if minimization is enabled and finds one.
    fn finalize_state(&mut self, state: UnfinishedState) -> u64 {
        let resolved_weight = self.resolve_weight(&state);
        let signature = signature_of(&state, resolved_weight);
        let hash_code = content_hash(&signature);

        if let Some(lru) = &mut self.minimization {
            if let Some(sig_offset) = lru.get_and_move(hash_code, &signature, self.signatures.as_slice()) {
                if let Some(&state_offset) = self.sig_offset_to_state.get(&sig_offset) {
                    return state_offset;
                }
            }
        }

        let weight = if resolved_weight != 0 { Some(resolved_weight) } else { None };
        let state_offset = self.array.place_state(&state.transitions, state.value, weight);
        self.number_of_states += 1;

        if let Some(lru) = &mut self.minimization {
            let sig_offset = self.signatures.len() as u64;
            self.signatures.extend_from_slice(&signature);
            self.sig_offset_to_state.insert(sig_offset, state_offset);
            lru.insert(hash_code, sig_offset, signature.len() as u32);
        }

        state_offset
    }

    /// Freeze the remaining register down to the root and return the
    /// finished automaton.
    pub fn finish(mut self) -> Result<CompiledAutomaton> {
        if self.finished {
            return Err(Error::AlreadyCompiled);
        }
        self.freeze_down_to(0);
        let root = self.register.pop().expect("root state");
        let root_state = self.finalize_state(root);
        self.finished = true;

        let (labels, buckets) = self.array.into_parts();
        Ok(CompiledAutomaton {
            labels,
            buckets,
            root_state,
            number_of_keys: self.number_of_keys,
            number_of_states: self.number_of_states,
        })
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
