//! Bounds minimization-hash memory while preserving recency: a ring of `G`
//! hash generations, oldest dropped wholesale when the ring is full and a new
//! generation starts (spec §4.2).
//!
//! Grounded on the same `minimization_hash.h` family as
//! [`crate::minimization_hash`]; keyvi sizes its generation count and
//! per-generation capacity from the configured memory limit, and promotes a
//! hit to the newest generation on lookup so frequently reused states survive
//! generation rotation.

use crate::minimization_hash::{ByteSource, MinimizationHash};

/// Average bytes a minimization-hash slot is estimated to cost, used to turn
/// a byte budget into a generation/capacity split.
const BYTES_PER_SLOT_ESTIMATE: usize = 24;

/// Ring of `generations.len()` independent [`MinimizationHash`] tables.
/// Lookups scan newest-to-oldest and, on a hit, re-insert into the newest
/// generation so hot states migrate forward and survive rotation.
pub struct LruOfGenerations {
    generations: Vec<MinimizationHash>,
    newest: usize,
}

impl LruOfGenerations {
    /// Derive generation count and per-generation capacity from a memory
    /// budget. `generation_count` is fixed by the caller (keyvi uses a small
    /// constant, typically 4); the remaining budget is split evenly across
    /// generations' slot capacities.
    pub fn new(memory_limit: usize, generation_count: usize) -> Self {
        let generation_count = generation_count.max(1);
        let per_generation_bytes = memory_limit / generation_count;
        let capacity = (per_generation_bytes / BYTES_PER_SLOT_ESTIMATE).max(16);
        let max_chain_probes = 8;
        let generations = (0..generation_count)
            .map(|_| MinimizationHash::new(capacity, max_chain_probes))
            .collect();
        Self {
            generations,
            newest: 0,
        }
    }

    fn prev_index(&self, idx: usize) -> usize {
        (idx + self.generations.len() - 1) % self.generations.len()
    }

    /// Look up `bytes` across all generations, newest first. On a hit in an
    /// older generation, re-insert into the newest generation (promotion);
    /// the stale copy in the older generation is left in place and will be
    /// reclaimed when that generation is eventually cleared.
    pub fn get_and_move(
        &mut self,
        hash_code: u64,
        bytes: &[u8],
        source: &(impl ByteSource + ?Sized),
    ) -> Option<u64> {
        let count = self.generations.len();
        let mut idx = self.newest;
        for _ in 0..count {
            if let Some(offset) = self.generations[idx].get(hash_code, bytes, source) {
                if idx != self.newest {
                    self.generations[self.newest].insert(hash_code, offset, bytes.len() as u32);
                }
                return Some(offset);
            }
            idx = self.prev_index(idx);
        }
        None
    }

    /// Insert into the newest generation, rotating to a freshly cleared
    /// generation first if it's grown too full.
    pub fn insert(&mut self, hash_code: u64, offset: u64, length: u32) {
        if self.generations[self.newest].load_factor() > 0.9 {
            self.rotate();
        }
        self.generations[self.newest].insert(hash_code, offset, length);
    }

    /// Start a new generation, evicting the oldest one's entries entirely.
    pub fn rotate(&mut self) {
        let count = self.generations.len();
        self.newest = (self.newest + 1) % count;
        self.generations[self.newest].clear();
    }

    pub fn generation_count(&self) -> usize {
        self.generations.len()
    }

    pub fn total_len(&self) -> usize {
        self.generations.iter().map(MinimizationHash::len).sum()
    }
}
