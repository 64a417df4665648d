//! DFS enumeration over a compiled automaton: plain completion, weighted
//! top-N completion, and approximate (near/fuzzy) matching (spec §4.7).
//!
//! Grounded on keyvi's `dictionary/fsa/*traverser*.h` family: each variant is
//! the same underlying trie walk with a different policy for which branches
//! to follow and which hits to keep. Weighted traversal visits children in
//! [`weighted_child_order`] (descending resolved weight, see
//! [`crate::compiler::FsaCompiler`] for how that weight gets written) and
//! uses [`bounded_queue::BoundedPriorityQueue`] to keep the top `N` results
//! without heuristic subtree-weight pruning — that predictive pruning is
//! keyvi's separate "completion" feature, out of scope here.

pub mod bounded_queue;

use bounded_queue::BoundedPriorityQueue;

use crate::sparse_array::SparseArrayView;

/// Follow `bytes` from `state`, returning the resulting state if the whole
/// path exists.
pub fn walk(view: &SparseArrayView<'_>, mut state: u64, bytes: &[u8]) -> Option<u64> {
    for &b in bytes {
        state = view.try_walk(state, b)?;
    }
    Some(state)
}

/// Enumerate every key reachable from `state`, in lexicographic order
/// (guaranteed by `out_transitions` returning sorted labels). `prefix` is
/// prepended to every yielded key.
pub fn enumerate_all(view: &SparseArrayView<'_>, state: u64, prefix: &[u8]) -> Vec<(Vec<u8>, u64)> {
    let mut out = Vec::new();
    let mut path = prefix.to_vec();
    collect_all(view, state, &mut path, &mut out);
    out
}

fn collect_all(view: &SparseArrayView<'_>, state: u64, path: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, u64)>) {
    if let Some(value) = view.state_value(state) {
        out.push((path.clone(), value));
    }
    for c in view.out_transitions(state) {
        if let Some(next) = view.try_walk(state, c) {
            path.push(c);
            collect_all(view, next, path, out);
            path.pop();
        }
    }
}

/// Child labels of `state` in the order the weighted transition variant
/// visits them: descending by each child's own resolved `inner_weight`
/// (which the compiler already propagates up from descendants, see
/// [`crate::compiler::FsaCompiler`]), ties broken by ascending label.
pub fn weighted_child_order(view: &SparseArrayView<'_>, state: u64) -> Vec<u8> {
    let mut children: Vec<(u8, u32)> = view
        .out_transitions(state)
        .into_iter()
        .filter_map(|c| view.try_walk(state, c).map(|next| (c, view.inner_weight(next))))
        .collect();
    children.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    children.into_iter().map(|(c, _)| c).collect()
}

/// Enumerate the top-`limit` keys reachable from `state` by inherited
/// weight (highest first). A state's weight is its own explicit
/// `inner_weight`, or its parent's if absent — ties broken by discovery
/// order (lexicographic, since `out_transitions` is sorted).
pub fn enumerate_weighted(view: &SparseArrayView<'_>, state: u64, prefix: &[u8], limit: usize) -> Vec<(Vec<u8>, u64, u32)> {
    let mut queue = BoundedPriorityQueue::new(limit);
    let mut path = prefix.to_vec();
    let root_weight = view.inner_weight(state);
    collect_weighted(view, state, root_weight, &mut path, &mut queue);
    queue
        .into_sorted_vec()
        .into_iter()
        .map(|(w, (path, value))| (path, value, w))
        .collect()
}

fn collect_weighted(
    view: &SparseArrayView<'_>,
    state: u64,
    inherited_weight: u32,
    path: &mut Vec<u8>,
    queue: &mut BoundedPriorityQueue<(Vec<u8>, u64)>,
) {
    let weight = {
        let own = view.inner_weight(state);
        if own != 0 {
            own
        } else {
            inherited_weight
        }
    };
    if let Some(value) = view.state_value(state) {
        queue.push(weight, (path.clone(), value));
    }
    for c in weighted_child_order(view, state) {
        if let Some(next) = view.try_walk(state, c) {
            path.push(c);
            collect_weighted(view, next, weight, path, queue);
            path.pop();
        }
    }
}

/// Like [`enumerate_all`], but also reports each leaf's explicit inner
/// weight if one was set (used by the merger to carry weights across a
/// re-minimization pass, where only the `(key, value)` pair would
/// otherwise survive).
pub fn enumerate_all_with_weight(view: &SparseArrayView<'_>, state: u64, prefix: &[u8]) -> Vec<(Vec<u8>, u64, Option<u32>)> {
    let mut out = Vec::new();
    let mut path = prefix.to_vec();
    collect_all_with_weight(view, state, &mut path, &mut out);
    out
}

fn collect_all_with_weight(view: &SparseArrayView<'_>, state: u64, path: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, u64, Option<u32>)>) {
    if let Some(value) = view.state_value(state) {
        let weight = view.inner_weight(state);
        out.push((path.clone(), value, if weight != 0 { Some(weight) } else { None }));
    }
    for c in view.out_transitions(state) {
        if let Some(next) = view.try_walk(state, c) {
            path.push(c);
            collect_all_with_weight(view, next, path, out);
            path.pop();
        }
    }
}

/// One approximate match: the matched key, its value handle, and the edit
/// distance from the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproximateMatch {
    pub key: Vec<u8>,
    pub value: u64,
    pub distance: u32,
}

/// Levenshtein-distance-bounded search: every key within `max_distance`
/// insertions/deletions/substitutions of `target`, found via the classic
/// trie/dynamic-programming-row technique (each trie edge extends the DP
/// table by one row; a row pruned once its minimum exceeds `max_distance`).
pub fn near_search(view: &SparseArrayView<'_>, state: u64, target: &[u8], max_distance: u32) -> Vec<ApproximateMatch> {
    let mut results = Vec::new();
    let first_row: Vec<u32> = (0..=target.len() as u32).collect();
    let mut path = Vec::new();
    near_recurse(view, state, target, max_distance, &first_row, &mut path, &mut results, false);
    results
}

/// Damerau-Levenshtein-bounded search: like [`near_search`] but additionally
/// tolerates adjacent-character transpositions at no extra distance penalty
/// beyond the usual substitution cost, using the standard "last two rows"
/// extension of the trie DP technique.
pub fn fuzzy_search(view: &SparseArrayView<'_>, state: u64, target: &[u8], max_distance: u32) -> Vec<ApproximateMatch> {
    let mut results = Vec::new();
    let first_row: Vec<u32> = (0..=target.len() as u32).collect();
    let mut path = Vec::new();
    near_recurse(view, state, target, max_distance, &first_row, &mut path, &mut results, true);
    results
}

#[allow(clippy::too_many_arguments)]
fn near_recurse(
    view: &SparseArrayView<'_>,
    state: u64,
    target: &[u8],
    max_distance: u32,
    prev_row: &[u32],
    path: &mut Vec<u8>,
    results: &mut Vec<ApproximateMatch>,
    allow_transposition: bool,
) {
    if *prev_row.last().unwrap() <= max_distance {
        if let Some(value) = view.state_value(state) {
            results.push(ApproximateMatch {
                key: path.clone(),
                value,
                distance: *prev_row.last().unwrap(),
            });
        }
    }

    for c in view.out_transitions(state) {
        let Some(next) = view.try_walk(state, c) else { continue };

        let mut row = vec![prev_row[0] + 1];
        for (j, &target_byte) in target.iter().enumerate() {
            let cost = if target_byte == c { 0 } else { 1 };
            let mut value = (prev_row[j] + cost)
                .min(row[j] + 1) // insertion
                .min(prev_row[j + 1] + 1); // deletion

            if allow_transposition
                && j >= 1
                && path.len() >= 1
                && target_byte == *path.last().unwrap()
                && target[j - 1] == c
            {
                // transposition: swap of (path's last byte, target[j-1]) with
                // (c, target_byte) costs the same as prev_row two steps back + 1
                value = value.min(prev_row[j - 1].saturating_add(1));
            }

            row.push(value);
        }

        if *row.iter().min().unwrap() <= max_distance {
            path.push(c);
            near_recurse(view, next, target, max_distance, &row, path, results, allow_transposition);
            path.pop();
        }
    }
}
