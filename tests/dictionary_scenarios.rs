//! End-to-end scenarios spanning compile, persist, reopen, traverse, and
//! merge — one test per scenario a keyvi dictionary is expected to handle
//! correctly as a whole, rather than per-module unit behavior.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write as _;

use keyvi::compiler::{CompiledAutomaton, FsaCompiler};
use keyvi::config::{CompilerConfig, MergeConfig};
use keyvi::merger::{MergeInput, Merger};
use keyvi::properties::{DictionaryProperties, FileHeader, SparseArrayProperties, ValueStoreProperties};
use keyvi::sparse_array::SparseArrayView;
use keyvi::traverser;
use keyvi::value_store::ValueStoreType;
use keyvi::{Automaton, LoadingStrategy};

fn compile_key_only(keys: &[&[u8]]) -> CompiledAutomaton {
    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    for (i, key) in keys.iter().enumerate() {
        compiler.add(key, i as u64).unwrap();
    }
    compiler.finish().unwrap()
}

fn write_key_only_file(path: &std::path::Path, compiled: &CompiledAutomaton) {
    let header = FileHeader {
        dictionary: DictionaryProperties::new(compiled.number_of_keys, compiled.root_state, compiled.number_of_states, None, None),
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

// Scenario 1: key-only round trip.
#[test]
fn scenario_key_only_round_trip() {
    let keys: &[&[u8]] = &[b"aaaa", b"aabb", b"aabc", b"aacd", b"bbcd"];
    let compiled = compile_key_only(keys);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dict.keyvi");
    write_key_only_file(&path, &compiled);

    let automaton = Automaton::open(&path, LoadingStrategy::Lazy).unwrap();
    assert!(automaton.contains_key(b"aabc"));
    assert!(!automaton.contains_key(b"aab"));

    let view = automaton.view();
    let mut all = traverser::enumerate_all(&view, automaton.root_state(), b"");
    all.sort_by(|a, b| a.0.cmp(&b.0));
    let found: Vec<Vec<u8>> = all.into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        found,
        vec![b"aaaa".to_vec(), b"aabb".to_vec(), b"aabc".to_vec(), b"aacd".to_vec(), b"bbcd".to_vec()]
    );
}

// Scenario 2: weighted completion.
#[test]
fn scenario_weighted_completion() {
    let entries: &[(&[u8], u32)] = &[
        (b"angel", 22),
        (b"angeli", 24),
        (b"angelina", 444),
        (b"angela merkel", 200),
        (b"angela merk", 180),
        (b"angelo merk", 10),
    ];

    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|&(k, _)| k);

    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    for (i, &(key, weight)) in sorted.iter().enumerate() {
        compiler.add_weighted(key, i as u64, Some(weight)).unwrap();
    }
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    let prefix_state = traverser::walk(&view, compiled.root_state, b"angel").unwrap();
    let results = traverser::enumerate_weighted(&view, prefix_state, b"angel", 10);
    let order: Vec<Vec<u8>> = results.into_iter().map(|(k, _, _)| k).collect();

    assert_eq!(
        order,
        vec![
            b"angelina".to_vec(),
            b"angela merkel".to_vec(),
            b"angela merk".to_vec(),
            b"angeli".to_vec(),
            b"angel".to_vec(),
            b"angelo merk".to_vec(),
        ]
    );
}

// Scenario 3: int round trip with inner weights, where each key's own
// integer value doubles as its weight (mirrors keyvi's int-with-weights
// value store: the stored int and the traversal weight are the same field).
#[test]
fn scenario_int_round_trip_with_inner_weights() {
    let entries: &[(&[u8], i64)] = &[
        (b"aabc", 22),
        (b"bbbc", 22),
        (b"bbbd", 444),
        (b"cdabc", 22),
        (b"efdffd", 444),
        (b"xfdebc", 23),
    ];
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|&(k, _)| k);

    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    for &(key, value) in &sorted {
        compiler.add_weighted(key, value as u64, Some(value as u32)).unwrap();
    }
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    let bbb_state = traverser::walk(&view, compiled.root_state, b"bbb").unwrap();
    assert!(!view.is_final(bbb_state));
    assert_eq!(view.inner_weight(bbb_state), 444);

    let aa_state = traverser::walk(&view, compiled.root_state, b"aa").unwrap();
    assert_eq!(view.inner_weight(aa_state), 22);

    let order = traverser::weighted_child_order(&view, compiled.root_state);
    assert_eq!(order, vec![b'b', b'e', b'x', b'a', b'c']);
}

// Scenario 4: JSON compression.
#[test]
fn scenario_json_compression() {
    use keyvi::value_store::json::{JsonValueStoreReader, JsonValueStoreWriter};

    let mut writer = JsonValueStoreWriter::new("snappy", 32, true, 4096).unwrap();
    let h1 = writer.add_value(r#"{"a":1}"#).unwrap();
    let h2 = writer.add_value(r#"{"a":1}"#).unwrap();
    let h3 = writer.add_value(r#"{"b":2}"#).unwrap();
    assert_eq!(h1, h2, "identical JSON values should share a store entry");
    assert_ne!(h1, h3);
    assert_eq!(writer.values(), 3);
    assert_eq!(writer.unique_values(), 2);

    let buffer = writer.into_buffer();
    let reader = JsonValueStoreReader::new(&buffer);
    assert_eq!(reader.decode(h1).unwrap(), serde_json::json!({"a": 1}));
    assert_eq!(reader.decode(h3).unwrap(), serde_json::json!({"b": 2}));

    let raw_len = r#"{"a":1}"#.len() * 2 + r#"{"b":2}"#.len();
    assert!(buffer.len() < raw_len, "deduplication should shrink the payload below the raw total");
}

// Scenario 5: pointer overflow.
#[test]
fn scenario_pointer_overflow_round_trips() {
    // A wide, shallow key set (many distinct first bytes, long shared tails)
    // pushes sibling states far enough apart that some transitions can't
    // fit the compact relative encoding and fall back to overflow indirection.
    let mut keys: Vec<Vec<u8>> = Vec::new();
    for lead in 0u8..=200 {
        let mut key = vec![lead];
        key.extend_from_slice(b"-shared-tail-for-pointer-overflow");
        keys.push(key);
    }
    keys.sort();

    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    for (i, key) in keys.iter().enumerate() {
        compiler.add(key, i as u64).unwrap();
    }
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(traverser::walk(&view, compiled.root_state, key).and_then(|s| view.state_value(s)), Some(i as u64));
    }

    let has_overflow_pointer = compiled
        .buckets
        .chunks_exact(2)
        .any(|cell| u16::from_le_bytes([cell[0], cell[1]]) & 0xC000 == 0x8000);
    assert!(has_overflow_pointer, "expected at least one overflow-indirected pointer");
}

// Scenario 6: merge with deletes.
#[test]
fn scenario_merge_with_deletes() {
    let mut compiler_a = FsaCompiler::new(CompilerConfig::default());
    compiler_a.add(b"x", 1).unwrap();
    compiler_a.add(b"y", 2).unwrap();
    let a = compiler_a.finish().unwrap();

    let mut compiler_b = FsaCompiler::new(CompilerConfig::default());
    compiler_b.add(b"y", 3).unwrap();
    compiler_b.add(b"z", 4).unwrap();
    let b = compiler_b.finish().unwrap();

    let view_a = SparseArrayView::new(&a.labels, &a.buckets);
    let view_b = SparseArrayView::new(&b.labels, &b.buckets);

    let mut deletions = HashSet::new();
    deletions.insert(b"x".to_vec());

    let merger = Merger::new(MergeConfig::default().with_last_wins(true));
    let merged = merger
        .merge(
            vec![MergeInput::new(view_a, a.root_state), MergeInput::new(view_b, b.root_state)],
            &deletions,
        )
        .unwrap();

    let view = SparseArrayView::new(&merged.labels, &merged.buckets);
    let lookup = |k: &[u8]| traverser::walk(&view, merged.root_state, k).and_then(|s| view.state_value(s));

    assert_eq!(lookup(b"x"), None);
    assert_eq!(lookup(b"y"), Some(3));
    assert_eq!(lookup(b"z"), Some(4));
    assert_eq!(merged.number_of_keys, 2);
}

// Round-trip law: merging a single input alone reproduces it for reads.
#[test]
fn merge_of_single_input_is_read_equivalent_to_original() {
    let original = compile_key_only(&[b"alpha", b"beta", b"gamma"]);
    let view = SparseArrayView::new(&original.labels, &original.buckets);

    let merger = Merger::new(MergeConfig::default());
    let merged = merger
        .merge(vec![MergeInput::new(view, original.root_state)], &HashSet::new())
        .unwrap();
    let merged_view = SparseArrayView::new(&merged.labels, &merged.buckets);

    for key in [b"alpha".as_slice(), b"beta".as_slice(), b"gamma".as_slice()] {
        let original_value = traverser::walk(&SparseArrayView::new(&original.labels, &original.buckets), original.root_state, key)
            .and_then(|s| SparseArrayView::new(&original.labels, &original.buckets).state_value(s));
        let merged_value = traverser::walk(&merged_view, merged.root_state, key).and_then(|s| merged_view.state_value(s));
        assert_eq!(original_value, merged_value);
    }
    assert_eq!(merged.number_of_keys, original.number_of_keys);
}

// Boundary behavior: an empty segment contains nothing and enumerates nothing.
#[test]
fn boundary_empty_segment() {
    let compiler = FsaCompiler::new(CompilerConfig::default());
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    assert_eq!(traverser::walk(&view, compiled.root_state, b"anything"), None);
    assert!(traverser::enumerate_all(&view, compiled.root_state, b"").is_empty());
    assert_eq!(compiled.number_of_keys, 0);
}

// Boundary behavior: single-byte keys at the extremes of the byte range.
#[test]
fn boundary_single_byte_extreme_keys() {
    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    compiler.add(&[0x00], 10).unwrap();
    compiler.add(&[0xFF], 20).unwrap();
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    let v0 = traverser::walk(&view, compiled.root_state, &[0x00]).and_then(|s| view.state_value(s));
    let vf = traverser::walk(&view, compiled.root_state, &[0xFF]).and_then(|s| view.state_value(s));
    assert_eq!(v0, Some(10));
    assert_eq!(vf, Some(20));
}

// Boundary behavior: a long key (well past any single-page bucket window).
#[test]
fn boundary_long_key_round_trips() {
    let mut key = Vec::with_capacity(70_000);
    for i in 0..70_000u32 {
        key.push((i % 251) as u8);
    }
    let mut compiler = FsaCompiler::new(CompilerConfig::default());
    compiler.add(&key, 7).unwrap();
    let compiled = compiler.finish().unwrap();
    let view = SparseArrayView::new(&compiled.labels, &compiled.buckets);

    assert_eq!(traverser::walk(&view, compiled.root_state, &key).and_then(|s| view.state_value(s)), Some(7));
}

// Boundary behavior: value-store records straddling varint length-width
// boundaries (one and two byte lengths).
#[test]
fn boundary_value_store_record_length_widths() {
    use keyvi::value_store::string::{StringValueStoreReader, StringValueStoreWriter};

    let mut writer = StringValueStoreWriter::new("none", usize::MAX, false, 4096).unwrap();
    let lengths = [126usize, 127, 128, 16_383, 16_384];
    let payloads: Vec<String> = lengths.iter().map(|&len| "x".repeat(len)).collect();
    let handles: Vec<u64> = payloads.iter().map(|p| writer.add_value(p)).collect();

    let buffer = writer.into_buffer();
    let reader = StringValueStoreReader::new(&buffer);
    for (handle, payload) in handles.into_iter().zip(payloads.iter()) {
        assert_eq!(&reader.decode(handle).unwrap(), payload);
    }
}

// Confirms reopening a dictionary written with a non-key-only value-store
// header round-trips its declared type through the on-disk JSON header.
#[test]
fn dictionary_header_preserves_value_store_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dict.keyvi");

    let compiled = compile_key_only(&[b"a", b"b"]);
    let header = FileHeader {
        dictionary: DictionaryProperties::new(
            compiled.number_of_keys,
            compiled.root_state,
            compiled.number_of_states,
            Some(ValueStoreType::Int),
            None,
        ),
        sparse_array: SparseArrayProperties {
            labels_length: compiled.labels.len() as u64,
        },
        value_store: Some(ValueStoreProperties {
            payload_length: 0,
            values: 2,
            unique_values: 2,
            compression: "none".to_string(),
            vector_size: None,
            single_precision_float: None,
        }),
    };
    let mut file = File::create(&path).unwrap();
    header.write(&mut file).unwrap();
    file.write_all(&compiled.labels).unwrap();
    file.write_all(&compiled.buckets).unwrap();
    drop(file);

    let automaton = Automaton::open(&path, LoadingStrategy::Lazy).unwrap();
    assert_eq!(automaton.value_store_type(), Some(ValueStoreType::Int));
    assert_eq!(automaton.number_of_keys(), 2);
}
