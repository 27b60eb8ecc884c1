//! Model-based property tests against a `BTreeMap` reference.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::{BitmaskWidth, IndexReader, IndexWriter, ValueWidth};

fn bitmask_width_strategy() -> impl Strategy<Value = BitmaskWidth> {
    prop::sample::select(vec![
        BitmaskWidth::U8,
        BitmaskWidth::U16,
        BitmaskWidth::U32,
        BitmaskWidth::U64,
    ])
}

fn value_width_strategy() -> impl Strategy<Value = ValueWidth> {
    prop::sample::select(vec![
        ValueWidth::U8,
        ValueWidth::U16,
        ValueWidth::U32,
        ValueWidth::U64,
    ])
}

/// Keys mix a dense low range (forcing shared prefixes and child reuse)
/// with the full 64-bit range (forcing maximum level counts).
fn key_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..512, any::<u64>()]
}

/// Model maps each key to a value seed; the encoded value is the seed's
/// low `width` bytes, little-endian.
fn model_strategy() -> impl Strategy<Value = BTreeMap<u64, u64>> {
    prop::collection::btree_map(key_strategy(), any::<u64>(), 0..80)
}

/// Levels the builder must choose for `max_key` at this fan-out.
fn expected_levels(max_key: u64, bitmask: BitmaskWidth) -> u32 {
    let slice_bits = bitmask.slice_bits();
    let mut levels = 1u32;
    let mut key = max_key >> slice_bits;
    while key != 0 {
        levels += 1;
        key >>= slice_bits;
    }
    levels
}

/// Independent layout computation: the number of layers equals the
/// number of distinct key prefixes per level, and every layer except the
/// root is the target of exactly one pointer.
fn expected_layer_count(keys: &[u64], bitmask: BitmaskWidth, levels: u32) -> u64 {
    let slice_bits = bitmask.slice_bits();
    let mut layers = 0u64;
    for level in 1..=levels {
        let shift = level * slice_bits;
        let prefix = |key: u64| if shift >= 64 { 0 } else { key >> shift };
        let mut distinct = 1u64;
        for pair in keys.windows(2) {
            if prefix(pair[0]) != prefix(pair[1]) {
                distinct += 1;
            }
        }
        layers += distinct;
    }
    layers
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    /// Round-trip, header recoverability, minimal pointer width and the
    /// size law, for every width combination the format supports.
    #[test]
    fn proptest_build_layout_and_roundtrip(
        bitmask in bitmask_width_strategy(),
        value in value_width_strategy(),
        model in model_strategy(),
    ) {
        let keys: Vec<u64> = model.keys().copied().collect();
        let width = value.bytes();
        let value_bufs: Vec<Vec<u8>> = model
            .values()
            .map(|seed| seed.to_le_bytes()[..width].to_vec())
            .collect();
        let value_refs: Vec<&[u8]> = value_bufs.iter().map(|v| v.as_slice()).collect();

        let writer = IndexWriter::new(bitmask, value);
        let buffer = writer.dump(&keys, &value_refs).unwrap();
        let reader = IndexReader::new(&buffer).unwrap();

        if keys.is_empty() {
            prop_assert!(buffer.is_empty());
            prop_assert!(reader.is_empty());
            return Ok(());
        }

        // Header recoverability.
        let levels = expected_levels(keys[keys.len() - 1], bitmask);
        prop_assert_eq!(u32::from(reader.num_levels()), levels);
        prop_assert_eq!(reader.bitmask_width(), bitmask);
        prop_assert_eq!(reader.value_width(), value);

        // Size law and minimal pointer width, from an independent count
        // of layers and pointers.
        let num_layers = expected_layer_count(&keys, bitmask, levels);
        let num_pointers = num_layers - 1;
        let fixed = num_layers * bitmask.bytes() as u64 + keys.len() as u64 * width as u64;
        let mut minimal_ptr = 0usize;
        for candidate in 1..=4usize {
            if fixed + num_pointers * candidate as u64 <= 1u64 << (8 * candidate) {
                minimal_ptr = candidate;
                break;
            }
        }
        prop_assert_eq!(reader.ptr_width(), minimal_ptr);
        prop_assert_eq!(
            buffer.len() as u64,
            2 + fixed + num_pointers * minimal_ptr as u64
        );

        // Round-trip: every entry is found with its exact bytes.
        for (key, seed) in &model {
            let expected = seed.to_le_bytes();
            prop_assert!(reader.exists(*key));
            prop_assert_eq!(reader.get(*key), Some(&expected[..width]));
        }

        // Miss completeness at the boundaries of every present key.
        for key in &keys {
            for probe in [key.wrapping_add(1), key.wrapping_sub(1)] {
                if !model.contains_key(&probe) {
                    prop_assert!(!reader.exists(probe));
                    prop_assert_eq!(reader.get(probe), None);
                    prop_assert_eq!(reader.get_or(probe, &[0xEE]), &[0xEE][..]);
                }
            }
        }
    }

    /// Arbitrary probes agree with the model on both `exists` and `get`.
    #[test]
    fn proptest_probes_match_model(
        bitmask in bitmask_width_strategy(),
        model in model_strategy(),
        probes in prop::collection::vec(key_strategy(), 0..64),
    ) {
        let keys: Vec<u64> = model.keys().copied().collect();
        let values: Vec<u64> = model.values().copied().collect();

        let writer = IndexWriter::new(bitmask, ValueWidth::U64);
        let buffer = writer.dump_u64s(&keys, &values).unwrap();
        let reader = IndexReader::new(&buffer).unwrap();

        for probe in probes {
            prop_assert_eq!(reader.exists(probe), model.contains_key(&probe));
            prop_assert_eq!(reader.get_u64(probe), model.get(&probe).copied());
        }
    }

    /// The typed dump helpers agree byte for byte with the raw `dump`.
    #[test]
    fn proptest_typed_dumps_match_raw_dump(
        bitmask in bitmask_width_strategy(),
        model in model_strategy(),
    ) {
        let keys: Vec<u64> = model.keys().copied().collect();
        let values: Vec<u32> = model.values().map(|seed| *seed as u32).collect();

        let writer = IndexWriter::new(bitmask, ValueWidth::U32);
        let typed = writer.dump_u32s(&keys, &values).unwrap();

        let value_bufs: Vec<[u8; 4]> = values.iter().map(|v| v.to_le_bytes()).collect();
        let value_refs: Vec<&[u8]> = value_bufs.iter().map(|v| v.as_slice()).collect();
        let raw = writer.dump(&keys, &value_refs).unwrap();

        prop_assert_eq!(typed, raw);
    }
}
