//! End-to-end tests: build a set from streamed blocks, probe it from many threads,
//! ship it through a file, and prune key ranges with its index.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::Arc;
use std::thread;

use inset_core::{
    Block, BoolMask, Column, ColumnValue, ColumnWithTypeAndName, DataType, Error,
    KeyTuplePositionMapping, OverflowMode, Range, Set, SetConfig, SetVariantKind, SizeLimits,
};
use proptest::prelude::*;

fn block(columns: Vec<(&str, DataType, Vec<ColumnValue>)>) -> Block {
    Block::new(
        columns
            .into_iter()
            .map(|(name, data_type, values)| {
                let column = Column::from_values(&data_type, &values).expect("column");
                ColumnWithTypeAndName::new(column, data_type, name)
            })
            .collect(),
    )
}

fn ids(values: &[u64]) -> Block {
    block(vec![(
        "id",
        DataType::UInt64,
        values.iter().map(|v| ColumnValue::UInt(*v)).collect(),
    )])
}

fn build(config: &SetConfig, blocks: &[Block]) -> Set {
    let set = Set::from_config(config);
    set.set_header(&blocks[0]).expect("header");
    for block in blocks {
        set.insert_from_block(block).expect("insert");
    }
    set.finish_insert();
    set
}

#[test]
fn test_streamed_build_probe_and_prune() {
    let config = SetConfig::from_toml_str("fill_elements = true").expect("config");
    let set = build(&config, &[ids(&[10, 20]), ids(&[20, 30]), ids(&[40])]);

    assert_eq!(set.variant_kind(), Some(SetVariantKind::Key64));
    assert_eq!(set.total_row_count(), 4);
    assert_eq!(
        set.execute(&ids(&[5, 10, 30, 35]), false).expect("execute"),
        vec![false, true, true, false]
    );

    let index = set
        .build_range_index(vec![KeyTuplePositionMapping::new(0, 0)])
        .expect("index");
    let granules = [
        (Range::closed(0u64, 9u64), BoolMask::new(false, true)),
        (Range::closed(10u64, 19u64), BoolMask::new(true, true)),
        (Range::point(40u64), BoolMask::new(true, false)),
        (Range::left_bounded(41u64, true), BoolMask::new(false, true)),
    ];
    for (range, expected) in granules {
        let mask = index
            .check_in_range(&[range], &[DataType::UInt64])
            .expect("check");
        assert_eq!(mask, expected);
    }
}

#[test]
fn test_tuple_set_with_nullable_components() {
    let config = SetConfig {
        transform_null_in: true,
        ..SetConfig::default()
    };
    let nullable = DataType::nullable(DataType::String);
    let set = build(
        &config,
        &[block(vec![
            ("name", nullable.clone(), vec!["a".into(), ColumnValue::Null]),
            ("n", DataType::Int32, vec![1i64.into(), 2i64.into()]),
        ])],
    );
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Serialized));

    let probe = block(vec![
        ("name", nullable, vec![ColumnValue::Null, "a".into(), ColumnValue::Null]),
        ("n", DataType::Int64, vec![2i64.into(), 1i64.into(), 1i64.into()]),
    ]);
    assert_eq!(
        set.execute(&probe, false).expect("execute"),
        vec![true, true, false]
    );
}

#[test]
fn test_concurrent_probes_see_one_set() {
    let set = Arc::new(build(&SetConfig::default(), &[ids(&(0..1000u64).collect::<Vec<_>>())]));

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let probe: Vec<u64> = (t * 200..t * 200 + 200).collect();
                let found = set.execute(&ids(&probe), false).expect("execute");
                found.iter().filter(|f| **f).count()
            })
        })
        .collect();

    let hits: Vec<usize> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    assert_eq!(hits[..5], [200; 5]);
    assert_eq!(hits[5..], [0; 3]);
}

#[test]
fn test_concurrent_builders_share_one_table() {
    let set = Arc::new(Set::new(SizeLimits::unlimited(), false, false));
    set.set_header(&ids(&[])).expect("header");

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let values: Vec<u64> = (0..500).map(|i| i * 4 + t % 2).collect();
                set.insert_from_block(&ids(&values)).expect("insert")
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("thread"));
    }
    set.finish_insert();

    assert_eq!(set.total_row_count(), 1000);
    assert_eq!(
        set.execute(&ids(&[0, 1, 2, 1997]), false).expect("execute"),
        vec![true, true, false, true]
    );
}

#[test]
fn test_set_survives_a_file() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("subquery.set");

    let original = build(
        &SetConfig::default(),
        &[block(vec![
            ("d", DataType::Date, vec![19_000u64.into(), 19_001u64.into()]),
            ("s", DataType::FixedString(4), vec!["ab".into(), "cd".into()]),
        ])],
    );
    {
        let mut writer = BufWriter::new(File::create(&path).expect("create"));
        original.serialize(&mut writer).expect("serialize");
    }
    let restored = {
        let mut reader = BufReader::new(File::open(&path).expect("open"));
        Set::deserialize(&mut reader).expect("deserialize")
    };

    assert!(restored.is_created());
    assert_eq!(
        restored.variant_kind(),
        Some(SetVariantKind::Keys128 { null_bitmap: false })
    );
    let probe = block(vec![
        ("d", DataType::Date, vec![19_000u64.into(), 19_001u64.into()]),
        ("s", DataType::FixedString(4), vec!["ab".into(), "ab".into()]),
    ]);
    assert_eq!(restored.execute(&probe, false).expect("execute"), vec![true, false]);
}

#[test]
fn test_size_limit_policy_from_config() {
    let config = SetConfig {
        limits: SizeLimits::new(2, 0, OverflowMode::Throw),
        ..SetConfig::default()
    };
    let set = Set::from_config(&config);
    set.set_header(&ids(&[])).expect("header");

    assert!(set.insert_from_block(&ids(&[1, 2])).expect("insert"));
    assert!(!set.insert_from_block(&ids(&[3])).expect("insert"));
    let err = set.check_limits().expect_err("limit");
    assert!(matches!(err, Error::SizeLimitExceeded { .. }));
    assert_eq!(err.code(), "INSET-002");
}

proptest! {
    #[test]
    fn test_block_split_does_not_change_membership(
        values in proptest::collection::vec(0u64..200, 1..60),
        split in 0usize..60,
        probe in proptest::collection::vec(0u64..200, 1..40),
    ) {
        let split = split.min(values.len());
        let whole = build(&SetConfig::default(), &[ids(&values)]);
        let parts = build(
            &SetConfig::default(),
            &[ids(&values[split..]), ids(&values[..split])],
        );

        let distinct: BTreeSet<u64> = values.iter().copied().collect();
        prop_assert_eq!(whole.total_row_count(), distinct.len());
        prop_assert_eq!(parts.total_row_count(), distinct.len());

        let expected: Vec<bool> = probe.iter().map(|v| distinct.contains(v)).collect();
        prop_assert_eq!(whole.execute(&ids(&probe), false).expect("execute"), expected.clone());
        prop_assert_eq!(parts.execute(&ids(&probe), false).expect("execute"), expected);
    }

    #[test]
    fn test_serialized_set_answers_like_the_original(
        rows in proptest::collection::vec(("[a-c]{0,3}", 0i64..5), 0..30),
        probe in proptest::collection::vec(("[a-c]{0,3}", 0i64..5), 1..20),
    ) {
        let to_block = |rows: &[(String, i64)]| {
            block(vec![
                ("s", DataType::String, rows.iter().map(|r| ColumnValue::from(r.0.clone())).collect()),
                ("n", DataType::Int8, rows.iter().map(|r| ColumnValue::from(r.1)).collect()),
            ])
        };
        let original = build(&SetConfig::default(), &[to_block(&rows)]);

        let mut buf = Vec::new();
        original.serialize(&mut buf).expect("serialize");
        let restored = Set::deserialize(&mut buf.as_slice()).expect("deserialize");

        prop_assert_eq!(restored.total_row_count(), original.total_row_count());
        let probe = to_block(&probe);
        prop_assert_eq!(
            restored.execute(&probe, true).expect("execute"),
            original.execute(&probe, true).expect("execute")
        );
    }
}
