//! Tests for `Set`.

use super::{Set, SetVariantKind};
use crate::column::{Block, Column, ColumnValue, ColumnWithTypeAndName, DataType};
use crate::config::{OverflowMode, SetConfig, SizeLimits};
use crate::error::Error;
use crate::index::{KeyTuplePositionMapping, Range};

fn col(name: &str, data_type: DataType, values: Vec<ColumnValue>) -> ColumnWithTypeAndName {
    let column = Column::from_values(&data_type, &values).unwrap();
    ColumnWithTypeAndName::new(column, data_type, name)
}

fn u32_block(values: &[u64]) -> Block {
    Block::new(vec![col(
        "x",
        DataType::UInt32,
        values.iter().map(|v| ColumnValue::UInt(*v)).collect(),
    )])
}

fn nullable_u32_block(values: &[Option<u64>]) -> Block {
    Block::new(vec![col(
        "x",
        DataType::nullable(DataType::UInt32),
        values.iter().map(|v| ColumnValue::from(*v)).collect(),
    )])
}

fn built_set(values: &[u64]) -> Set {
    let set = Set::new(SizeLimits::unlimited(), true, false);
    let block = u32_block(values);
    set.set_header(&block).unwrap();
    assert!(set.insert_from_block(&block).unwrap());
    set.finish_insert();
    set
}

#[test]
fn test_insert_before_header_is_logical_error() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let err = set.insert_from_block(&u32_block(&[1])).unwrap_err();
    assert!(matches!(err, Error::Logical(_)));
    assert!(set.mark_distinct_block(&u32_block(&[1])).is_err());
}

#[test]
fn test_single_numeric_key_membership() {
    let set = built_set(&[1, 3, 5, 7, 7]);
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Key32));
    assert_eq!(set.total_row_count(), 4);
    assert!(set.is_created());

    let probe = u32_block(&[0, 1, 2, 7]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![false, true, false, true]);
    assert_eq!(set.execute(&probe, true).unwrap(), vec![true, false, true, false]);
}

#[test]
fn test_execute_edge_shapes() {
    let set = built_set(&[1]);
    assert!(set.execute(&u32_block(&[]), false).unwrap().is_empty());

    let err = set.execute(&Block::default(), false).unwrap_err();
    assert!(matches!(err, Error::Logical(_)));

    let mut wide = u32_block(&[1]);
    wide.insert(col("y", DataType::UInt8, vec![1u64.into()]));
    let err = set.execute(&wide, false).unwrap_err();
    assert!(matches!(err, Error::NumberOfColumnsDoesntMatch { left: 2, right: 1 }));
    assert!(err.to_string().contains("2 at left, 1 at right"));
}

#[test]
fn test_zero_key_set_is_constant() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    set.set_header(&Block::default()).unwrap();
    assert!(set.is_empty());
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Empty));

    let probe = u32_block(&[1, 2]);
    assert_eq!(set.execute(&probe, true).unwrap(), vec![true, true]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![false, false]);
}

#[test]
fn test_is_empty_before_header() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    assert!(set.is_empty());
    assert_eq!(set.variant_kind(), None);
    assert_eq!(set.total_row_count(), 0);
    assert_eq!(set.total_byte_count(), 0);
}

#[test]
fn test_header_without_rows_is_not_empty() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    set.set_header(&u32_block(&[])).unwrap();
    assert!(!set.is_empty());
    assert_eq!(set.total_row_count(), 0);

    let zero_keys = Set::new(SizeLimits::unlimited(), false, false);
    zero_keys.set_header(&Block::default()).unwrap();
    assert!(zero_keys.is_empty());
}

#[test]
fn test_set_header_is_idempotent() {
    let set = built_set(&[1]);
    let other = Block::header(&[("s", DataType::String), ("t", DataType::String)]);
    set.set_header(&other).unwrap();
    assert_eq!(set.get_data_types(), vec![DataType::UInt32]);
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Key32));
}

#[test]
fn test_nulls_never_match_without_transform_null_in() {
    let set = Set::new(SizeLimits::unlimited(), true, false);
    let block = nullable_u32_block(&[Some(1), None, Some(2)]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    assert_eq!(set.get_data_types(), vec![DataType::UInt32]);
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Key32));
    assert_eq!(set.total_row_count(), 2);
    assert_eq!(set.get_set_elements()[0].len(), 2);

    let probe = nullable_u32_block(&[None, Some(1), Some(3)]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![false, true, false]);
    assert_eq!(set.execute(&probe, true).unwrap(), vec![true, false, true]);
}

#[test]
fn test_transform_null_in_matches_null() {
    let set = Set::new(SizeLimits::unlimited(), false, true);
    let block = nullable_u32_block(&[None, Some(1)]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    assert_eq!(
        set.variant_kind(),
        Some(SetVariantKind::Keys128 { null_bitmap: true })
    );
    assert_eq!(set.total_row_count(), 2);

    let probe = nullable_u32_block(&[None, Some(1), Some(0)]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true, true, false]);
}

#[test]
fn test_transform_null_in_with_plain_stored_type() {
    let set = Set::new(SizeLimits::unlimited(), false, true);
    let block = u32_block(&[0, 1]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    let probe = nullable_u32_block(&[None, Some(0)]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![false, true]);

    set.insert_from_block(&nullable_u32_block(&[None])).unwrap();
    assert_eq!(set.total_row_count(), 2);
}

fn nullable_pair_block(
    types: (DataType, DataType),
    rows: &[(Option<i64>, Option<i64>)],
) -> Block {
    Block::new(vec![
        col("a", types.0, rows.iter().map(|r| ColumnValue::from(r.0)).collect()),
        col("b", types.1, rows.iter().map(|r| ColumnValue::from(r.1)).collect()),
    ])
}

#[test]
fn test_null_tuples_keep_real_components() {
    let set = Set::new(SizeLimits::unlimited(), true, true);
    let types = (
        DataType::nullable(DataType::Int32),
        DataType::nullable(DataType::Int32),
    );
    set.set_header(&nullable_pair_block(types.clone(), &[])).unwrap();

    set.insert_from_block(&nullable_pair_block(
        types.clone(),
        &[(None, Some(1)), (Some(3), Some(4)), (None, None)],
    ))
    .unwrap();
    set.insert_from_block(&nullable_pair_block(
        types,
        &[(None, Some(1)), (None, None), (None, Some(2))],
    ))
    .unwrap();

    let elements = set.get_set_elements();
    assert_eq!(set.total_row_count(), 4);
    assert_eq!(elements[0].len(), 4);
    let b: Vec<ColumnValue> = (0..4).map(|i| elements[1].value_at(i)).collect();
    let expected: Vec<ColumnValue> = vec![
        ColumnValue::Int(1),
        ColumnValue::Int(4),
        ColumnValue::Null,
        ColumnValue::Int(2),
    ];
    assert_eq!(b, expected);
    assert!(elements[0].is_null_at(0));
    assert_eq!(elements[0].value_at(1), ColumnValue::Int(3));
    assert_eq!((0..4).filter(|i| elements[0].is_null_at(*i)).count(), 3);
}

#[test]
fn test_pruning_on_column_paired_with_null() {
    let set = Set::new(SizeLimits::unlimited(), true, true);
    let types = (DataType::Int32, DataType::nullable(DataType::Int32));
    let rows = [(Some(5), None), (Some(7), Some(1))];
    set.set_header(&nullable_pair_block(types.clone(), &[])).unwrap();
    set.insert_from_block(&nullable_pair_block(types.clone(), &rows))
        .unwrap();

    let elements = set.get_set_elements();
    let a: Vec<ColumnValue> = (0..elements[0].len()).map(|i| elements[0].value_at(i)).collect();
    assert_eq!(a, vec![ColumnValue::Int(5), ColumnValue::Int(7)]);

    let by_a = set
        .build_range_index(vec![KeyTuplePositionMapping::new(0, 0)])
        .unwrap();
    let hit = by_a.check_in_range(&[Range::point(5i64)], &[DataType::Int32]).unwrap();
    assert!(hit.can_be_true);
    assert!(!hit.can_be_false);
    let miss = by_a.check_in_range(&[Range::point(0i64)], &[DataType::Int32]).unwrap();
    assert!(!miss.can_be_true);

    let by_b = set
        .build_range_index(vec![KeyTuplePositionMapping::new(0, 1)])
        .unwrap();
    let b_type = [DataType::nullable(DataType::Int32)];
    assert!(by_b.check_in_range(&[Range::point(1i64)], &b_type).unwrap().can_be_true);
    assert!(!by_b.check_in_range(&[Range::point(2i64)], &b_type).unwrap().can_be_true);

    let probe = nullable_pair_block(types, &[(Some(5), None), (Some(0), None)]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true, false]);
}

#[test]
fn test_pruning_when_first_component_is_null() {
    let set = Set::new(SizeLimits::unlimited(), true, true);
    let types = (DataType::nullable(DataType::Int32), DataType::Int32);
    set.set_header(&nullable_pair_block(types.clone(), &[])).unwrap();
    set.insert_from_block(&nullable_pair_block(types.clone(), &[(None, Some(1))]))
        .unwrap();

    let probe = nullable_pair_block(types, &[(None, Some(1))]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true]);

    let by_b = set
        .build_range_index(vec![KeyTuplePositionMapping::new(0, 1)])
        .unwrap();
    let mask = by_b
        .check_in_range(&[Range::point(1i64)], &[DataType::Int32])
        .unwrap();
    assert!(mask.can_be_true);
}

#[test]
fn test_fill_elements_keeps_distinct_components() {
    let set = built_set(&[1, 2, 2, 3]);
    set.insert_from_block(&u32_block(&[3, 4])).unwrap();

    let elements = set.get_set_elements();
    let values: Vec<ColumnValue> = (0..elements[0].len()).map(|i| elements[0].value_at(i)).collect();
    let expected: Vec<ColumnValue> = [1u64, 2, 3, 4].into_iter().map(ColumnValue::UInt).collect();
    assert_eq!(values, expected);
    assert_eq!(set.get_elements_types(), vec![DataType::UInt32]);
    assert!(set.has_explicit_set_elements());
}

#[test]
fn test_without_fill_elements_no_projection() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let block = u32_block(&[1, 2]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    assert!(set.get_set_elements().is_empty());
    assert!(!set.has_explicit_set_elements());
    let err = set.build_range_index(vec![KeyTuplePositionMapping::new(0, 0)]).unwrap_err();
    assert!(matches!(err, Error::Logical(_)));
}

#[test]
fn test_mark_distinct_block_inserts_keys_only() {
    let set = built_set(&[1, 2]);
    let mask = set.mark_distinct_block(&u32_block(&[2, 3, 3, 4])).unwrap();
    assert_eq!(mask, vec![false, true, false, true]);
    assert_eq!(set.total_row_count(), 4);
    assert_eq!(set.get_set_elements()[0].len(), 2);
    assert_eq!(
        set.execute(&u32_block(&[3, 4, 5]), false).unwrap(),
        vec![true, true, false]
    );
}

#[test]
fn test_mark_distinct_block_twice_marks_nothing_new() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let block = u32_block(&[5, 6]);
    set.set_header(&block).unwrap();

    assert_eq!(set.mark_distinct_block(&block).unwrap(), vec![true, true]);
    assert_eq!(set.mark_distinct_block(&block).unwrap(), vec![false, false]);
    assert_eq!(set.total_row_count(), 2);
    assert_eq!(set.execute(&block, false).unwrap(), vec![true, true]);
}

#[test]
fn test_mark_distinct_block_skips_nulls() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    set.set_header(&nullable_u32_block(&[])).unwrap();
    let mask = set
        .mark_distinct_block(&nullable_u32_block(&[None, Some(1), None]))
        .unwrap();
    assert_eq!(mask, vec![false, true, false]);
}

#[test]
fn test_const_and_low_cardinality_inputs() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let lc_type = DataType::low_cardinality(DataType::String);
    let dictionary = Column::from_values(&DataType::String, &["a".into(), "b".into()]).unwrap();
    let lc = Column::low_cardinality(dictionary, vec![1, 1, 0]).unwrap();
    let block = Block::new(vec![ColumnWithTypeAndName::new(lc, lc_type, "s")]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    assert_eq!(set.get_data_types(), vec![DataType::String]);
    assert_eq!(set.variant_kind(), Some(SetVariantKind::KeyString));
    assert_eq!(set.total_row_count(), 2);

    let constant = Column::constant(&DataType::String, &"b".into(), 3).unwrap();
    let probe = Block::new(vec![ColumnWithTypeAndName::new(constant, DataType::String, "s")]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true, true, true]);
}

#[test]
fn test_fixed_string_and_serialized_keys() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let block = Block::new(vec![
        col("s", DataType::String, vec!["ab".into(), "a".into()]),
        col("n", DataType::UInt64, vec![1u64.into(), 21u64.into()]),
    ]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();
    assert_eq!(set.variant_kind(), Some(SetVariantKind::Serialized));

    let probe = Block::new(vec![
        col("s", DataType::String, vec!["ab".into(), "a".into(), "a".into()]),
        col("n", DataType::UInt64, vec![1u64.into(), 1u64.into(), 21u64.into()]),
    ]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true, false, true]);

    let fixed = Set::new(SizeLimits::unlimited(), false, false);
    let block = Block::new(vec![col("f", DataType::FixedString(40), vec!["x".into()])]);
    fixed.set_header(&block).unwrap();
    fixed.insert_from_block(&block).unwrap();
    assert_eq!(fixed.variant_kind(), Some(SetVariantKind::KeyString));
    assert_eq!(fixed.execute(&block, false).unwrap(), vec![true]);
}

#[test]
fn test_packed_keys256() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let block = Block::new(vec![
        col("a", DataType::UInt64, vec![1u64.into(), 1u64.into()]),
        col("b", DataType::Int64, vec![(-1i64).into(), 2i64.into()]),
        col("c", DataType::Float64, vec![0.5f64.into(), 0.5f64.into()]),
    ]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();
    assert_eq!(
        set.variant_kind(),
        Some(SetVariantKind::Keys256 { null_bitmap: false })
    );

    let probe = Block::new(vec![
        col("a", DataType::UInt64, vec![1u64.into(), 1u64.into()]),
        col("b", DataType::Int64, vec![(-1i64).into(), (-2i64).into()]),
        col("c", DataType::Float64, vec![0.5f64.into(), 0.5f64.into()]),
    ]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![true, false]);
}

#[test]
fn test_probe_values_outside_stored_type_are_not_found() {
    let set = Set::new(SizeLimits::unlimited(), false, false);
    let block = Block::new(vec![col("x", DataType::UInt8, vec![1u64.into()])]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    let probe = Block::new(vec![col(
        "x",
        DataType::Int64,
        vec![(-1i64).into(), 1i64.into(), 300i64.into()],
    )]);
    assert_eq!(set.execute(&probe, false).unwrap(), vec![false, true, false]);
}

#[test]
fn test_probe_cast_failure_with_transform_null_in() {
    let set = Set::new(SizeLimits::unlimited(), false, true);
    let block = u32_block(&[1]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();

    let probe = Block::new(vec![col("x", DataType::String, vec!["1".into()])]);
    let err = set.execute(&probe, false).unwrap_err();
    assert!(matches!(err, Error::CannotConvertType { .. }));
}

#[test]
fn test_insert_casts_to_stored_type() {
    let set = built_set(&[1]);
    let wider = Block::new(vec![col("x", DataType::Int64, vec![5i64.into()])]);
    set.insert_from_block(&wider).unwrap();
    assert_eq!(set.execute(&u32_block(&[5]), false).unwrap(), vec![true]);
}

#[test]
fn test_types_equal_ignores_wrappers() {
    let set = built_set(&[1]);
    assert!(set.are_types_equal(
        0,
        &DataType::low_cardinality(DataType::nullable(DataType::UInt32))
    ));
    assert!(!set.are_types_equal(0, &DataType::UInt64));
    assert!(!set.are_types_equal(3, &DataType::UInt32));

    set.check_types_equal(0, &DataType::nullable(DataType::UInt32))
        .unwrap();
    let err = set.check_types_equal(0, &DataType::String).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("String"));
    assert!(message.contains("UInt32"));
    assert!(message.contains("column 1"));
    assert!(set.check_types_equal(1, &DataType::String).is_err());
}

#[test]
fn test_check_columns_number() {
    let set = built_set(&[1]);
    set.check_columns_number(1).unwrap();
    assert!(matches!(
        set.check_columns_number(3),
        Err(Error::NumberOfColumnsDoesntMatch { left: 3, right: 1 })
    ));
}

#[test]
fn test_size_limit_crossing() {
    let set = Set::new(SizeLimits::new(3, 0, OverflowMode::Throw), false, false);
    set.set_header(&u32_block(&[])).unwrap();

    assert!(set.insert_from_block(&u32_block(&[1, 2])).unwrap());
    assert!(set.check_limits().unwrap());
    assert!(!set.insert_from_block(&u32_block(&[3, 4])).unwrap());
    assert_eq!(set.total_row_count(), 4);
    assert!(!set.insert_from_block(&u32_block(&[])).unwrap());

    let err = set.check_limits().unwrap_err();
    assert!(matches!(err, Error::SizeLimitExceeded { rows: 4, max_rows: 3, .. }));
}

#[test]
fn test_size_limit_break_mode() {
    let set = Set::new(SizeLimits::new(1, 0, OverflowMode::Break), false, false);
    let block = u32_block(&[1, 2]);
    set.set_header(&block).unwrap();
    assert!(!set.insert_from_block(&block).unwrap());
    assert!(!set.check_limits().unwrap());
}

#[test]
fn test_serialize_round_trip() {
    let set = Set::new(SizeLimits::new(100, 0, OverflowMode::Throw), true, false);
    let block = Block::new(vec![
        col("s", DataType::String, vec!["x".into(), "y".into()]),
        col("n", DataType::nullable(DataType::Int16), vec![1i64.into(), ColumnValue::Null]),
    ]);
    set.set_header(&block).unwrap();
    set.insert_from_block(&block).unwrap();
    set.finish_insert();

    let mut buf = Vec::new();
    set.serialize(&mut buf).unwrap();
    let restored = Set::deserialize(&mut buf.as_slice()).unwrap();

    assert_eq!(restored.limits(), set.limits());
    assert!(restored.fill_elements());
    assert!(!restored.transform_null_in());
    assert!(restored.is_created());
    assert_eq!(restored.get_data_types(), set.get_data_types());
    assert_eq!(restored.variant_kind(), set.variant_kind());
    assert_eq!(restored.total_row_count(), 1);
    assert!(!restored.has_explicit_set_elements());

    let probe = Block::new(vec![
        col("s", DataType::String, vec!["x".into(), "y".into(), "x".into()]),
        col("n", DataType::Int16, vec![1i64.into(), 1i64.into(), 2i64.into()]),
    ]);
    assert_eq!(
        restored.execute(&probe, false).unwrap(),
        set.execute(&probe, false).unwrap()
    );
}

#[test]
fn test_serialize_without_header() {
    let set = Set::new(SizeLimits::unlimited(), false, true);
    let mut buf = Vec::new();
    set.serialize(&mut buf).unwrap();

    let restored = Set::deserialize(&mut buf.as_slice()).unwrap();
    assert!(restored.is_empty());
    assert!(restored.transform_null_in());
    assert!(!restored.is_created());
}

#[test]
fn test_deserialize_rejects_truncated_payload() {
    let set = built_set(&[1, 2, 3]);
    let mut buf = Vec::new();
    set.serialize(&mut buf).unwrap();

    let truncated = &buf[..buf.len() - 5];
    assert!(Set::deserialize(&mut &truncated[..]).is_err());

    let mut bad_flag = buf.clone();
    let last = bad_flag.len() - 1;
    bad_flag[last] = 7;
    let err = Set::deserialize(&mut bad_flag.as_slice()).unwrap_err();
    assert!(matches!(err, Error::CorruptedData(_)));
}

#[test]
fn test_deserialize_rejects_oversized_header() {
    let set = built_set(&[1]);
    let mut buf = Vec::new();
    set.serialize(&mut buf).unwrap();

    let mut limits = Vec::new();
    super::codec::write_bincode(&mut limits, &set.limits()).unwrap();
    // limits, two flags, schema length, then the first column name length
    let name_len = limits.len() + 2 + 8;
    assert_eq!(&buf[name_len..name_len + 8], &1u64.to_le_bytes());

    let mut oversized = buf.clone();
    oversized[name_len..name_len + 8].copy_from_slice(&(1u64 << 42).to_le_bytes());
    let err = Set::deserialize(&mut oversized.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));

    let truncated = &buf[..name_len + 4];
    assert!(Set::deserialize(&mut &truncated[..]).is_err());
}

#[test]
fn test_build_range_index_from_set() {
    let set = built_set(&[1, 3, 5, 7]);
    let index = set
        .build_range_index(vec![KeyTuplePositionMapping::new(0, 0)])
        .unwrap();
    assert_eq!(index.size(), 4);

    let mask = index
        .check_in_range(&[Range::point(3u64)], &[DataType::UInt32])
        .unwrap();
    assert!(mask.can_be_true);
    assert!(!mask.can_be_false);
}

#[test]
fn test_from_config() {
    let config = SetConfig {
        limits: SizeLimits::new(10, 0, OverflowMode::Break),
        fill_elements: true,
        transform_null_in: true,
    };
    let set = Set::from_config(&config);
    assert_eq!(set.limits(), config.limits);
    assert!(set.fill_elements());
    assert!(set.transform_null_in());
}
