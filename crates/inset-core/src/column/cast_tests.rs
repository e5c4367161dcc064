//! Tests for accurate casting.

use super::{cast_accurate, cast_accurate_or_null, Column, ColumnValue, ColumnWithTypeAndName, DataType};
use crate::error::Error;

fn typed(data_type: DataType, values: &[ColumnValue]) -> ColumnWithTypeAndName {
    let column = Column::from_values(&data_type, values).unwrap();
    ColumnWithTypeAndName::new(column, data_type, "x")
}

#[test]
fn test_cast_accurate_widening() {
    let source = typed(DataType::UInt8, &[1u64.into(), 255u64.into()]);
    let result = cast_accurate(&source, &DataType::Int64).unwrap();
    assert_eq!(result.value_at(1), ColumnValue::Int(255));
}

#[test]
fn test_cast_accurate_rejects_overflow() {
    let source = typed(DataType::Int64, &[(-1i64).into()]);
    let err = cast_accurate(&source, &DataType::UInt32).unwrap_err();
    assert!(matches!(err, Error::CannotConvertType { ref to, .. } if to == "UInt32"));
}

#[test]
fn test_cast_accurate_rejects_null_into_plain() {
    let source = typed(DataType::nullable(DataType::UInt8), &[ColumnValue::Null]);
    assert!(cast_accurate(&source, &DataType::UInt16).is_err());
}

#[test]
fn test_cast_accurate_same_type_materializes_const() {
    let column = Column::constant(&DataType::String, &"k".into(), 2).unwrap();
    let source = ColumnWithTypeAndName::new(column, DataType::String, "s");
    let result = cast_accurate(&source, &DataType::String).unwrap();
    assert!(matches!(result, Column::Full(_)));
    assert_eq!(result.len(), 2);
}

#[test]
fn test_cast_accurate_or_null_maps_failures() {
    let source = typed(
        DataType::Float64,
        &[1.0f64.into(), 1.5f64.into(), (-2.0f64).into(), 300.0f64.into()],
    );
    let result = cast_accurate_or_null(&source, &DataType::UInt8).unwrap();

    assert!(result.is_nullable());
    assert_eq!(result.value_at(0), ColumnValue::UInt(1));
    assert!(result.is_null_at(1));
    assert!(result.is_null_at(2));
    assert!(result.is_null_at(3));
}

#[test]
fn test_cast_accurate_or_null_keeps_nulls() {
    let source = typed(
        DataType::nullable(DataType::Int32),
        &[ColumnValue::Null, 4i64.into()],
    );
    let result = cast_accurate_or_null(&source, &DataType::nullable(DataType::UInt64)).unwrap();
    assert!(result.is_null_at(0));
    assert_eq!(result.value_at(1), ColumnValue::UInt(4));
}
