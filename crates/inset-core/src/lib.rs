//! # Inset Core
//!
//! IN-predicate set engine with a sorted-tuple range index.
//!
//! A [`Set`] is the materialized right-hand side of `x IN (...)`: a multi-column
//! hash set built once from streamed blocks and then probed concurrently. A
//! [`RangeIndex`] built from the set's distinct elements answers whether a range of
//! keys can match the set at all, which lets storage layers skip partitions and
//! index granules.
//!
//! ## Features
//!
//! - **Shape-aware hashing**: one hash-table strategy per key shape, chosen once
//! - **NULL handling**: NULL keys are skipped, or treated as values with `transform_null_in`
//! - **Wire format**: ship a built set between nodes with `serialize`/`deserialize`
//! - **Range pruning**: three-valued answers through monotonic transform chains
//!
//! ## Quick Start
//!
//! ```rust
//! use inset_core::{
//!     Block, Column, ColumnValue, ColumnWithTypeAndName, DataType, KeyTuplePositionMapping,
//!     Range, Set, SizeLimits,
//! };
//!
//! fn main() -> inset_core::Result<()> {
//!     let set = Set::new(SizeLimits::unlimited(), true, false);
//!
//!     let values: Vec<ColumnValue> = [1u64, 3, 5, 7].into_iter().map(ColumnValue::from).collect();
//!     let column = Column::from_values(&DataType::UInt32, &values)?;
//!     let block = Block::new(vec![ColumnWithTypeAndName::new(column, DataType::UInt32, "x")]);
//!
//!     set.set_header(&block)?;
//!     set.insert_from_block(&block)?;
//!     set.finish_insert();
//!
//!     let probe = Column::from_values(&DataType::UInt32, &[3u64.into(), 4u64.into()])?;
//!     let probe = Block::new(vec![ColumnWithTypeAndName::new(probe, DataType::UInt32, "x")]);
//!     assert_eq!(set.execute(&probe, false)?, vec![true, false]);
//!
//!     let index = set.build_range_index(vec![KeyTuplePositionMapping::new(0, 0)])?;
//!     let mask = index.check_in_range(&[Range::closed(2u64, 6u64)], &[DataType::UInt32])?;
//!     assert!(mask.can_be_true && mask.can_be_false);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::cast_lossless,
        clippy::float_cmp
    )
)]

pub mod column;
pub mod config;
pub mod error;
pub mod index;
pub mod set;

pub use column::{
    cast_accurate, cast_accurate_or_null, extract_nested_columns_and_null_map, Block, Column,
    ColumnValue, ColumnWithTypeAndName, DataType, TypedColumn,
};
pub use config::{ConfigError, OverflowMode, SetConfig, SizeLimits};
pub use error::{Error, Result};
pub use index::{
    apply_monotonic_functions_chain_to_range, BoolMask, Bound, FieldValue,
    KeyTuplePositionMapping, MonotonicFunction, MonotonicFunctionsChain, Monotonicity, Range,
    RangeIndex,
};
pub use set::{Set, SetVariantKind};
