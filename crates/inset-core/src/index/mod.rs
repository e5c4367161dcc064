//! Range pruning over set elements.
//!
//! [`RangeIndex`] sorts the distinct elements of a [`Set`](crate::Set) and answers,
//! for a hyperrectangle of key ranges, whether the set condition can be true and
//! whether it can be false somewhere inside it. Storage layers use the answer to
//! skip partitions or granules.

mod field_value;
mod monotonic;
mod range;
mod set_index;


pub use field_value::{compare, FieldValue};
pub use monotonic::{
    apply_monotonic_functions_chain_to_range, Abs, AddConstant, IntDiv, MonotonicFunction,
    MonotonicFunctionsChain, Monotonicity, MultiplyBy, Negate, ToDate,
};
pub use range::{BoolMask, Bound, Range};
pub use set_index::{KeyTuplePositionMapping, RangeIndex};
