//! Monotonic transforms and pushing ranges through them.
//!
//! A key condition such as `intDiv(x, 10) IN (...)` relates the indexed column `x`
//! to the set column through a chain of functions. When every function of the chain
//! is monotonic over the range being checked, the range of `x` can be mapped to a
//! range of the set column and the set index can answer for it.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use super::range::{Bound, Range};
use crate::column::{ColumnValue, DataType};

/// Seconds per day, used by [`ToDate`].
const SECONDS_PER_DAY: u64 = 86_400;

/// Monotonicity of a function over a range of arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Monotonicity {
    /// Order is preserved or reversed over the whole range
    pub is_monotonic: bool,
    /// Order is preserved (otherwise reversed)
    pub is_positive: bool,
    /// Distinct arguments give distinct results
    pub is_strict: bool,
}

impl Monotonicity {
    /// Not monotonic.
    pub const NONE: Self = Self {
        is_monotonic: false,
        is_positive: true,
        is_strict: false,
    };

    /// Monotonic with the given direction and strictness.
    #[must_use]
    pub const fn monotonic(is_positive: bool, is_strict: bool) -> Self {
        Self {
            is_monotonic: true,
            is_positive,
            is_strict,
        }
    }
}

/// A unary function that may be monotonic over some argument ranges.
pub trait MonotonicFunction: Debug + Send + Sync {
    /// Function name for logs and debugging.
    fn name(&self) -> &str;

    /// Monotonicity over `[left, right]` for arguments of `arg_type`.
    fn monotonicity_for_range(&self, arg_type: &DataType, left: &Bound, right: &Bound)
        -> Monotonicity;

    /// Applies the function, `None` when the result is not representable.
    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue>;

    /// Result type for arguments of `arg_type`.
    fn result_type(&self, arg_type: &DataType) -> DataType;
}

/// Ordered transforms from the indexed column to the set column.
pub type MonotonicFunctionsChain = Vec<Arc<dyn MonotonicFunction>>;

/// Pushes `range` through `chain`, starting from values of `data_type`.
///
/// Returns `None` when some function is not monotonic over the current range or
/// cannot be applied to a bound. Non-strict functions make both ends inclusive.
#[must_use]
pub fn apply_monotonic_functions_chain_to_range(
    range: &Range,
    chain: &[Arc<dyn MonotonicFunction>],
    data_type: &DataType,
) -> Option<Range> {
    let mut range = range.clone();
    let mut current_type = data_type.clone();

    for function in chain {
        let monotonicity =
            function.monotonicity_for_range(&current_type, &range.left, &range.right);
        if !monotonicity.is_monotonic {
            return None;
        }

        range.left = apply_to_bound(function.as_ref(), &range.left)?;
        range.right = apply_to_bound(function.as_ref(), &range.right)?;
        current_type = function.result_type(&current_type);

        if !monotonicity.is_strict {
            range.left_included = true;
            range.right_included = true;
        }
        if !monotonicity.is_positive {
            range.invert();
        }
    }
    Some(range)
}

fn apply_to_bound(function: &dyn MonotonicFunction, bound: &Bound) -> Option<Bound> {
    match bound {
        Bound::Value(value) => function.execute(value).map(Bound::Value),
        infinite => Some(infinite.clone()),
    }
}

fn as_i128(value: &ColumnValue) -> Option<i128> {
    match value {
        ColumnValue::UInt(u) => Some(i128::from(*u)),
        ColumnValue::Int(i) => Some(i128::from(*i)),
        ColumnValue::Bool(b) => Some(i128::from(*b)),
        _ => None,
    }
}

// Reason: integer arguments are converted only for float arithmetic.
#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &ColumnValue) -> Option<f64> {
    match value {
        ColumnValue::Float(f) => Some(*f),
        other => as_i128(other).map(|i| i as f64),
    }
}

/// Integer result, signed when it fits, unsigned above `i64::MAX`.
fn from_i128(value: i128) -> Option<ColumnValue> {
    i64::try_from(value)
        .map(ColumnValue::Int)
        .or_else(|_| u64::try_from(value).map(ColumnValue::UInt))
        .ok()
}

fn sign_of(bound: &Bound) -> Ordering {
    match bound {
        Bound::NegativeInfinity => Ordering::Less,
        Bound::PositiveInfinity => Ordering::Greater,
        Bound::Value(v) => v.total_cmp(&ColumnValue::Int(0), true),
    }
}

fn signed_result_type(arg_type: &DataType) -> DataType {
    match arg_type.remove_nullable() {
        DataType::Float32 | DataType::Float64 => DataType::Float64,
        _ => DataType::Int64,
    }
}

/// `-x`
#[derive(Debug, Clone, Copy, Default)]
pub struct Negate;

impl MonotonicFunction for Negate {
    fn name(&self) -> &str {
        "negate"
    }

    fn monotonicity_for_range(&self, _: &DataType, _: &Bound, _: &Bound) -> Monotonicity {
        Monotonicity::monotonic(false, true)
    }

    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        match value {
            ColumnValue::Float(f) => Some(ColumnValue::Float(-f)),
            other => from_i128(-as_i128(other)?),
        }
    }

    fn result_type(&self, arg_type: &DataType) -> DataType {
        signed_result_type(arg_type)
    }
}

/// `x + constant`
#[derive(Debug, Clone, PartialEq)]
pub struct AddConstant(pub ColumnValue);

impl MonotonicFunction for AddConstant {
    fn name(&self) -> &str {
        "plus"
    }

    fn monotonicity_for_range(&self, _: &DataType, _: &Bound, _: &Bound) -> Monotonicity {
        Monotonicity::monotonic(true, true)
    }

    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        match (as_i128(value), as_i128(&self.0)) {
            (Some(a), Some(b)) => from_i128(a.checked_add(b)?),
            _ => Some(ColumnValue::Float(as_f64(value)? + as_f64(&self.0)?)),
        }
    }

    fn result_type(&self, arg_type: &DataType) -> DataType {
        match (&self.0, arg_type.remove_nullable()) {
            (ColumnValue::Float(_), _) | (_, DataType::Float32 | DataType::Float64) => {
                DataType::Float64
            }
            _ => DataType::Int64,
        }
    }
}

/// `x * factor`; decreasing for a negative factor, constant for zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplyBy(pub ColumnValue);

impl MonotonicFunction for MultiplyBy {
    fn name(&self) -> &str {
        "multiply"
    }

    fn monotonicity_for_range(&self, _: &DataType, _: &Bound, _: &Bound) -> Monotonicity {
        match self.0.total_cmp(&ColumnValue::Int(0), true) {
            Ordering::Greater => Monotonicity::monotonic(true, true),
            Ordering::Less => Monotonicity::monotonic(false, true),
            Ordering::Equal => Monotonicity::monotonic(true, false),
        }
    }

    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        match (as_i128(value), as_i128(&self.0)) {
            (Some(a), Some(b)) => from_i128(a.checked_mul(b)?),
            _ => Some(ColumnValue::Float(as_f64(value)? * as_f64(&self.0)?)),
        }
    }

    fn result_type(&self, arg_type: &DataType) -> DataType {
        match (&self.0, arg_type.remove_nullable()) {
            (ColumnValue::Float(_), _) | (_, DataType::Float32 | DataType::Float64) => {
                DataType::Float64
            }
            _ => DataType::Int64,
        }
    }
}

/// `intDiv(x, divisor)`, rounding toward zero. Not monotonic for a zero divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntDiv(pub i64);

impl MonotonicFunction for IntDiv {
    fn name(&self) -> &str {
        "intDiv"
    }

    fn monotonicity_for_range(&self, _: &DataType, _: &Bound, _: &Bound) -> Monotonicity {
        match self.0.cmp(&0) {
            Ordering::Greater => Monotonicity::monotonic(true, false),
            Ordering::Less => Monotonicity::monotonic(false, false),
            Ordering::Equal => Monotonicity::NONE,
        }
    }

    // Reason: the float branch truncates toward zero, like integer division.
    #[allow(clippy::cast_possible_truncation)]
    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        if self.0 == 0 {
            return None;
        }
        let numerator = match value {
            ColumnValue::Float(f) if f.is_finite() && f.abs() < 1.0e38 => f.trunc() as i128,
            ColumnValue::Float(_) => return None,
            other => as_i128(other)?,
        };
        from_i128(numerator / i128::from(self.0))
    }

    fn result_type(&self, _: &DataType) -> DataType {
        DataType::Int64
    }
}

/// `toDate(x)`: seconds since epoch to days since epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToDate;

impl MonotonicFunction for ToDate {
    fn name(&self) -> &str {
        "toDate"
    }

    fn monotonicity_for_range(&self, _: &DataType, _: &Bound, _: &Bound) -> Monotonicity {
        Monotonicity::monotonic(true, false)
    }

    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        let seconds = u64::try_from(as_i128(value)?).ok()?;
        let days = seconds / SECONDS_PER_DAY;
        u16::try_from(days)
            .ok()
            .map(|d| ColumnValue::UInt(u64::from(d)))
    }

    fn result_type(&self, _: &DataType) -> DataType {
        DataType::Date
    }
}

/// `abs(x)`: monotonic only on ranges that do not cross zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Abs;

impl MonotonicFunction for Abs {
    fn name(&self) -> &str {
        "abs"
    }

    fn monotonicity_for_range(&self, _: &DataType, left: &Bound, right: &Bound) -> Monotonicity {
        if sign_of(left) != Ordering::Less {
            Monotonicity::monotonic(true, true)
        } else if sign_of(right) != Ordering::Greater {
            Monotonicity::monotonic(false, true)
        } else {
            Monotonicity::NONE
        }
    }

    fn execute(&self, value: &ColumnValue) -> Option<ColumnValue> {
        match value {
            ColumnValue::Float(f) => Some(ColumnValue::Float(f.abs())),
            other => from_i128(as_i128(other)?.abs()),
        }
    }

    fn result_type(&self, arg_type: &DataType) -> DataType {
        arg_type.remove_nullable()
    }
}
