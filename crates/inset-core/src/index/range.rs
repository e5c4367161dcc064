//! Key ranges and three-valued masks.

use std::cmp::Ordering;

use crate::column::ColumnValue;

/// One end of a [`Range`].
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Below every value
    NegativeInfinity,
    /// A concrete value
    Value(ColumnValue),
    /// Above every value
    PositiveInfinity,
}

impl Bound {
    /// Returns true for either infinity.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    /// Returns the concrete value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&ColumnValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Orders bounds, infinities outside every value.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::NegativeInfinity, Self::NegativeInfinity)
            | (Self::PositiveInfinity, Self::PositiveInfinity) => Ordering::Equal,
            (Self::NegativeInfinity, _) | (_, Self::PositiveInfinity) => Ordering::Less,
            (_, Self::NegativeInfinity) | (Self::PositiveInfinity, _) => Ordering::Greater,
            (Self::Value(a), Self::Value(b)) => a.total_cmp(b, true),
        }
    }
}

impl From<ColumnValue> for Bound {
    fn from(value: ColumnValue) -> Self {
        Self::Value(value)
    }
}

/// A range of key values, each end open or closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    /// Lower end
    pub left: Bound,
    /// Upper end
    pub right: Bound,
    /// Lower end is part of the range
    pub left_included: bool,
    /// Upper end is part of the range
    pub right_included: bool,
}

impl Range {
    /// `[value, value]`
    #[must_use]
    pub fn point(value: impl Into<ColumnValue>) -> Self {
        let value = value.into();
        Self::closed(value.clone(), value)
    }

    /// `[left, right]`
    #[must_use]
    pub fn closed(left: impl Into<ColumnValue>, right: impl Into<ColumnValue>) -> Self {
        Self {
            left: Bound::Value(left.into()),
            right: Bound::Value(right.into()),
            left_included: true,
            right_included: true,
        }
    }

    /// `(left, right)`
    #[must_use]
    pub fn open(left: impl Into<ColumnValue>, right: impl Into<ColumnValue>) -> Self {
        Self {
            left: Bound::Value(left.into()),
            right: Bound::Value(right.into()),
            left_included: false,
            right_included: false,
        }
    }

    /// `[left, +inf)` or `(left, +inf)`
    #[must_use]
    pub fn left_bounded(left: impl Into<ColumnValue>, included: bool) -> Self {
        Self {
            left: Bound::Value(left.into()),
            right: Bound::PositiveInfinity,
            left_included: included,
            right_included: true,
        }
    }

    /// `(-inf, right]` or `(-inf, right)`
    #[must_use]
    pub fn right_bounded(right: impl Into<ColumnValue>, included: bool) -> Self {
        Self {
            left: Bound::NegativeInfinity,
            right: Bound::Value(right.into()),
            left_included: true,
            right_included: included,
        }
    }

    /// `(-inf, +inf)`
    #[must_use]
    pub fn whole_universe() -> Self {
        Self {
            left: Bound::NegativeInfinity,
            right: Bound::PositiveInfinity,
            left_included: true,
            right_included: true,
        }
    }

    /// Mirrors the range for a decreasing transform: the ends and their
    /// inclusivity swap, infinities change sign.
    pub fn invert(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
        std::mem::swap(&mut self.left_included, &mut self.right_included);
        if self.left == Bound::PositiveInfinity {
            self.left = Bound::NegativeInfinity;
        }
        if self.right == Bound::NegativeInfinity {
            self.right = Bound::PositiveInfinity;
        }
    }

    /// Returns true if `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: &ColumnValue) -> bool {
        let point = Bound::Value(value.clone());
        let above_left = match point.total_cmp(&self.left) {
            Ordering::Greater => true,
            Ordering::Equal => self.left_included,
            Ordering::Less => false,
        };
        let below_right = match point.total_cmp(&self.right) {
            Ordering::Less => true,
            Ordering::Equal => self.right_included,
            Ordering::Greater => false,
        };
        above_left && below_right
    }
}

/// Whether a condition can hold, and can fail to hold, somewhere in a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolMask {
    /// Some row in the range may satisfy the condition
    pub can_be_true: bool,
    /// Some row in the range may fail the condition
    pub can_be_false: bool,
}

impl BoolMask {
    /// Nothing is known.
    pub const UNKNOWN: Self = Self::new(true, true);

    /// Creates a mask.
    #[must_use]
    pub const fn new(can_be_true: bool, can_be_false: bool) -> Self {
        Self {
            can_be_true,
            can_be_false,
        }
    }

    /// Mask of `a AND b`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        Self::new(
            self.can_be_true && other.can_be_true,
            self.can_be_false || other.can_be_false,
        )
    }

    /// Mask of `a OR b`.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        Self::new(
            self.can_be_true || other.can_be_true,
            self.can_be_false && other.can_be_false,
        )
    }

    /// Mask of `NOT a`.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self::new(self.can_be_false, self.can_be_true)
    }
}

impl From<(bool, bool)> for BoolMask {
    fn from((can_be_true, can_be_false): (bool, bool)) -> Self {
        Self::new(can_be_true, can_be_false)
    }
}
