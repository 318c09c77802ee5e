//! Trait implementations for `EwahBitmap`.

use crate::{EwahBitmap, Operation};
use alloc::vec::Vec;
use core::{
    convert::TryFrom,
    fmt,
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Sub, SubAssign},
};

/// Errors reported by [`EwahBitmap`] construction, decoding and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    /// A position was appended below the current logical length.
    OutOfOrder {
        /// The rejected position
        position: usize,
        /// Logical length at the time of the call
        size_in_bits: usize,
    },

    /// The position has no representable logical length.
    PositionOverflow {
        /// The rejected position
        position: usize,
    },

    /// A whole word was appended to a bitmap that does not end on a word
    /// boundary.
    Unaligned {
        /// Logical length at the time of the call
        size_in_bits: usize,
    },

    /// Serialized input ended early.
    Truncated {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Serialized words do not form a valid compressed bitmap.
    Malformed {
        /// What is wrong with the input
        reason: &'static str,
    },

    /// The compressed words cover a different number of words than the
    /// declared logical length needs.
    SizeMismatch {
        /// Declared logical length
        size_in_bits: usize,
        /// Words covered by the blocks
        words: u64,
    },

    /// An aggregation disagreed with the pairwise fold of the same inputs.
    Inconsistent {
        /// The operation that was checked
        operation: Operation,
    },
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                position,
                size_in_bits,
            } => write!(
                f,
                "position {position} is below the logical length {size_in_bits}; positions must be appended in increasing order"
            ),
            Self::PositionOverflow { position } => {
                write!(f, "position {position} is too large")
            }
            Self::Unaligned { size_in_bits } => write!(
                f,
                "cannot append a word at logical length {size_in_bits}, which is not a multiple of 64"
            ),
            Self::Truncated { expected, actual } => {
                write!(f, "input truncated: expected {expected} bytes, got {actual}")
            }
            Self::Malformed { reason } => write!(f, "malformed bitmap: {reason}"),
            Self::SizeMismatch {
                size_in_bits,
                words,
            } => write!(
                f,
                "blocks cover {words} words but a logical length of {size_in_bits} bits needs {}",
                size_in_bits.div_ceil(64)
            ),
            Self::Inconsistent { operation } => {
                write!(f, "{operation} aggregation disagrees with the pairwise fold")
            }
        }
    }
}

impl core::error::Error for BitmapError {}

impl Default for EwahBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&[usize]> for EwahBitmap {
    type Error = BitmapError;

    /// Builds a bitmap from strictly increasing positions.
    fn try_from(positions: &[usize]) -> Result<Self, Self::Error> {
        Self::from_sorted(positions.iter().copied())
    }
}

impl<const N: usize> TryFrom<[usize; N]> for EwahBitmap {
    type Error = BitmapError;

    fn try_from(positions: [usize; N]) -> Result<Self, Self::Error> {
        Self::from_sorted(positions)
    }
}

impl From<&EwahBitmap> for Vec<usize> {
    fn from(bitmap: &EwahBitmap) -> Self {
        bitmap.to_vec()
    }
}

impl fmt::Display for EwahBitmap {
    /// Formats the set positions, e.g. `{1, 2, 3}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Debug for EwahBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EwahBitmap")
            .field("size_in_bits", &self.size_in_bits)
            .field("rlw", &self.rlw)
            .field("words", &self.buffer)
            .finish()
    }
}

impl PartialEq for EwahBitmap {
    /// Two bitmaps are equal when they hold the same positions; the logical
    /// length and trailing zero words are ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.size_in_bits == other.size_in_bits && self.buffer == other.buffer {
            return true;
        }
        self.xor_cardinality(other) == 0
    }
}

impl Eq for EwahBitmap {}

// ============================================================================
// Operator Implementations
// ============================================================================

macro_rules! impl_binary_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident, $call:ident) => {
        impl $op for &EwahBitmap {
            type Output = EwahBitmap;

            #[inline]
            fn $method(self, rhs: Self) -> Self::Output {
                self.$call(rhs)
            }
        }

        impl $op for EwahBitmap {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self::Output {
                self.$call(&rhs)
            }
        }

        impl $op<&EwahBitmap> for EwahBitmap {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: &Self) -> Self::Output {
                self.$call(rhs)
            }
        }

        impl $assign<&Self> for EwahBitmap {
            #[inline]
            fn $assign_method(&mut self, rhs: &Self) {
                *self = self.$call(rhs);
            }
        }

        impl $assign for EwahBitmap {
            #[inline]
            fn $assign_method(&mut self, rhs: Self) {
                *self = self.$call(&rhs);
            }
        }
    };
}

impl_binary_op!(BitAnd, bitand, BitAndAssign, bitand_assign, and);
impl_binary_op!(BitOr, bitor, BitOrAssign, bitor_assign, or);
impl_binary_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, xor);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, and_not);

impl Not for &EwahBitmap {
    type Output = EwahBitmap;

    /// Complements the bitmap within its logical length.
    ///
    /// # Examples
    ///
    /// ```
    /// use ewah_bitmap::EwahBitmap;
    ///
    /// let a = EwahBitmap::from_sorted([0, 2])?;
    /// assert_eq!((!&a).to_vec(), vec![1]);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[inline]
    fn not(self) -> Self::Output {
        EwahBitmap::not(self)
    }
}

impl Not for EwahBitmap {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self::not(&self)
    }
}
