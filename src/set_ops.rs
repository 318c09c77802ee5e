//! Set algebra on the compressed form.
//!
//! Every binary operation runs one shared merge loop over two cursors. The
//! loop alternates between two steps:
//!
//! - run step: while either input sits on a run, the input with the longer
//!   run (the predator) decides what happens to the words of the other input
//!   (the prey) overlapping that run. Depending on the operation and the
//!   predator's running bit, the overlap becomes a uniform run without looking
//!   at the prey, a copy of the prey, or a negated copy of the prey.
//! - literal step: once both inputs sit on literal words, the operation is
//!   applied word by word to the overlapping literals.
//!
//! When one input runs out, its missing tail reads as zeros.

use crate::{
    EwahBitmap,
    cursor::{RlwCursor, discharge, discharge_all, discharge_as_empty},
    storage::{BitCounter, BitmapStorage, Word},
};

/// A binary boolean operation on bitmaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Intersection, `a & b`.
    And,
    /// Union, `a | b`.
    Or,
    /// Symmetric difference, `a ^ b`.
    Xor,
    /// Difference, `a & !b`.
    AndNot,
}

impl Operation {
    /// Applies the operation to two words.
    ///
    /// # Examples
    ///
    /// ```
    /// use ewah_bitmap::Operation;
    ///
    /// assert_eq!(Operation::And.apply(0b1100, 0b1010), 0b1000);
    /// assert_eq!(Operation::AndNot.apply(0b1100, 0b1010), 0b0100);
    /// ```
    #[inline(always)]
    #[must_use]
    pub const fn apply(self, left: Word, right: Word) -> Word {
        match self {
            Self::And => left & right,
            Self::Or => left | right,
            Self::Xor => left ^ right,
            Self::AndNot => left & !right,
        }
    }

    /// Lower-case name of the operation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::AndNot => "and_not",
        }
    }

    /// What the operation does to the prey words under a predator run of
    /// `bit`.
    const fn run_outcome(self, bit: bool, predator_is_left: bool) -> RunOutcome {
        match (self, bit) {
            (Self::Or, true) => RunOutcome::Fill(true),
            (Self::Or, false) | (Self::And, true) | (Self::Xor, false) => RunOutcome::Copy,
            (Self::And, false) => RunOutcome::Fill(false),
            (Self::Xor, true) => RunOutcome::Negate,
            (Self::AndNot, bit) => match (predator_is_left, bit) {
                (true, false) | (false, true) => RunOutcome::Fill(false),
                (true, true) => RunOutcome::Negate,
                (false, false) => RunOutcome::Copy,
            },
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunOutcome {
    Fill(bool),
    Copy,
    Negate,
}

/// Merges two compressed streams with `operation`, writing the result into
/// `out`.
///
/// Cursors can be bitmap cursors, lazy aggregates or anything else
/// implementing [`RlwCursor`], which lets results of one merge feed into the
/// next without being materialized. The logical length written to `out` is
/// the larger of the two input lengths.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, Operation, merge, storage::BitCounter};
///
/// let a = EwahBitmap::from_sorted([1, 2, 3])?;
/// let b = EwahBitmap::from_sorted([2, 3, 4])?;
///
/// let mut counter = BitCounter::new();
/// merge(Operation::Xor, a.cursor(), b.cursor(), &mut counter);
/// assert_eq!(counter.count(), 2);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
pub fn merge<A, B, S>(operation: Operation, mut left: A, mut right: B, out: &mut S)
where
    A: RlwCursor,
    B: RlwCursor,
    S: BitmapStorage + ?Sized,
{
    let size_in_bits = left.size_in_bits().max(right.size_in_bits());

    while left.size() > 0 && right.size() > 0 {
        while (left.running_length() > 0 || right.running_length() > 0)
            && left.size() > 0
            && right.size() > 0
        {
            if left.running_length() < right.running_length() {
                let outcome = operation.run_outcome(right.running_bit(), false);
                consume_run(outcome, &mut right, &mut left, out);
            } else {
                let outcome = operation.run_outcome(left.running_bit(), true);
                consume_run(outcome, &mut left, &mut right, out);
            }
        }

        let overlap = left.literals().len().min(right.literals().len());
        if overlap > 0 {
            for (&l, &r) in left.literals()[..overlap]
                .iter()
                .zip(&right.literals()[..overlap])
            {
                out.add_word(operation.apply(l, r));
            }
            left.discard_literal_words(overlap);
            right.discard_literal_words(overlap);
        }
    }

    match operation {
        Operation::Or | Operation::Xor => {
            discharge_all(&mut left, out);
            discharge_all(&mut right, out);
        }
        Operation::And => {
            discharge_as_empty(&mut left, out);
            discharge_as_empty(&mut right, out);
        }
        Operation::AndNot => {
            discharge_all(&mut left, out);
            discharge_as_empty(&mut right, out);
        }
    }
    out.set_size_in_bits(size_in_bits);
}

/// Consumes the predator's run and the prey words it overlaps.
fn consume_run<P, Q, S>(outcome: RunOutcome, predator: &mut P, prey: &mut Q, out: &mut S)
where
    P: RlwCursor,
    Q: RlwCursor,
    S: BitmapStorage + ?Sized,
{
    let run = predator.running_length();
    match outcome {
        RunOutcome::Fill(bit) => {
            out.add_empty_words(bit, run);
            prey.discard_first_words(run);
        }
        RunOutcome::Copy => {
            let written = discharge(prey, out, run, false);
            out.add_empty_words(false, run - written);
        }
        RunOutcome::Negate => {
            let written = discharge(prey, out, run, true);
            out.add_empty_words(true, run - written);
        }
    }
    predator.discard_running_words();
}

impl EwahBitmap {
    /// Merges `self` with `other` into a new bitmap.
    #[must_use]
    pub fn apply(&self, operation: Operation, other: &Self) -> Self {
        let mut out = Self::with_capacity(self.buffer.len().max(other.buffer.len()));
        merge(operation, self.cursor(), other.cursor(), &mut out);
        out
    }

    fn count(&self, operation: Operation, other: &Self) -> usize {
        let mut counter = BitCounter::new();
        merge(operation, self.cursor(), other.cursor(), &mut counter);
        counter.count() as usize
    }

    /// Returns the intersection of `self` and `other`.
    ///
    /// The logical length of the result is the larger input length; bits
    /// beyond the shorter input are zero.
    ///
    /// Time complexity: O(n) where n is the total number of compressed
    /// words in both bitmaps.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let a = EwahBitmap::from_sorted([1, 64, 1000, 5000])?;
    /// let b = EwahBitmap::from_sorted([64, 5000, 9000])?;
    ///
    /// let both = a.and(&b);
    /// assert_eq!(both.to_vec(), vec![64, 5000]);
    /// assert_eq!(both.size_in_bits(), 9001);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.apply(Operation::And, other)
    }

    /// Returns the union of `self` and `other`.
    ///
    /// Time complexity: O(n) where n is the total number of compressed
    /// words in both bitmaps.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let a = EwahBitmap::from_sorted([1, 3])?;
    /// let b = EwahBitmap::from_sorted([2, 300])?;
    /// assert_eq!(a.or(&b).to_vec(), vec![1, 2, 3, 300]);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        self.apply(Operation::Or, other)
    }

    /// Returns the symmetric difference of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let a = EwahBitmap::from_sorted([1, 2, 3])?;
    /// let b = EwahBitmap::from_sorted([3, 4])?;
    /// assert_eq!(a.xor(&b).to_vec(), vec![1, 2, 4]);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        self.apply(Operation::Xor, other)
    }

    /// Returns the positions of `self` that are not in `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let a = EwahBitmap::from_sorted([1, 2, 3, 700])?;
    /// let b = EwahBitmap::from_sorted([2, 700])?;
    /// assert_eq!(a.and_not(&b).to_vec(), vec![1, 3]);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn and_not(&self, other: &Self) -> Self {
        self.apply(Operation::AndNot, other)
    }

    /// Cardinality of `self & other`, without building the result.
    #[must_use]
    pub fn and_cardinality(&self, other: &Self) -> usize {
        self.count(Operation::And, other)
    }

    /// Cardinality of `self | other`, without building the result.
    #[must_use]
    pub fn or_cardinality(&self, other: &Self) -> usize {
        self.count(Operation::Or, other)
    }

    /// Cardinality of `self ^ other`, without building the result.
    #[must_use]
    pub fn xor_cardinality(&self, other: &Self) -> usize {
        self.count(Operation::Xor, other)
    }

    /// Cardinality of `self & !other`, without building the result.
    #[must_use]
    pub fn and_not_cardinality(&self, other: &Self) -> usize {
        self.count(Operation::AndNot, other)
    }

    /// Returns `true` if the two bitmaps share at least one position.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.and_cardinality(other) > 0
    }

    /// Checks if this set is disjoint from another set.
    #[inline]
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        !self.intersects(other)
    }

    /// Checks if every position of `self` is also in `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let small = EwahBitmap::from_sorted([5, 900])?;
    /// let large = EwahBitmap::from_sorted([1, 5, 80, 900])?;
    /// assert!(small.is_subset(&large));
    /// assert!(!large.is_subset(&small));
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.and_not_cardinality(other) == 0
    }

    /// Checks if every position of `other` is also in `self`.
    #[inline]
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Intersection of all `bitmaps`, folded left to right.
    ///
    /// Returns an empty bitmap for an empty input. See
    /// [`fast_and`](crate::aggregate::fast_and) for the size-ordered variant.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let a = EwahBitmap::from_sorted([1, 2, 3])?;
    /// let b = EwahBitmap::from_sorted([2, 3])?;
    /// let c = EwahBitmap::from_sorted([3, 4])?;
    /// assert_eq!(EwahBitmap::and_all([&a, &b, &c]).to_vec(), vec![3]);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn and_all<'a, I>(bitmaps: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        Self::fold(Operation::And, bitmaps)
    }

    /// Union of all `bitmaps`, folded left to right.
    ///
    /// Returns an empty bitmap for an empty input.
    #[must_use]
    pub fn or_all<'a, I>(bitmaps: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        Self::fold(Operation::Or, bitmaps)
    }

    pub(crate) fn fold<'a, I>(operation: Operation, bitmaps: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut iter = bitmaps.into_iter();
        let Some(first) = iter.next() else {
            return Self::new();
        };
        iter.fold(first.clone(), |acc, next| acc.apply(operation, next))
    }
}
