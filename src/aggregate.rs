//! Multi-operand aggregation.
//!
//! Two families of entry points combine many bitmaps at once:
//!
//! - eager: [`fast_or`], [`fast_and`] and [`fast_xor`] return a new
//!   [`EwahBitmap`], picking a merge order that keeps intermediate results
//!   small;
//! - lazy: [`lazy_or`], [`lazy_and`] and [`lazy_xor`] return a
//!   [`LazyAggregate`], a cursor producing the merged stream one chunk at a
//!   time. It can be fed into further algebra through
//!   [`merge`](crate::merge) or another lazy aggregate, and is turned into a
//!   bitmap with [`materialize`].
//!
//! Every entry point produces the same positions and logical length as the
//! left-to-right pairwise fold of the same operation.

use alloc::{borrow::Cow, collections::BinaryHeap, vec::Vec};
use core::cmp::{Ordering, Reverse};

use tracing::{debug, error, trace};

use crate::{
    EwahBitmap, Operation,
    cursor::{RlwCursor, RlwView, discharge, discharge_all},
    storage::{BitmapStorage, Word},
    traits::BitmapError,
};

/// Default width of the dense window a [`LazyAggregate`] decompresses into,
/// in words.
pub const DEFAULT_BUFFER_WORDS: usize = 65_536;

/// An operation that can combine any number of bitmaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Intersection of every input.
    And,
    /// Union of every input.
    Or,
    /// Positions set in an odd number of inputs.
    Xor,
}

impl Aggregation {
    /// The pairwise operation this aggregation folds.
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::And => Operation::And,
            Self::Or => Operation::Or,
            Self::Xor => Operation::Xor,
        }
    }
}

/// Orders pending heap entries by compressed size.
struct BySize<'a>(Cow<'a, EwahBitmap>);

impl PartialEq for BySize<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.size_in_bytes() == other.0.size_in_bytes()
    }
}

impl Eq for BySize<'_> {}

impl PartialOrd for BySize<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BySize<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.size_in_bytes().cmp(&other.0.size_in_bytes())
    }
}

fn heap_merge<'a, I>(operation: Operation, bitmaps: I) -> EwahBitmap
where
    I: IntoIterator<Item = &'a EwahBitmap>,
{
    let mut heap: BinaryHeap<Reverse<BySize<'a>>> = bitmaps
        .into_iter()
        .map(|b| Reverse(BySize(Cow::Borrowed(b))))
        .collect();
    debug!(%operation, inputs = heap.len(), "heap aggregation");

    loop {
        let Some(Reverse(BySize(first))) = heap.pop() else {
            return EwahBitmap::new();
        };
        let Some(Reverse(BySize(second))) = heap.pop() else {
            return first.into_owned();
        };
        heap.push(Reverse(BySize(Cow::Owned(first.apply(operation, &second)))));
    }
}

/// Union of all `bitmaps`.
///
/// Repeatedly merges the two smallest pending bitmaps, so large inputs take
/// part in as few merges as possible.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, aggregate::fast_or};
///
/// let a = EwahBitmap::from_sorted([1, 100])?;
/// let b = EwahBitmap::from_sorted([2])?;
/// let c = EwahBitmap::from_sorted([100, 5000])?;
/// assert_eq!(fast_or([&a, &b, &c]).to_vec(), vec![1, 2, 100, 5000]);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
#[must_use]
pub fn fast_or<'a, I>(bitmaps: I) -> EwahBitmap
where
    I: IntoIterator<Item = &'a EwahBitmap>,
{
    heap_merge(Operation::Or, bitmaps)
}

/// Symmetric difference of all `bitmaps`: positions set in an odd number of
/// inputs.
#[must_use]
pub fn fast_xor<'a, I>(bitmaps: I) -> EwahBitmap
where
    I: IntoIterator<Item = &'a EwahBitmap>,
{
    heap_merge(Operation::Xor, bitmaps)
}

/// Intersection of all `bitmaps`.
///
/// Folds the inputs from the smallest to the largest and stops as soon as the
/// running result is empty. The logical length of the result is still the
/// largest input length.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, aggregate::fast_and};
///
/// let a = EwahBitmap::from_sorted([1, 2, 3, 70])?;
/// let b = EwahBitmap::from_sorted([2, 70])?;
/// let c = EwahBitmap::from_sorted([70, 400])?;
/// let all = fast_and([&a, &b, &c]);
/// assert_eq!(all.to_vec(), vec![70]);
/// assert_eq!(all.size_in_bits(), 401);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
#[must_use]
pub fn fast_and<'a, I>(bitmaps: I) -> EwahBitmap
where
    I: IntoIterator<Item = &'a EwahBitmap>,
{
    let mut sorted: Vec<&EwahBitmap> = bitmaps.into_iter().collect();
    debug!(inputs = sorted.len(), "size-ordered intersection");
    sorted.sort_by_key(|b| b.size_in_bytes());

    let Some((first, rest)) = sorted.split_first() else {
        return EwahBitmap::new();
    };
    let size_in_bits = sorted.iter().map(|b| b.size_in_bits()).max().unwrap_or(0);

    let mut result = EwahBitmap::clone(first);
    for bitmap in rest {
        if result.is_empty() {
            break;
        }
        result = result.and(bitmap);
    }
    result.pad_to(size_in_bits, false);
    result
}

/// Dense window the lazy aggregate decompresses inputs into.
///
/// Slots come into existence holding the identity of the aggregation the
/// first time an input reaches them, so the window is only as long as the
/// longest input written into it.
struct Window<'a> {
    words: &'a mut Vec<Word>,
    index: usize,
    aggregation: Aggregation,
}

impl Window<'_> {
    /// Grows the window to `end` slots.
    #[inline]
    fn reach(&mut self, end: usize) {
        if self.words.len() < end {
            let identity = match self.aggregation {
                Aggregation::And => Word::MAX,
                Aggregation::Or | Aggregation::Xor => 0,
            };
            self.words.resize(end, identity);
        }
    }

    #[inline]
    fn combine(&mut self, word: Word) {
        self.reach(self.index + 1);
        let slot = &mut self.words[self.index];
        *slot = match self.aggregation {
            Aggregation::And => *slot & word,
            Aggregation::Or => *slot | word,
            Aggregation::Xor => *slot ^ word,
        };
        self.index += 1;
    }
}

impl BitmapStorage for Window<'_> {
    fn add_word(&mut self, word: Word) {
        self.combine(word);
    }

    fn add_literal_word(&mut self, word: Word) {
        self.combine(word);
    }

    fn add_empty_words(&mut self, bit: bool, count: u64) {
        let start = self.index;
        self.index += count as usize;
        self.reach(self.index);
        let span = &mut self.words[start..self.index];
        match (self.aggregation, bit) {
            (Aggregation::Or, true) => span.fill(Word::MAX),
            (Aggregation::And, false) => span.fill(0),
            (Aggregation::Xor, true) => span.iter_mut().for_each(|w| *w = !*w),
            _ => {}
        }
    }

    fn add_literal_words(&mut self, words: &[Word]) {
        for &word in words {
            self.combine(word);
        }
    }

    fn add_negated_literal_words(&mut self, words: &[Word]) {
        for &word in words {
            self.combine(!word);
        }
    }

    fn set_size_in_bits(&mut self, _bits: usize) {}
}

/// A cursor over the aggregate of many compressed streams, computed on
/// demand.
///
/// The aggregate keeps one compressed chunk of output. When the chunk is used
/// up, the next one is produced from the inputs:
///
/// - if the inputs' current runs decide the result on their own (for OR, an
///   input on a ones run or every input on a zero run; for AND the converse;
///   for XOR every input on a run), the run is emitted without touching any
///   literal word;
/// - otherwise up to `buffer_words` words of every input are combined into a
///   dense window, which is then compressed into the chunk.
///
/// Inputs can be any cursors, including other lazy aggregates.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, aggregate::{lazy_or, materialize}};
///
/// let a = EwahBitmap::from_sorted([1, 5])?;
/// let b = EwahBitmap::from_sorted([5, 9000])?;
/// let union = lazy_or([a.cursor(), b.cursor()]);
/// assert_eq!(materialize(union).to_vec(), vec![1, 5, 9000]);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
#[derive(Debug)]
pub struct LazyAggregate<C> {
    inputs: Vec<C>,
    aggregation: Aggregation,
    buffer_words: usize,
    window: Vec<Word>,
    chunk: EwahBitmap,
    view: RlwView,
    size_in_bits: usize,
}

impl<C: RlwCursor> LazyAggregate<C> {
    /// Creates an aggregate with the default window of
    /// [`DEFAULT_BUFFER_WORDS`] words.
    pub fn new<I>(aggregation: Aggregation, cursors: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        Self::with_buffer_words(aggregation, cursors, DEFAULT_BUFFER_WORDS)
    }

    /// Creates an aggregate decompressing at most `buffer_words` words per
    /// input at a time. A width of zero is treated as one.
    pub fn with_buffer_words<I>(aggregation: Aggregation, cursors: I, buffer_words: usize) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let inputs: Vec<C> = cursors.into_iter().collect();
        let size_in_bits = inputs.iter().map(|c| c.size_in_bits()).max().unwrap_or(0);
        let mut aggregate = Self {
            inputs,
            aggregation,
            buffer_words: buffer_words.max(1),
            window: Vec::new(),
            chunk: EwahBitmap::new(),
            view: RlwView::default(),
            size_in_bits,
        };
        aggregate.refill();
        aggregate
    }

    /// The aggregation this cursor computes.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    fn settle(&mut self) {
        if self.view.size() == 0 {
            self.refill();
        }
    }

    fn refill(&mut self) {
        self.chunk.clear();
        match self.aggregation {
            Aggregation::Or | Aggregation::Xor => self.inputs.retain(|c| c.size() > 0),
            // a finished input zeroes everything after it
            Aggregation::And => {
                if self.inputs.iter().any(|c| c.size() == 0) {
                    self.inputs.clear();
                }
            }
        }
        if self.inputs.is_empty() {
            self.view = RlwView::default();
            return;
        }

        if !self.emit_run() {
            self.emit_window();
        }
        self.view = RlwView::first(self.chunk.buffer.as_slice());
    }

    /// Emits a run decided by the inputs' current runs alone.
    fn emit_run(&mut self) -> bool {
        let (bit, run) = match self.aggregation {
            Aggregation::Or | Aggregation::And => {
                let absorbing = self.aggregation == Aggregation::Or;
                let dominant = self
                    .inputs
                    .iter()
                    .filter(|c| c.running_bit() == absorbing)
                    .map(|c| c.running_length())
                    .max()
                    .unwrap_or(0);
                if dominant > 0 {
                    (absorbing, dominant)
                } else {
                    (!absorbing, self.shortest_run())
                }
            }
            Aggregation::Xor => {
                let parity = self
                    .inputs
                    .iter()
                    .fold(false, |acc, c| acc ^ c.running_bit());
                (parity, self.shortest_run())
            }
        };
        if run == 0 {
            return false;
        }

        trace!(bit, words = run, "lazy aggregate run");
        self.chunk.add_empty_words(bit, run);
        for input in &mut self.inputs {
            input.discard_first_words(run);
        }
        true
    }

    fn shortest_run(&self) -> u64 {
        self.inputs
            .iter()
            .map(|c| c.running_length())
            .min()
            .unwrap_or(0)
    }

    /// Combines the next window of every input and compresses it into the
    /// chunk.
    fn emit_window(&mut self) {
        self.window.clear();

        let mut effective = match self.aggregation {
            Aggregation::And => u64::MAX,
            Aggregation::Or | Aggregation::Xor => 0,
        };
        for input in &mut self.inputs {
            let mut window = Window {
                words: &mut self.window,
                index: 0,
                aggregation: self.aggregation,
            };
            let written = discharge(input, &mut window, self.buffer_words as u64, false);
            effective = match self.aggregation {
                Aggregation::And => effective.min(written),
                Aggregation::Or | Aggregation::Xor => effective.max(written),
            };
        }

        trace!(words = effective, inputs = self.inputs.len(), "lazy aggregate window");
        for &word in &self.window[..effective as usize] {
            self.chunk.add_word(word);
        }
    }
}

impl<C: RlwCursor> RlwCursor for LazyAggregate<C> {
    #[inline]
    fn running_bit(&self) -> bool {
        self.view.running_bit
    }

    #[inline]
    fn running_length(&self) -> u64 {
        self.view.running_length
    }

    #[inline]
    fn literals(&self) -> &[Word] {
        self.view.literals(self.chunk.buffer.as_slice())
    }

    #[inline]
    fn size(&self) -> u64 {
        self.view.size()
    }

    fn discard_first_words(&mut self, mut words: u64) {
        while words > 0 && self.view.size() > 0 {
            let step = words.min(self.view.size());
            self.view
                .discard_first_words(self.chunk.buffer.as_slice(), step);
            words -= step;
            self.settle();
        }
    }

    fn discard_running_words(&mut self) {
        self.view.discard_running_words(self.chunk.buffer.as_slice());
        self.settle();
    }

    fn discard_literal_words(&mut self, words: usize) {
        self.view
            .discard_literal_words(self.chunk.buffer.as_slice(), words);
        self.settle();
    }

    #[inline]
    fn size_in_bits(&self) -> usize {
        self.size_in_bits
    }
}

/// Lazy union of `cursors`.
pub fn lazy_or<I, C>(cursors: I) -> LazyAggregate<C>
where
    I: IntoIterator<Item = C>,
    C: RlwCursor,
{
    LazyAggregate::new(Aggregation::Or, cursors)
}

/// Lazy intersection of `cursors`.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, aggregate::{lazy_and, materialize}};
///
/// let a = EwahBitmap::from_sorted(0..1000)?;
/// let b = EwahBitmap::from_sorted((0..2000).step_by(3))?;
/// let both = materialize(lazy_and([a.cursor(), b.cursor()]));
/// assert_eq!(both.cardinality(), 334);
/// assert_eq!(both.size_in_bits(), 1999);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
pub fn lazy_and<I, C>(cursors: I) -> LazyAggregate<C>
where
    I: IntoIterator<Item = C>,
    C: RlwCursor,
{
    LazyAggregate::new(Aggregation::And, cursors)
}

/// Lazy symmetric difference of `cursors`.
pub fn lazy_xor<I, C>(cursors: I) -> LazyAggregate<C>
where
    I: IntoIterator<Item = C>,
    C: RlwCursor,
{
    LazyAggregate::new(Aggregation::Xor, cursors)
}

/// Drains `cursor` into a new bitmap.
#[must_use]
pub fn materialize<C: RlwCursor>(cursor: C) -> EwahBitmap {
    let mut out = EwahBitmap::new();
    materialize_into(cursor, &mut out);
    out
}

/// Drains `cursor` into `out` and declares the cursor's logical length.
///
/// `out` is expected to be empty.
pub fn materialize_into<C, S>(mut cursor: C, out: &mut S)
where
    C: RlwCursor,
    S: BitmapStorage + ?Sized,
{
    let size_in_bits = cursor.size_in_bits();
    discharge_all(&mut cursor, out);
    out.set_size_in_bits(size_in_bits);
}

/// Computes `aggregation` over `bitmaps` with the pairwise fold, the fast
/// entry point and the materialized lazy cursor, and checks that all three
/// agree on positions and logical length.
///
/// Meant for tests and verification runs.
///
/// # Errors
///
/// Returns [`BitmapError::Inconsistent`] if any result differs from the
/// pairwise fold.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::{EwahBitmap, aggregate::{Aggregation, check_consistency}};
///
/// let a = EwahBitmap::from_sorted([1, 2, 300])?;
/// let b = EwahBitmap::from_sorted([2, 3])?;
/// let union = check_consistency(Aggregation::Or, &[&a, &b])?;
/// assert_eq!(union.to_vec(), vec![1, 2, 3, 300]);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
pub fn check_consistency(
    aggregation: Aggregation,
    bitmaps: &[&EwahBitmap],
) -> Result<EwahBitmap, BitmapError> {
    let operation = aggregation.operation();
    let reference = EwahBitmap::fold(operation, bitmaps.iter().copied());
    let fast = match aggregation {
        Aggregation::And => fast_and(bitmaps.iter().copied()),
        Aggregation::Or => fast_or(bitmaps.iter().copied()),
        Aggregation::Xor => fast_xor(bitmaps.iter().copied()),
    };
    let lazy = materialize(LazyAggregate::new(
        aggregation,
        bitmaps.iter().map(|b| b.cursor()),
    ));

    for (path, result) in [("fast", &fast), ("lazy", &lazy)] {
        if *result != reference || result.size_in_bits() != reference.size_in_bits() {
            error!(
                %operation,
                path,
                inputs = bitmaps.len(),
                expected = reference.cardinality(),
                actual = result.cardinality(),
                "aggregation disagrees with pairwise fold"
            );
            return Err(BitmapError::Inconsistent { operation });
        }
    }
    Ok(reference)
}
