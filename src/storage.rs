//! Backing word storage and the write-side sink the merge engines emit into.

use alloc::vec::Vec;
use core::{
    borrow::Borrow,
    mem,
    ops::{Deref, DerefMut, Index, IndexMut},
};

/// The machine word every compressed stream is made of.
pub type Word = u64;

/// Number of bits in a [`Word`].
pub const WORD_BITS: usize = Word::BITS as usize;

/// Number of bytes in a [`Word`].
pub const WORD_BYTES: usize = mem::size_of::<Word>();

/// Largest logical length a bitmap can have: the last whole word below
/// `usize::MAX`. Positions must stay below it, so rounding any logical length
/// up to a word boundary never overflows.
pub const MAX_SIZE_IN_BITS: usize = usize::MAX - (WORD_BITS - 1);

/// Convert bit index to (word index, bit position within word)
#[inline(always)]
pub(crate) const fn bitpos(idx: usize) -> (usize, usize) {
    (idx / WORD_BITS, idx % WORD_BITS)
}

/// The exclusively-owned, growable sequence of words backing a compressed
/// bitmap.
///
/// The buffer never interprets its content; the running length word layout
/// lives in [`crate::rlw`] and the block structure in
/// [`EwahBitmap`](crate::EwahBitmap).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WordBuffer {
    pub(crate) words: Vec<Word>,
}

impl WordBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates an empty buffer able to hold `words` words without
    /// reallocating.
    #[must_use]
    pub fn with_capacity(words: usize) -> Self {
        Self {
            words: Vec::with_capacity(words),
        }
    }

    /// Number of words stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the buffer holds no words.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words the buffer can hold before reallocating.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.capacity()
    }

    /// Appends one word.
    #[inline]
    pub fn push(&mut self, word: Word) {
        self.words.push(word);
    }

    /// Removes and returns the last word.
    #[inline]
    pub fn pop(&mut self) -> Option<Word> {
        self.words.pop()
    }

    /// Appends a slice of words verbatim.
    #[inline]
    pub fn extend_from_slice(&mut self, words: &[Word]) {
        self.words.extend_from_slice(words);
    }

    /// Appends the bitwise complement of every word in `words`.
    pub fn extend_negated(&mut self, words: &[Word]) {
        self.words.extend(words.iter().map(|&w| !w));
    }

    /// Reserves room for at least `additional` more words.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.words.reserve(additional);
    }

    /// Shortens the buffer to `len` words.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.words.truncate(len);
    }

    /// Removes every word.
    #[inline]
    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Reduce capacity to match the current length.
    pub fn shrink_to_fit(&mut self) {
        self.words.shrink_to_fit();
    }

    /// Returns the words as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    /// Returns the words as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Word] {
        &mut self.words
    }

    /// Size of the stored words in bytes.
    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Consumes the buffer, returning the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Word> {
        self.words
    }
}

impl From<Vec<Word>> for WordBuffer {
    fn from(words: Vec<Word>) -> Self {
        Self { words }
    }
}

impl From<&[Word]> for WordBuffer {
    fn from(words: &[Word]) -> Self {
        Self {
            words: words.to_vec(),
        }
    }
}

impl Deref for WordBuffer {
    type Target = [Word];

    fn deref(&self) -> &Self::Target {
        &self.words
    }
}

impl DerefMut for WordBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.words
    }
}

impl AsRef<[Word]> for WordBuffer {
    fn as_ref(&self) -> &[Word] {
        &self.words
    }
}

impl Borrow<[Word]> for WordBuffer {
    fn borrow(&self) -> &[Word] {
        &self.words
    }
}

impl Index<usize> for WordBuffer {
    type Output = Word;

    fn index(&self, index: usize) -> &Self::Output {
        &self.words[index]
    }
}

impl IndexMut<usize> for WordBuffer {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.words[index]
    }
}

impl core::fmt::Debug for WordBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.words.iter().map(|w| DebugWord(*w)))
            .finish()
    }
}

struct DebugWord(Word);

impl core::fmt::Debug for DebugWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// A sink for a compressed word stream.
///
/// The merge engines in [`crate::set_ops`] and [`crate::aggregate`] never
/// build bitmaps directly; they describe their output through this trait.
/// [`EwahBitmap`](crate::EwahBitmap) implements it by appending compressed
/// blocks, [`BitCounter`] by counting set bits.
///
/// Every `add_*` call extends the logical length by a whole number of words.
/// [`set_size_in_bits`](Self::set_size_in_bits) fixes the final logical length
/// once the stream is complete.
pub trait BitmapStorage {
    /// Appends one word, folding it into a run when it is all zeros or all
    /// ones.
    fn add_word(&mut self, word: Word);

    /// Appends one word as a literal, without checking for uniformity.
    fn add_literal_word(&mut self, word: Word);

    /// Appends `count` words that are all `bit`.
    fn add_empty_words(&mut self, bit: bool, count: u64);

    /// Appends `words` verbatim as literals.
    fn add_literal_words(&mut self, words: &[Word]);

    /// Appends the complement of `words` as literals.
    fn add_negated_literal_words(&mut self, words: &[Word]);

    /// Declares the logical length of the finished stream.
    ///
    /// Implementations pad with zero words when `bits` reaches past the words
    /// written so far.
    fn set_size_in_bits(&mut self, bits: usize);
}

impl<S: BitmapStorage + ?Sized> BitmapStorage for &mut S {
    #[inline]
    fn add_word(&mut self, word: Word) {
        S::add_word(self, word);
    }

    #[inline]
    fn add_literal_word(&mut self, word: Word) {
        S::add_literal_word(self, word);
    }

    #[inline]
    fn add_empty_words(&mut self, bit: bool, count: u64) {
        S::add_empty_words(self, bit, count);
    }

    #[inline]
    fn add_literal_words(&mut self, words: &[Word]) {
        S::add_literal_words(self, words);
    }

    #[inline]
    fn add_negated_literal_words(&mut self, words: &[Word]) {
        S::add_negated_literal_words(self, words);
    }

    #[inline]
    fn set_size_in_bits(&mut self, bits: usize) {
        S::set_size_in_bits(self, bits);
    }
}

/// A [`BitmapStorage`] that only counts the set bits written to it.
///
/// Used by the `*_cardinality` operations to size a result without
/// materializing it.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::storage::{BitCounter, BitmapStorage};
///
/// let mut counter = BitCounter::new();
/// counter.add_word(0b1011);
/// counter.add_empty_words(true, 2);
/// assert_eq!(counter.count(), 3 + 128);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitCounter {
    ones: u64,
}

impl BitCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { ones: 0 }
    }

    /// Number of set bits written so far.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.ones
    }
}

impl BitmapStorage for BitCounter {
    #[inline]
    fn add_word(&mut self, word: Word) {
        self.ones += u64::from(word.count_ones());
    }

    #[inline]
    fn add_literal_word(&mut self, word: Word) {
        self.ones += u64::from(word.count_ones());
    }

    #[inline]
    fn add_empty_words(&mut self, bit: bool, count: u64) {
        if bit {
            self.ones += count * WORD_BITS as u64;
        }
    }

    fn add_literal_words(&mut self, words: &[Word]) {
        self.ones += words.iter().map(|w| u64::from(w.count_ones())).sum::<u64>();
    }

    fn add_negated_literal_words(&mut self, words: &[Word]) {
        self.ones += words
            .iter()
            .map(|w| u64::from(w.count_zeros()))
            .sum::<u64>();
    }

    #[inline]
    fn set_size_in_bits(&mut self, _bits: usize) {}
}
