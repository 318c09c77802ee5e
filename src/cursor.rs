//! Forward-only cursors over compressed word streams.
//!
//! A cursor exposes the current block of a stream (remaining run, running
//! bit, buffered literal words) without decompressing it into positions.
//! The set-algebra engines consume two or more cursors in lockstep, and the
//! lazy aggregation engine is itself a cursor, so results can be chained
//! before anything is materialized.

use crate::{
    EwahBitmap, rlw,
    storage::{BitmapStorage, Word},
};
use alloc::boxed::Box;

/// A read-only, non-rewindable view over one compressed stream.
///
/// A cursor is positioned on a block: a run of [`running_length`] words all
/// equal to [`running_bit`], followed by the [`literals`] still buffered for
/// that block. Discarding words moves the cursor forward, splitting blocks as
/// needed and stepping into the next block once the current one is used up.
/// A cursor whose [`size`] is zero is exhausted.
///
/// [`running_length`]: Self::running_length
/// [`running_bit`]: Self::running_bit
/// [`literals`]: Self::literals
/// [`size`]: Self::size
pub trait RlwCursor {
    /// Value of every word in the remaining run.
    fn running_bit(&self) -> bool;

    /// Remaining run length of the current block, in words.
    fn running_length(&self) -> u64;

    /// Literal words of the current block that have not been discarded yet.
    fn literals(&self) -> &[Word];

    /// Words left in the current block.
    #[inline]
    fn size(&self) -> u64 {
        self.running_length() + self.literals().len() as u64
    }

    /// Skips `words` logical words, crossing block boundaries.
    fn discard_first_words(&mut self, words: u64);

    /// Skips the rest of the current run.
    fn discard_running_words(&mut self);

    /// Skips `words` buffered literal words; the run must already be
    /// consumed.
    fn discard_literal_words(&mut self, words: usize);

    /// Logical length in bits of the whole stream this cursor walks.
    fn size_in_bits(&self) -> usize;
}

impl<C: RlwCursor + ?Sized> RlwCursor for &mut C {
    #[inline]
    fn running_bit(&self) -> bool {
        C::running_bit(self)
    }

    #[inline]
    fn running_length(&self) -> u64 {
        C::running_length(self)
    }

    #[inline]
    fn literals(&self) -> &[Word] {
        C::literals(self)
    }

    #[inline]
    fn size(&self) -> u64 {
        C::size(self)
    }

    #[inline]
    fn discard_first_words(&mut self, words: u64) {
        C::discard_first_words(self, words);
    }

    #[inline]
    fn discard_running_words(&mut self) {
        C::discard_running_words(self);
    }

    #[inline]
    fn discard_literal_words(&mut self, words: usize) {
        C::discard_literal_words(self, words);
    }

    #[inline]
    fn size_in_bits(&self) -> usize {
        C::size_in_bits(self)
    }
}

impl<C: RlwCursor + ?Sized> RlwCursor for Box<C> {
    #[inline]
    fn running_bit(&self) -> bool {
        C::running_bit(self)
    }

    #[inline]
    fn running_length(&self) -> u64 {
        C::running_length(self)
    }

    #[inline]
    fn literals(&self) -> &[Word] {
        C::literals(self)
    }

    #[inline]
    fn size(&self) -> u64 {
        C::size(self)
    }

    #[inline]
    fn discard_first_words(&mut self, words: u64) {
        C::discard_first_words(self, words);
    }

    #[inline]
    fn discard_running_words(&mut self) {
        C::discard_running_words(self);
    }

    #[inline]
    fn discard_literal_words(&mut self, words: usize) {
        C::discard_literal_words(self, words);
    }

    #[inline]
    fn size_in_bits(&self) -> usize {
        C::size_in_bits(self)
    }
}

/// Position inside a compressed buffer: the unconsumed part of one block.
///
/// The view does not borrow the buffer, so owners of a buffer that changes
/// between refills (the lazy aggregate) can keep one alongside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RlwView {
    pub(crate) running_bit: bool,
    pub(crate) running_length: u64,
    /// Buffer index of the first unconsumed literal word.
    pub(crate) literal_start: usize,
    pub(crate) literal_words: usize,
}

impl RlwView {
    /// Positions the view on the block whose header is at `index`.
    #[inline]
    pub(crate) fn load(buffer: &[Word], index: usize) -> Self {
        let head = rlw::read(buffer, index);
        Self {
            running_bit: head.running_bit,
            running_length: head.running_length,
            literal_start: index + 1,
            literal_words: head.literal_words as usize,
        }
    }

    /// Positions the view on the first non-empty block of `buffer`.
    pub(crate) fn first(buffer: &[Word]) -> Self {
        let mut view = Self::load(buffer, 0);
        view.settle(buffer);
        view
    }

    #[inline]
    pub(crate) fn size(&self) -> u64 {
        self.running_length + self.literal_words as u64
    }

    #[inline]
    pub(crate) fn literals<'a>(&self, buffer: &'a [Word]) -> &'a [Word] {
        &buffer[self.literal_start..self.literal_start + self.literal_words]
    }

    /// Steps over exhausted blocks. Returns `false` once the buffer is used
    /// up.
    #[inline]
    pub(crate) fn settle(&mut self, buffer: &[Word]) -> bool {
        while self.size() == 0 {
            let next = self.literal_start + self.literal_words;
            if next >= buffer.len() {
                return false;
            }
            *self = Self::load(buffer, next);
        }
        true
    }

    pub(crate) fn discard_first_words(&mut self, buffer: &[Word], mut words: u64) {
        while words > 0 && self.settle(buffer) {
            if self.running_length >= words {
                self.running_length -= words;
                break;
            }
            words -= self.running_length;
            self.running_length = 0;

            let lits = words.min(self.literal_words as u64) as usize;
            self.literal_start += lits;
            self.literal_words -= lits;
            words -= lits as u64;
        }
        self.settle(buffer);
    }

    #[inline]
    pub(crate) fn discard_running_words(&mut self, buffer: &[Word]) {
        self.running_length = 0;
        self.settle(buffer);
    }

    #[inline]
    pub(crate) fn discard_literal_words(&mut self, buffer: &[Word], words: usize) {
        debug_assert_eq!(self.running_length, 0);
        debug_assert!(words <= self.literal_words);
        self.literal_start += words;
        self.literal_words -= words;
        self.settle(buffer);
    }
}

/// Cursor over the buffer of an [`EwahBitmap`].
///
/// Created by [`EwahBitmap::cursor`].
#[derive(Clone, Debug)]
pub struct BitmapCursor<'a> {
    buffer: &'a [Word],
    view: RlwView,
    size_in_bits: usize,
}

impl<'a> BitmapCursor<'a> {
    /// Creates a cursor positioned on the first block of `bitmap`.
    #[must_use]
    pub fn new(bitmap: &'a EwahBitmap) -> Self {
        let buffer = bitmap.buffer.as_slice();
        Self {
            buffer,
            view: RlwView::first(buffer),
            size_in_bits: bitmap.size_in_bits,
        }
    }
}

impl RlwCursor for BitmapCursor<'_> {
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
        self.view.literals(self.buffer)
    }

    #[inline]
    fn size(&self) -> u64 {
        self.view.size()
    }

    fn discard_first_words(&mut self, words: u64) {
        self.view.discard_first_words(self.buffer, words);
    }

    fn discard_running_words(&mut self) {
        self.view.discard_running_words(self.buffer);
    }

    fn discard_literal_words(&mut self, words: usize) {
        self.view.discard_literal_words(self.buffer, words);
    }

    #[inline]
    fn size_in_bits(&self) -> usize {
        self.size_in_bits
    }
}

/// Writes up to `max` words from `cursor` into `out`, negating them when
/// `negate` is set. Returns the number of words written, which is smaller than
/// `max` only when the cursor ran out.
pub(crate) fn discharge<C, S>(cursor: &mut C, out: &mut S, max: u64, negate: bool) -> u64
where
    C: RlwCursor + ?Sized,
    S: BitmapStorage + ?Sized,
{
    let mut written = 0;
    while written < max && cursor.size() > 0 {
        let run = cursor.running_length().min(max - written);
        out.add_empty_words(cursor.running_bit() ^ negate, run);
        written += run;

        let lits = cursor.literals();
        let take = (lits.len() as u64).min(max - written) as usize;
        if negate {
            out.add_negated_literal_words(&lits[..take]);
        } else {
            out.add_literal_words(&lits[..take]);
        }
        written += take as u64;
        cursor.discard_first_words(run + take as u64);
    }
    written
}

/// Writes everything left in `cursor` into `out`.
pub(crate) fn discharge_all<C, S>(cursor: &mut C, out: &mut S)
where
    C: RlwCursor + ?Sized,
    S: BitmapStorage + ?Sized,
{
    discharge(cursor, out, u64::MAX, false);
}

/// Writes as many zero words as `cursor` has left, consuming it.
pub(crate) fn discharge_as_empty<C, S>(cursor: &mut C, out: &mut S)
where
    C: RlwCursor + ?Sized,
    S: BitmapStorage + ?Sized,
{
    loop {
        let size = cursor.size();
        if size == 0 {
            break;
        }
        out.add_empty_words(false, size);
        cursor.discard_first_words(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BitCounter;

    fn bitmap(positions: &[usize]) -> EwahBitmap {
        EwahBitmap::from_sorted(positions.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_bitmap_cursor_is_exhausted() {
        let empty = EwahBitmap::new();
        let cursor = empty.cursor();
        assert_eq!(cursor.size(), 0);
        assert!(cursor.literals().is_empty());
        assert_eq!(cursor.size_in_bits(), 0);
    }

    #[test]
    fn test_cursor_walks_blocks() {
        // word 0 literal, words 1..=9 zero run, word 10 literal
        let b = bitmap(&[3, 10 * 64 + 1]);
        let mut cursor = b.cursor();
        assert_eq!(cursor.running_length(), 0);
        assert_eq!(cursor.literals(), &[1 << 3]);

        cursor.discard_literal_words(1);
        assert_eq!(cursor.running_length(), 9);
        assert!(!cursor.running_bit());
        assert_eq!(cursor.literals(), &[0b10]);

        cursor.discard_running_words();
        assert_eq!(cursor.running_length(), 0);
        assert_eq!(cursor.size(), 1);

        cursor.discard_literal_words(1);
        assert_eq!(cursor.size(), 0);
    }

    #[test]
    fn test_discard_first_words_splits_runs_and_bursts() {
        let b = bitmap(&[0, 64, 128, 5 * 64]);
        let mut cursor = b.cursor();
        assert_eq!(cursor.literals().len(), 3);

        cursor.discard_first_words(2);
        assert_eq!(cursor.literals(), &[1]);

        cursor.discard_first_words(2);
        assert_eq!(cursor.running_length(), 1);
        assert!(cursor.literals().len() == 1);

        cursor.discard_first_words(100);
        assert_eq!(cursor.size(), 0);
    }

    #[test]
    fn test_discharge_respects_limit() {
        let b = bitmap(&[1, 2, 640]);
        let mut cursor = b.cursor();
        let mut counter = BitCounter::new();
        assert_eq!(discharge(&mut cursor, &mut counter, 5, false), 5);
        assert_eq!(counter.count(), 2);
        assert_eq!(cursor.size(), 6);

        let mut out = EwahBitmap::new();
        discharge_all(&mut cursor, &mut out);
        assert_eq!(out.cardinality(), 1);
        assert_eq!(out.size_in_bits(), 6 * 64);
    }

    #[test]
    fn test_discharge_negated() {
        let b = bitmap(&[0]);
        let mut cursor = b.cursor();
        let mut counter = BitCounter::new();
        assert_eq!(discharge(&mut cursor, &mut counter, 10, true), 1);
        assert_eq!(counter.count(), 63);
    }

    #[test]
    fn test_boxed_cursor() {
        let b = bitmap(&[7, 900]);
        let mut boxed: Box<dyn RlwCursor + '_> = Box::new(b.cursor());
        let mut counter = BitCounter::new();
        discharge_all(&mut boxed, &mut counter);
        assert_eq!(counter.count(), 2);
    }
}
