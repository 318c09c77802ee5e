//! Iterator implementations for `EwahBitmap`.

use core::{iter::FusedIterator, ops::Range};

use crate::{
    EwahBitmap, rlw,
    storage::{WORD_BITS, Word},
};

/// One block of the compressed stream: a run of uniform words followed by a
/// burst of literal words.
///
/// Yielded by [`EwahBitmap::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block<'a> {
    /// Value of every word in the run.
    pub running_bit: bool,
    /// Number of uniform words in the run.
    pub running_length: u64,
    /// The literal words stored after the header.
    pub literals: &'a [Word],
}

impl Block<'_> {
    /// Number of logical words the block covers.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.running_length + self.literals.len() as u64
    }
}

/// An iterator over the compressed blocks of an [`EwahBitmap`].
///
/// # Examples
///
/// ```
/// use ewah_bitmap::EwahBitmap;
///
/// let bitmap = EwahBitmap::from_sorted([0, 64 * 10])?;
/// let blocks: Vec<_> = bitmap.blocks().map(|b| (b.running_length, b.literals.len())).collect();
/// assert_eq!(blocks, vec![(0, 1), (9, 1)]);
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    words: &'a [Word],
    index: usize,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(bitmap: &'a EwahBitmap) -> Self {
        Self {
            words: bitmap.buffer.as_slice(),
            index: 0,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.words.len() {
            return None;
        }
        let head = rlw::read(self.words, self.index);
        let start = self.index + 1;
        let end = start + head.literal_words as usize;
        self.index = end;
        Some(Block {
            running_bit: head.running_bit,
            running_length: head.running_length,
            literals: &self.words[start..end],
        })
    }
}

impl FusedIterator for Blocks<'_> {}

/// An iterator over the decompressed words of an [`EwahBitmap`].
///
/// Yields exactly `size_in_bits.div_ceil(64)` words; word `i` holds positions
/// `64 * i .. 64 * (i + 1)`.
#[derive(Clone, Debug)]
pub struct Words<'a> {
    blocks: Blocks<'a>,
    running_bit: bool,
    run: u64,
    literals: &'a [Word],
    remaining: usize,
}

impl<'a> Words<'a> {
    pub(crate) fn new(bitmap: &'a EwahBitmap) -> Self {
        Self {
            blocks: bitmap.blocks(),
            running_bit: false,
            run: 0,
            literals: &[],
            remaining: bitmap.size_in_bits.div_ceil(WORD_BITS),
        }
    }
}

impl Iterator for Words<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if self.run > 0 {
                self.run -= 1;
                self.remaining -= 1;
                return Some(if self.running_bit { Word::MAX } else { 0 });
            }
            if let Some((&word, rest)) = self.literals.split_first() {
                self.literals = rest;
                self.remaining -= 1;
                return Some(word);
            }
            let block = self.blocks.next()?;
            self.running_bit = block.running_bit;
            self.run = block.running_length;
            self.literals = block.literals;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Words<'_> {}

impl FusedIterator for Words<'_> {}

/// An iterator over the set positions of an [`EwahBitmap`], in increasing
/// order.
///
/// Zero runs are skipped without visiting their words.
///
/// This struct is created by [`EwahBitmap::iter`] and by iterating over
/// `&EwahBitmap`.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    blocks: Blocks<'a>,
    /// Positions of the ones run being emitted.
    ones: Range<usize>,
    literals: &'a [Word],
    /// Unvisited bits of the current literal word.
    word: Word,
    base: usize,
    next_word: usize,
    remaining: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(bitmap: &'a EwahBitmap) -> Self {
        Self {
            blocks: bitmap.blocks(),
            ones: 0..0,
            literals: &[],
            word: 0,
            base: 0,
            next_word: 0,
            remaining: bitmap.cardinality(),
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(position) = self.ones.next() {
                self.remaining -= 1;
                return Some(position);
            }
            if self.word != 0 {
                let bit = self.word.trailing_zeros() as usize;
                self.word &= self.word - 1;
                self.remaining -= 1;
                return Some(self.base + bit);
            }
            if let Some((&word, rest)) = self.literals.split_first() {
                self.literals = rest;
                self.word = word;
                self.base = self.next_word * WORD_BITS;
                self.next_word += 1;
                continue;
            }

            let block = self.blocks.next()?;
            let run = block.running_length as usize;
            if block.running_bit {
                let start = self.next_word * WORD_BITS;
                self.ones = start..start + run * WORD_BITS;
            }
            self.next_word += run;
            self.literals = block.literals;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a EwahBitmap {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_iter_mixed_blocks() {
        let mut b = EwahBitmap::from_sorted([3, 70]).unwrap();
        b.pad_to(64 * 5, true);
        b.set(64 * 9 + 2).unwrap();

        let positions: Vec<_> = b.iter().collect();
        let expected: Vec<_> = [3, 70]
            .into_iter()
            .chain(71..64 * 5)
            .chain([64 * 9 + 2])
            .collect();
        assert_eq!(positions, expected);
        assert_eq!(b.iter().len(), expected.len());
    }

    #[test]
    fn test_iter_is_fused() {
        let b = EwahBitmap::from_sorted([1]).unwrap();
        let mut iter = b.iter();
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_words_cover_logical_length() {
        let b = EwahBitmap::from_sorted([0, 200]).unwrap();
        let words: Vec<_> = b.words().collect();
        assert_eq!(words, vec![1, 0, 0, 1 << 8]);

        let mut padded = b.clone();
        padded.pad_to(64 * 6, false);
        assert_eq!(padded.words().len(), 6);
        assert_eq!(padded.words().last(), Some(0));
    }

    #[test]
    fn test_blocks_sizes_sum_to_words() {
        let b = EwahBitmap::from_sorted([5, 64 * 3, 64 * 3 + 1, 64 * 40]).unwrap();
        let total: u64 = b.blocks().map(|block| block.size()).sum();
        assert_eq!(total as usize, b.size_in_bits().div_ceil(64));
    }

    #[test]
    fn test_into_iter_ref() {
        let b = EwahBitmap::from_sorted([2, 4]).unwrap();
        let mut sum = 0;
        for position in &b {
            sum += position;
        }
        assert_eq!(sum, 6);
    }
}
