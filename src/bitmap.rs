//! `EwahBitmap` struct, builder operations and shape queries.

use alloc::vec::Vec;

use crate::{
    cursor::{BitmapCursor, RlwCursor, discharge},
    iter::{Blocks, Iter, Words},
    rlw::{self, Overflow, RunningLengthWord},
    storage::{BitmapStorage, MAX_SIZE_IN_BITS, WORD_BITS, Word, WordBuffer, bitpos},
    traits::BitmapError,
};

/// A compressed bitmap using the Enhanced Word-Aligned Hybrid encoding.
///
/// # Overview
///
/// The bitmap is one [`WordBuffer`] split into blocks. Each block is a
/// running length word (see [`crate::rlw`]) describing a run of all-zero or
/// all-one words, followed by a burst of literal words stored verbatim.
/// Sparse sets collapse into a handful of runs; dense regions cost one word
/// per 64 bits plus a header per burst.
///
/// # Construction Model
///
/// Bits are appended in strictly increasing order with [`set`](Self::set).
/// The bitmap also has a logical length, [`size_in_bits`](Self::size_in_bits),
/// which is one past the last position covered so far; it grows with every
/// `set` and is the largest input length for algebra results.
///
/// Set algebra ([`and`](Self::and), [`or`](Self::or), [`xor`](Self::xor),
/// [`and_not`](Self::and_not)) runs on the compressed form and returns new
/// bitmaps; operands are never modified.
///
/// # Examples
///
/// ```
/// use ewah_bitmap::EwahBitmap;
///
/// let mut bitmap = EwahBitmap::new();
/// bitmap.set(0)?;
/// bitmap.set(1)?;
/// bitmap.set(1_000_000)?;
///
/// assert_eq!(bitmap.cardinality(), 3);
/// assert_eq!(bitmap.to_vec(), vec![0, 1, 1_000_000]);
/// // two headers, each followed by one literal word
/// assert_eq!(bitmap.word_count(), 4);
///
/// // positions must keep increasing
/// assert!(bitmap.set(5).is_err());
/// # Ok::<(), ewah_bitmap::BitmapError>(())
/// ```
#[derive(Clone)]
pub struct EwahBitmap {
    pub(crate) buffer: WordBuffer,
    pub(crate) size_in_bits: usize,
    /// Index of the last running length word, the only open block.
    pub(crate) rlw: usize,
}

impl EwahBitmap {
    /// Creates an empty bitmap of logical length zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::new();
    /// assert!(bitmap.is_empty());
    /// assert_eq!(bitmap.size_in_bits(), 0);
    /// assert_eq!(bitmap.size_in_bytes(), 8);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Creates an empty bitmap whose buffer can hold `words` words before
    /// reallocating.
    #[must_use]
    pub fn with_capacity(words: usize) -> Self {
        let mut buffer = WordBuffer::with_capacity(words.max(1));
        buffer.push(0);
        Self {
            buffer,
            size_in_bits: 0,
            rlw: 0,
        }
    }

    /// Builds a bitmap from strictly increasing positions.
    ///
    /// # Errors
    ///
    /// Fails like [`set`](Self::set) on the first position that does not
    /// increase.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::from_sorted([2, 3, 5, 7])?;
    /// assert_eq!(bitmap.cardinality(), 4);
    ///
    /// assert!(EwahBitmap::from_sorted([3, 2]).is_err());
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    pub fn from_sorted<I>(positions: I) -> Result<Self, BitmapError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bitmap = Self::new();
        for position in positions {
            bitmap.set(position)?;
        }
        Ok(bitmap)
    }

    /// Builds a bitmap from a stream of uncompressed words, word `i` holding
    /// positions `64 * i .. 64 * (i + 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::from_words([0b101, 0, 0, u64::MAX]);
    /// assert_eq!(bitmap.size_in_bits(), 256);
    /// assert_eq!(bitmap.cardinality(), 2 + 64);
    /// ```
    #[must_use]
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator<Item = Word>,
    {
        let mut bitmap = Self::new();
        for word in words {
            bitmap.add_word(word);
        }
        bitmap
    }

    /// Rebuilds a bitmap from its logical length and raw compressed words,
    /// as produced by [`as_words`](Self::as_words).
    ///
    /// # Errors
    ///
    /// - [`BitmapError::Malformed`] if the words do not parse as a sequence
    ///   of blocks, bits are set past `size_in_bits`, or `size_in_bits`
    ///   exceeds [`MAX_SIZE_IN_BITS`]
    /// - [`BitmapError::SizeMismatch`] if the blocks cover a different number
    ///   of words than `size_in_bits` requires
    pub fn from_raw_parts(size_in_bits: usize, words: Vec<Word>) -> Result<Self, BitmapError> {
        if words.is_empty() {
            return Err(BitmapError::Malformed {
                reason: "missing leading running length word",
            });
        }
        if size_in_bits > MAX_SIZE_IN_BITS {
            return Err(BitmapError::Malformed {
                reason: "logical length past the last representable word",
            });
        }

        let mut index = 0;
        let mut last = 0;
        let mut covered = 0u64;
        while index < words.len() {
            let head = rlw::read(&words, index);
            last = index;
            covered += head.size();
            index += 1 + head.literal_words as usize;
        }
        if index != words.len() {
            return Err(BitmapError::Malformed {
                reason: "literal burst runs past the end of the buffer",
            });
        }

        let expected = size_in_bits.div_ceil(WORD_BITS) as u64;
        if covered != expected {
            return Err(BitmapError::SizeMismatch {
                size_in_bits,
                words: covered,
            });
        }

        let tail = rlw::read(&words, last);
        if last != 0 && tail.size() == 0 {
            return Err(BitmapError::Malformed {
                reason: "empty trailing block",
            });
        }
        let (_, bits) = bitpos(size_in_bits);
        if bits != 0 {
            let last_word = if tail.literal_words > 0 {
                words[words.len() - 1]
            } else if tail.running_bit {
                Word::MAX
            } else {
                0
            };
            if last_word >> bits != 0 {
                return Err(BitmapError::Malformed {
                    reason: "bits set past the logical length",
                });
            }
        }

        Ok(Self {
            buffer: words.into(),
            size_in_bits,
            rlw: last,
        })
    }

    /// Sets the bit at `position`.
    ///
    /// Positions must be appended in strictly increasing order: `position`
    /// must not be below [`size_in_bits`](Self::size_in_bits). Zero words
    /// skipped over are folded into a run; the logical length becomes
    /// `position + 1`.
    ///
    /// # Errors
    ///
    /// - [`BitmapError::OutOfOrder`] if `position < self.size_in_bits()`
    /// - [`BitmapError::PositionOverflow`] if `position + 1` exceeds
    ///   [`MAX_SIZE_IN_BITS`], i.e. the position lies in the last,
    ///   incomplete word of `usize`
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::{BitmapError, EwahBitmap};
    /// let mut bitmap = EwahBitmap::new();
    /// bitmap.set(10)?;
    /// bitmap.set(4096)?;
    /// assert_eq!(bitmap.size_in_bits(), 4097);
    ///
    /// assert_eq!(
    ///     bitmap.set(4096),
    ///     Err(BitmapError::OutOfOrder { position: 4096, size_in_bits: 4097 })
    /// );
    /// # Ok::<(), BitmapError>(())
    /// ```
    pub fn set(&mut self, position: usize) -> Result<(), BitmapError> {
        if position < self.size_in_bits {
            return Err(BitmapError::OutOfOrder {
                position,
                size_in_bits: self.size_in_bits,
            });
        }
        if position >= MAX_SIZE_IN_BITS {
            return Err(BitmapError::PositionOverflow { position });
        }

        let (wi, bi) = bitpos(position);
        let words = self.size_in_bits.div_ceil(WORD_BITS);
        let mask: Word = 1 << bi;
        self.size_in_bits = position + 1;

        if wi >= words {
            self.push_empty_words(false, (wi - words) as u64);
            self.push_literal_word(mask);
            return Ok(());
        }

        // The bit lands in the last, partially filled word.
        let head = rlw::read(&self.buffer, self.rlw);
        if head.literal_words == 0 {
            // Bits past the logical length are zero, so a partial last word
            // can only sit at the end of a zero run.
            debug_assert!(!head.running_bit);
            rlw::set_running_length(&mut self.buffer[self.rlw], head.running_length - 1);
            self.push_literal_word(mask);
            return Ok(());
        }

        let last = self.buffer.len() - 1;
        self.buffer[last] |= mask;
        if self.buffer[last] == Word::MAX {
            self.buffer.pop();
            rlw::set_literal_words(&mut self.buffer[self.rlw], head.literal_words - 1);
            self.push_empty_words(true, 1);
        }
        Ok(())
    }

    /// Appends 64 bits at once.
    ///
    /// The bitmap must end on a word boundary; the logical length grows by
    /// one word.
    ///
    /// # Errors
    ///
    /// - [`BitmapError::Unaligned`] when the logical length is not a
    ///   multiple of 64
    /// - [`BitmapError::PositionOverflow`] when the bitmap already reaches
    ///   [`MAX_SIZE_IN_BITS`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let mut bitmap = EwahBitmap::new();
    /// bitmap.append_word(0b11)?;
    /// bitmap.append_word(0)?;
    /// bitmap.set(130)?;
    /// assert_eq!(bitmap.to_vec(), vec![0, 1, 130]);
    /// assert!(bitmap.append_word(1).is_err());
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    pub fn append_word(&mut self, word: Word) -> Result<(), BitmapError> {
        if self.size_in_bits % WORD_BITS != 0 {
            return Err(BitmapError::Unaligned {
                size_in_bits: self.size_in_bits,
            });
        }
        if self.size_in_bits == MAX_SIZE_IN_BITS {
            return Err(BitmapError::PositionOverflow {
                position: self.size_in_bits,
            });
        }
        self.add_word(word);
        Ok(())
    }

    /// Extends the logical length to `size_in_bits`, filling the new bits
    /// with `fill`.
    ///
    /// Returns `false`, leaving the bitmap untouched, if `size_in_bits` is
    /// below the current logical length or above [`MAX_SIZE_IN_BITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let mut bitmap = EwahBitmap::from_sorted([1])?;
    /// assert!(bitmap.pad_to(200, true));
    /// assert_eq!(bitmap.cardinality(), 1 + 198);
    /// assert!(!bitmap.pad_to(100, false));
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    pub fn pad_to(&mut self, size_in_bits: usize, fill: bool) -> bool {
        if size_in_bits < self.size_in_bits || size_in_bits > MAX_SIZE_IN_BITS {
            return false;
        }
        if !fill {
            BitmapStorage::set_size_in_bits(self, size_in_bits);
            return true;
        }

        // Complete the partial last word bit by bit, then whole words as a
        // run, then the new partial word.
        let boundary = self.size_in_bits.next_multiple_of(WORD_BITS).min(size_in_bits);
        for position in self.size_in_bits..boundary {
            self.set_unchecked(position);
        }
        let full = (size_in_bits - self.size_in_bits) / WORD_BITS;
        if full > 0 {
            self.add_empty_words(true, full as u64);
        }
        for position in self.size_in_bits..size_in_bits {
            self.set_unchecked(position);
        }
        true
    }

    /// `set` for positions already known to be in order.
    fn set_unchecked(&mut self, position: usize) {
        let ordered = self.set(position);
        debug_assert!(ordered.is_ok());
    }

    /// Returns the bit at `position`; positions past the logical length read
    /// as unset.
    ///
    /// Time complexity: O(b) where b is the number of blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::from_sorted([3, 700])?;
    /// assert!(bitmap.get(3));
    /// assert!(bitmap.get(700));
    /// assert!(!bitmap.get(4));
    /// assert!(!bitmap.get(10_000));
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn get(&self, position: usize) -> bool {
        if position >= self.size_in_bits {
            return false;
        }
        let (wi, bi) = bitpos(position);
        let mut remaining = wi as u64;
        for block in self.blocks() {
            if remaining < block.running_length {
                return block.running_bit;
            }
            remaining -= block.running_length;
            if let Some(&word) = block.literals.get(remaining as usize) {
                return (word >> bi) & 1 != 0;
            }
            remaining -= block.literals.len() as u64;
        }
        false
    }

    /// Logical length: one past the highest addressable bit.
    #[inline]
    #[must_use]
    pub fn size_in_bits(&self) -> usize {
        self.size_in_bits
    }

    /// Size of the compressed buffer in bytes.
    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.buffer.size_in_bytes()
    }

    /// Number of words in the compressed buffer, headers included.
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.buffer.len()
    }

    /// The raw compressed words.
    #[inline]
    #[must_use]
    pub fn as_words(&self) -> &[Word] {
        self.buffer.as_slice()
    }

    /// Counts the set bits by scanning the blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let mut bitmap = EwahBitmap::from_words([u64::MAX; 3]);
    /// bitmap.set(1000)?;
    /// assert_eq!(bitmap.cardinality(), 3 * 64 + 1);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.blocks()
            .map(|block| {
                let run = if block.running_bit {
                    block.running_length as usize * WORD_BITS
                } else {
                    0
                };
                run + block
                    .literals
                    .iter()
                    .map(|w| w.count_ones() as usize)
                    .sum::<usize>()
            })
            .sum()
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks().all(|block| {
            !(block.running_bit && block.running_length > 0)
                && block.literals.iter().all(|&w| w == 0)
        })
    }

    /// Returns the complement of the bitmap within its logical length.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::from_sorted([0, 2, 69])?;
    /// let flipped = bitmap.not();
    /// assert_eq!(flipped.size_in_bits(), 70);
    /// assert_eq!(flipped.cardinality(), 67);
    /// assert!(flipped.get(1));
    /// assert!(!flipped.get(69));
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[must_use]
    pub fn not(&self) -> Self {
        let mut out = Self::with_capacity(self.buffer.len());
        let words = self.size_in_bits.div_ceil(WORD_BITS) as u64;
        if words == 0 {
            return out;
        }

        let mut cursor = self.cursor();
        discharge(&mut cursor, &mut out, words - 1, true);
        let last = if cursor.running_length() > 0 {
            if cursor.running_bit() { Word::MAX } else { 0 }
        } else {
            cursor.literals().first().copied().unwrap_or(0)
        };
        let (_, bits) = bitpos(self.size_in_bits);
        let mask = if bits == 0 { Word::MAX } else { (1 << bits) - 1 };
        out.add_word(!last & mask);
        out.size_in_bits = self.size_in_bits;
        out
    }

    /// Removes every bit and resets the logical length to zero.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer.push(0);
        self.size_in_bits = 0;
        self.rlw = 0;
    }

    /// Reduce buffer capacity to match the current length.
    pub fn shrink_to_fit(&mut self) {
        self.buffer.shrink_to_fit();
    }

    /// Returns a cursor over the compressed blocks, the input type of the set
    /// algebra engines.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> BitmapCursor<'_> {
        BitmapCursor::new(self)
    }

    /// Returns an iterator over the set positions, in increasing order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ewah_bitmap::EwahBitmap;
    /// let bitmap = EwahBitmap::from_sorted([5, 64, 65])?;
    /// let mut iter = bitmap.iter();
    /// assert_eq!(iter.next(), Some(5));
    /// assert_eq!(iter.next(), Some(64));
    /// assert_eq!(iter.next(), Some(65));
    /// assert_eq!(iter.next(), None);
    /// # Ok::<(), ewah_bitmap::BitmapError>(())
    /// ```
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Returns an iterator over the decompressed words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> Words<'_> {
        Words::new(self)
    }

    /// Returns an iterator over the compressed blocks.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self)
    }

    /// Collects the set positions into a vector sized by
    /// [`cardinality`](Self::cardinality).
    #[must_use]
    pub fn to_vec(&self) -> Vec<usize> {
        let mut positions = Vec::with_capacity(self.cardinality());
        positions.extend(self.iter());
        positions
    }

    /// Appends one word, folding uniform words into runs.
    pub(crate) fn push_word(&mut self, word: Word) {
        match word {
            0 => self.push_empty_words(false, 1),
            Word::MAX => self.push_empty_words(true, 1),
            _ => self.push_literal_word(word),
        }
    }

    /// Extends the open run, or opens a new block when the open one already
    /// has literals or runs the other bit. Runs too long for one header are
    /// chained.
    pub(crate) fn push_empty_words(&mut self, bit: bool, count: u64) {
        if count == 0 {
            return;
        }
        let head = rlw::read(&self.buffer, self.rlw);
        if head.size() == 0 {
            rlw::set_running_bit(&mut self.buffer[self.rlw], bit);
        } else if head.literal_words != 0 || head.running_bit != bit {
            self.open_block(bit);
        }

        let mut remaining = count;
        while let Err(Overflow { excess }) =
            rlw::increment_running_length(&mut self.buffer, self.rlw, remaining)
        {
            remaining = excess;
            self.open_block(bit);
        }
    }

    #[inline]
    pub(crate) fn push_literal_word(&mut self, word: Word) {
        self.push_literal_words(&[word], false);
    }

    /// Appends literal words to the open block, chaining new blocks when the
    /// burst outgrows one header.
    pub(crate) fn push_literal_words(&mut self, words: &[Word], negate: bool) {
        let mut rest = words;
        while !rest.is_empty() {
            let fitted =
                match rlw::increment_literal_words(&mut self.buffer, self.rlw, rest.len() as u64) {
                    Ok(()) => rest.len(),
                    Err(Overflow { excess }) => rest.len() - excess as usize,
                };
            let (head, tail) = rest.split_at(fitted);
            if negate {
                self.buffer.extend_negated(head);
            } else {
                self.buffer.extend_from_slice(head);
            }
            rest = tail;
            if !rest.is_empty() {
                self.open_block(false);
            }
        }
    }

    fn open_block(&mut self, bit: bool) {
        self.rlw = self.buffer.len();
        self.buffer.push(
            RunningLengthWord {
                running_bit: bit,
                ..RunningLengthWord::default()
            }
            .encode(),
        );
    }

    /// Rounds the logical length up to a word boundary and grows it by
    /// `words` words.
    ///
    /// The result is capped at [`MAX_SIZE_IN_BITS`], which every
    /// well-formed input stream already respects.
    #[inline]
    fn grow_words(&mut self, words: u64) {
        let have = self.size_in_bits.div_ceil(WORD_BITS);
        let room = MAX_SIZE_IN_BITS / WORD_BITS - have;
        debug_assert!(words <= room as u64, "logical length past MAX_SIZE_IN_BITS");
        let words = usize::try_from(words).map_or(room, |w| w.min(room));
        self.size_in_bits = (have + words) * WORD_BITS;
    }
}

impl BitmapStorage for EwahBitmap {
    #[inline]
    fn add_word(&mut self, word: Word) {
        self.grow_words(1);
        self.push_word(word);
    }

    #[inline]
    fn add_literal_word(&mut self, word: Word) {
        self.grow_words(1);
        self.push_literal_word(word);
    }

    fn add_empty_words(&mut self, bit: bool, count: u64) {
        if count == 0 {
            return;
        }
        self.grow_words(count);
        self.push_empty_words(bit, count);
    }

    fn add_literal_words(&mut self, words: &[Word]) {
        if words.is_empty() {
            return;
        }
        self.grow_words(words.len() as u64);
        self.push_literal_words(words, false);
    }

    fn add_negated_literal_words(&mut self, words: &[Word]) {
        if words.is_empty() {
            return;
        }
        self.grow_words(words.len() as u64);
        self.push_literal_words(words, true);
    }

    fn set_size_in_bits(&mut self, bits: usize) {
        let have = self.size_in_bits.div_ceil(WORD_BITS);
        let need = bits.div_ceil(WORD_BITS);
        debug_assert!(need >= have, "logical length cannot drop whole words");
        if need > have {
            self.push_empty_words(false, (need - have) as u64);
        }
        self.size_in_bits = bits;
    }
}
