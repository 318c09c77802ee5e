//! Running length word codec.
//!
//! Every block of a compressed bitmap starts with one header word, the
//! running length word (RLW), packing three fields:
//!
//! ```text
//!  63                         33 32                          1   0
//! ┌─────────────────────────────┬─────────────────────────────┬───┐
//! │  literal word count (31)    │  running length (32)        │ b │
//! └─────────────────────────────┴─────────────────────────────┴───┘
//! ```
//!
//! - `b`: the running bit, the value every word of the run repeats
//! - running length: number of all-`b` words the block starts with
//! - literal word count: number of verbatim words stored right after the RLW
//!
//! A run or a literal burst that does not fit its field is split over
//! several consecutive RLWs. The increment functions report that situation
//! as an [`Overflow`] so the caller can open the next block; it is a control
//! signal, not an error.

use crate::storage::{WORD_BITS, Word};

/// Width of the running length field.
pub const RUNNING_LENGTH_BITS: u32 = 32;

/// Width of the literal word count field.
pub const LITERAL_BITS: u32 = WORD_BITS as u32 - 1 - RUNNING_LENGTH_BITS;

/// Largest run a single RLW can describe, in words.
pub const MAX_RUNNING_LENGTH: u64 = (1 << RUNNING_LENGTH_BITS) - 1;

/// Largest literal burst a single RLW can govern, in words.
pub const MAX_LITERAL_WORDS: u64 = (1 << LITERAL_BITS) - 1;

const RUNNING_LENGTH_SHIFT: u32 = 1;
const LITERAL_SHIFT: u32 = 1 + RUNNING_LENGTH_BITS;
const RUNNING_LENGTH_MASK: Word = MAX_RUNNING_LENGTH << RUNNING_LENGTH_SHIFT;
const LITERAL_MASK: Word = MAX_LITERAL_WORDS << LITERAL_SHIFT;

/// A field increment did not fit.
///
/// The field has been saturated at its maximum; `excess` is the part of the
/// increment that still has to go into a new block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow {
    /// Amount left over after saturating the field.
    pub excess: u64,
}

/// Decoded fields of one running length word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunningLengthWord {
    /// Value repeated by every word of the run.
    pub running_bit: bool,
    /// Number of uniform words in the run.
    pub running_length: u64,
    /// Number of literal words following the header.
    pub literal_words: u64,
}

impl RunningLengthWord {
    /// Decodes a header word.
    #[inline]
    #[must_use]
    pub const fn decode(word: Word) -> Self {
        Self {
            running_bit: running_bit(word),
            running_length: running_length(word),
            literal_words: literal_words(word),
        }
    }

    /// Encodes the fields into a header word.
    ///
    /// Fields must be within [`MAX_RUNNING_LENGTH`] and
    /// [`MAX_LITERAL_WORDS`].
    #[inline]
    #[must_use]
    pub const fn encode(self) -> Word {
        debug_assert!(self.running_length <= MAX_RUNNING_LENGTH);
        debug_assert!(self.literal_words <= MAX_LITERAL_WORDS);
        (self.running_bit as Word)
            | (self.running_length << RUNNING_LENGTH_SHIFT)
            | (self.literal_words << LITERAL_SHIFT)
    }

    /// Number of logical words the block covers.
    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        self.running_length + self.literal_words
    }
}

/// Reads the header at `index`.
#[inline]
#[must_use]
pub fn read(buffer: &[Word], index: usize) -> RunningLengthWord {
    RunningLengthWord::decode(buffer[index])
}

/// Overwrites the header at `index`.
#[inline]
pub fn write(buffer: &mut [Word], index: usize, rlw: RunningLengthWord) {
    buffer[index] = rlw.encode();
}

/// Running bit of a header word.
#[inline(always)]
#[must_use]
pub const fn running_bit(word: Word) -> bool {
    word & 1 != 0
}

/// Running length of a header word.
#[inline(always)]
#[must_use]
pub const fn running_length(word: Word) -> u64 {
    (word & RUNNING_LENGTH_MASK) >> RUNNING_LENGTH_SHIFT
}

/// Literal word count of a header word.
#[inline(always)]
#[must_use]
pub const fn literal_words(word: Word) -> u64 {
    (word & LITERAL_MASK) >> LITERAL_SHIFT
}

/// Sets the running bit in place.
#[inline(always)]
pub fn set_running_bit(word: &mut Word, bit: bool) {
    *word = (*word & !1) | bit as Word;
}

/// Sets the running length in place.
#[inline(always)]
pub fn set_running_length(word: &mut Word, len: u64) {
    debug_assert!(len <= MAX_RUNNING_LENGTH);
    *word = (*word & !RUNNING_LENGTH_MASK) | (len << RUNNING_LENGTH_SHIFT);
}

/// Sets the literal word count in place.
#[inline(always)]
pub fn set_literal_words(word: &mut Word, count: u64) {
    debug_assert!(count <= MAX_LITERAL_WORDS);
    *word = (*word & !LITERAL_MASK) | (count << LITERAL_SHIFT);
}

/// Adds `delta` to the running length of the header at `index`.
///
/// # Errors
///
/// Returns [`Overflow`] when the field cannot absorb all of `delta`; the
/// field is left at [`MAX_RUNNING_LENGTH`].
#[inline]
pub fn increment_running_length(
    buffer: &mut [Word],
    index: usize,
    delta: u64,
) -> Result<(), Overflow> {
    let word = &mut buffer[index];
    let (len, excess) = saturating_add(running_length(*word), delta, MAX_RUNNING_LENGTH);
    set_running_length(word, len);
    match excess {
        0 => Ok(()),
        excess => Err(Overflow { excess }),
    }
}

/// Adds `delta` to the literal word count of the header at `index`.
///
/// # Errors
///
/// Returns [`Overflow`] when the field cannot absorb all of `delta`; the
/// field is left at [`MAX_LITERAL_WORDS`].
#[inline]
pub fn increment_literal_words(
    buffer: &mut [Word],
    index: usize,
    delta: u64,
) -> Result<(), Overflow> {
    let word = &mut buffer[index];
    let (count, excess) = saturating_add(literal_words(*word), delta, MAX_LITERAL_WORDS);
    set_literal_words(word, count);
    match excess {
        0 => Ok(()),
        excess => Err(Overflow { excess }),
    }
}

#[inline(always)]
const fn saturating_add(current: u64, delta: u64, max: u64) -> (u64, u64) {
    let room = max - current;
    if delta <= room {
        (current + delta, 0)
    } else {
        (max, delta - room)
    }
}
