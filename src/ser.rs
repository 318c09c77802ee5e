//! Fixed-layout byte encoding of `EwahBitmap`.
//!
//! ```text
//! [size_in_bits: u64][word_count: u64][word_0: u64] ... [word_{n-1}: u64]
//! ```
//!
//! Every field is a 64-bit integer in the chosen byte order; the words are
//! the compressed buffer verbatim, running length words included. Decoding
//! walks the blocks and rejects input whose blocks do not cover exactly the
//! declared logical length.

use alloc::vec::Vec;

use tracing::debug;

use crate::{
    EwahBitmap,
    storage::{WORD_BYTES, Word},
    traits::BitmapError,
};

/// Size of the `[size_in_bits][word_count]` header in bytes.
pub const HEADER_BYTES: usize = 2 * WORD_BYTES;

#[inline(always)]
fn chunk(bytes: &[u8]) -> [u8; WORD_BYTES] {
    let mut buf = [0; WORD_BYTES];
    buf.copy_from_slice(bytes);
    buf
}

/// Reads the header at the front of `bytes`, returning the logical length
/// and the body length in bytes.
fn parse_header(
    bytes: &[u8],
    decode: fn([u8; WORD_BYTES]) -> u64,
) -> Result<(usize, usize), BitmapError> {
    if bytes.len() < HEADER_BYTES {
        return Err(BitmapError::Truncated {
            expected: HEADER_BYTES,
            actual: bytes.len(),
        });
    }
    let size_in_bits = usize::try_from(decode(chunk(&bytes[..WORD_BYTES]))).map_err(|_| {
        BitmapError::Malformed {
            reason: "logical length does not fit in usize",
        }
    })?;
    let body = usize::try_from(decode(chunk(&bytes[WORD_BYTES..HEADER_BYTES])))
        .ok()
        .and_then(|count| count.checked_mul(WORD_BYTES))
        .ok_or(BitmapError::Malformed {
            reason: "word count does not fit in memory",
        })?;
    Ok((size_in_bits, body))
}

fn decode_words(bytes: &[u8], decode: fn([u8; WORD_BYTES]) -> u64) -> Vec<Word> {
    bytes
        .chunks_exact(WORD_BYTES)
        .map(|c| decode(chunk(c)))
        .collect()
}

fn validated(size_in_bits: usize, words: Vec<Word>) -> Result<EwahBitmap, BitmapError> {
    EwahBitmap::from_raw_parts(size_in_bits, words)
        .inspect_err(|err| debug!(%err, size_in_bits, "rejected serialized bitmap"))
}

macro_rules! impl_bytes {
    ($to_fn:ident, $from_fn:ident, $to_word:ident, $from_word:ident, $order:literal) => {
        impl EwahBitmap {
            #[doc = concat!("Encodes the bitmap in ", $order, " byte order.")]
            ///
            /// The output is [`serialized_size`](Self::serialized_size) bytes
            /// long.
            #[must_use]
            pub fn $to_fn(&self) -> Vec<u8> {
                let mut bytes = Vec::with_capacity(self.serialized_size());
                bytes.extend_from_slice(&(self.size_in_bits as u64).$to_word());
                bytes.extend_from_slice(&(self.buffer.len() as u64).$to_word());
                for word in self.buffer.iter() {
                    bytes.extend_from_slice(&word.$to_word());
                }
                bytes
            }

            #[doc = concat!("Decodes a bitmap from the front of `bytes`, in ", $order, " byte order.")]
            ///
            /// Returns the bitmap and the bytes following its encoding.
            ///
            /// # Errors
            ///
            /// - [`BitmapError::Truncated`] if `bytes` ends before the
            ///   encoding does
            /// - [`BitmapError::Malformed`] or [`BitmapError::SizeMismatch`]
            ///   if the words are not a valid compressed bitmap of the
            ///   declared logical length
            pub fn $from_fn(bytes: &[u8]) -> Result<(Self, &[u8]), BitmapError> {
                let (size_in_bits, body) = parse_header(bytes, Word::$from_word)?;
                let end = HEADER_BYTES.checked_add(body).ok_or(BitmapError::Malformed {
                    reason: "word count does not fit in memory",
                })?;
                if bytes.len() < end {
                    return Err(BitmapError::Truncated {
                        expected: end,
                        actual: bytes.len(),
                    });
                }
                let words = decode_words(&bytes[HEADER_BYTES..end], Word::$from_word);
                Ok((validated(size_in_bits, words)?, &bytes[end..]))
            }
        }
    };
}

impl_bytes!(
    to_le_bytes,
    from_le_bytes,
    to_le_bytes,
    from_le_bytes,
    "little-endian"
);
impl_bytes!(
    to_be_bytes,
    from_be_bytes,
    to_be_bytes,
    from_be_bytes,
    "big-endian"
);

impl EwahBitmap {
    /// Length in bytes of the encoding produced by
    /// [`to_le_bytes`](Self::to_le_bytes) and
    /// [`to_be_bytes`](Self::to_be_bytes).
    #[inline]
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        HEADER_BYTES + self.buffer.size_in_bytes()
    }
}

#[cfg(feature = "std")]
impl EwahBitmap {
    /// Writes the little-endian encoding to `writer`.
    ///
    /// # Errors
    ///
    /// Forwards any error of `writer`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ewah_bitmap::EwahBitmap;
    ///
    /// let bitmap = EwahBitmap::from_sorted([3, 1 << 20])?;
    /// let mut out = Vec::new();
    /// bitmap.serialize_into(&mut out)?;
    /// assert_eq!(out.len(), bitmap.serialized_size());
    ///
    /// let back = EwahBitmap::deserialize_from(out.as_slice())?;
    /// assert_eq!(back, bitmap);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn serialize_into<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(&(self.size_in_bits as u64).to_le_bytes())?;
        writer.write_all(&(self.buffer.len() as u64).to_le_bytes())?;
        for word in self.buffer.iter() {
            writer.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads a little-endian encoding from `reader`.
    ///
    /// Reads exactly the bytes of one encoding, so several bitmaps can be
    /// read back to back from the same stream.
    ///
    /// # Errors
    ///
    /// - I/O errors of `reader`, with [`std::io::ErrorKind::UnexpectedEof`]
    ///   for truncated input
    /// - [`std::io::ErrorKind::InvalidData`] wrapping a [`BitmapError`] for
    ///   input that is not a valid bitmap
    pub fn deserialize_from<R: std::io::Read>(mut reader: R) -> std::io::Result<Self> {
        use std::io::{Error, ErrorKind, Read};

        let mut header = [0; HEADER_BYTES];
        reader.read_exact(&mut header)?;
        let (size_in_bits, body) = parse_header(&header, Word::from_le_bytes)
            .map_err(|err| Error::new(ErrorKind::InvalidData, err))?;

        // Grow with the input instead of trusting the declared count.
        let mut bytes = Vec::new();
        let read = (&mut reader).take(body as u64).read_to_end(&mut bytes)?;
        if read != body {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                BitmapError::Truncated {
                    expected: HEADER_BYTES.saturating_add(body),
                    actual: HEADER_BYTES + read,
                },
            ));
        }

        validated(size_in_bits, decode_words(&bytes, Word::from_le_bytes))
            .map_err(|err| Error::new(ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rlw;
    use alloc::vec;

    fn sample() -> EwahBitmap {
        let mut b = EwahBitmap::from_sorted([0, 1, 2, 64, 65, 1000]).unwrap();
        b.pad_to(64 * 40, true);
        b.set(64 * 400).unwrap();
        b
    }

    #[test]
    fn test_layout() {
        let b = EwahBitmap::from_sorted([1]).unwrap();
        let bytes = b.to_le_bytes();
        assert_eq!(bytes.len(), HEADER_BYTES + 2 * WORD_BYTES);
        assert_eq!(&bytes[..8], &2u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &2u64.to_le_bytes());

        let be = b.to_be_bytes();
        assert_eq!(&be[..8], &2u64.to_be_bytes());
    }

    #[test]
    fn test_roundtrip_keeps_structure() {
        let b = sample();
        let le_bytes = b.to_le_bytes();
        let (le, rest) = EwahBitmap::from_le_bytes(&le_bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(le.as_words(), b.as_words());
        assert_eq!(le.size_in_bits(), b.size_in_bits());

        let (be, _) = EwahBitmap::from_be_bytes(&b.to_be_bytes()).unwrap();
        assert_eq!(be.to_vec(), b.to_vec());
    }

    #[test]
    fn test_decoded_bitmap_keeps_appending() {
        let b = EwahBitmap::from_sorted([5, 70]).unwrap();
        let (mut decoded, _) = EwahBitmap::from_le_bytes(&b.to_le_bytes()).unwrap();
        decoded.set(71).unwrap();
        decoded.set(9000).unwrap();
        assert_eq!(decoded.to_vec(), vec![5, 70, 71, 9000]);
    }

    #[test]
    fn test_trailing_bytes_returned() {
        let b = EwahBitmap::from_sorted([9]).unwrap();
        let mut bytes = b.to_le_bytes();
        bytes.extend_from_slice(b"tail");
        let (_, rest) = EwahBitmap::from_le_bytes(&bytes).unwrap();
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_le_bytes();
        assert_eq!(
            EwahBitmap::from_le_bytes(&bytes[..10]).unwrap_err(),
            BitmapError::Truncated {
                expected: HEADER_BYTES,
                actual: 10,
            }
        );
        let cut = bytes.len() - 3;
        assert_eq!(
            EwahBitmap::from_le_bytes(&bytes[..cut]).unwrap_err(),
            BitmapError::Truncated {
                expected: bytes.len(),
                actual: cut,
            }
        );
    }

    #[test]
    fn test_declared_size_must_match_blocks() {
        let mut bytes = sample().to_le_bytes();
        bytes[..8].copy_from_slice(&1u64.to_le_bytes());
        assert!(matches!(
            EwahBitmap::from_le_bytes(&bytes),
            Err(BitmapError::SizeMismatch { size_in_bits: 1, .. })
        ));
    }

    #[test]
    fn test_literal_count_past_end() {
        let mut header = 0;
        rlw::set_literal_words(&mut header, 5);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&64u64.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&header.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        assert!(matches!(
            EwahBitmap::from_le_bytes(&bytes),
            Err(BitmapError::Malformed { .. })
        ));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_io_roundtrip_back_to_back() {
        let a = sample();
        let b = EwahBitmap::from_sorted([7]).unwrap();
        let mut out = Vec::new();
        a.serialize_into(&mut out).unwrap();
        b.serialize_into(&mut out).unwrap();

        let mut reader = out.as_slice();
        assert_eq!(EwahBitmap::deserialize_from(&mut reader).unwrap(), a);
        assert_eq!(EwahBitmap::deserialize_from(&mut reader).unwrap(), b);
        assert!(reader.is_empty());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_io_errors() {
        use std::io::ErrorKind;

        let bytes = sample().to_le_bytes();
        let err = EwahBitmap::deserialize_from(&bytes[..bytes.len() - 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        let mut bad = bytes.clone();
        bad[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = EwahBitmap::deserialize_from(bad.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let err = EwahBitmap::deserialize_from(&bytes[..4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
