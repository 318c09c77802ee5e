//! Serde implementations for `EwahBitmap`.
//!
//! The default [`Serialize`]/[`Deserialize`] impls use [`le_bytes`]. The
//! other layouts are available through `#[serde(with = "...")]`:
//!
//! - [`words`]: `(size_in_bits, [compressed words])`
//! - [`positions`]: the sorted set positions
//! - [`le_bytes`], [`be_bytes`]: the byte encoding of
//!   [`EwahBitmap::to_le_bytes`], as base64 text for human-readable formats

use super::EwahBitmap;
use alloc::vec::Vec;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, SeqAccess, Visitor},
    ser::{SerializeSeq, SerializeTuple},
};

/// Serde implementation serializing the bitmap as its logical length and
/// compressed words.
pub mod words {
    use super::*;

    /// Serialize the bitmap as a `(size_in_bits, words)` tuple.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(b: &EwahBitmap, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&(b.size_in_bits() as u64))?;
        tuple.serialize_element(b.as_words())?;
        tuple.end()
    }

    /// Deserialize the bitmap from a `(size_in_bits, words)` tuple.
    ///
    /// # Errors
    ///
    /// Returns an error if the words are not a valid compressed bitmap of
    /// the declared length.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<EwahBitmap, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EwahBitmapVisitor;

        impl<'de> Visitor<'de> for EwahBitmapVisitor {
            type Value = EwahBitmap;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a logical length and a sequence of u64 words")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let size_in_bits: u64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let words: Vec<u64> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let size_in_bits = usize::try_from(size_in_bits).map_err(|_| {
                    de::Error::invalid_value(de::Unexpected::Unsigned(size_in_bits), &"a usize")
                })?;
                EwahBitmap::from_raw_parts(size_in_bits, words).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_tuple(2, EwahBitmapVisitor)
    }
}

/// Module for serializing and deserializing [`EwahBitmap`] as a sorted set of
/// positions.
///
/// The logical length is not stored; a deserialized bitmap ends right after
/// its last position.
pub mod positions {
    use super::*;

    /// Serialize the [`EwahBitmap`] as a sorted sequence of integers.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails to serialize the sequence.
    pub fn serialize<S>(b: &EwahBitmap, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let iter = b.iter();
        let mut ser = serializer.serialize_seq(Some(iter.len()))?;
        for position in iter {
            ser.serialize_element(&position)?;
        }
        ser.end()
    }

    /// Deserialize an [`EwahBitmap`] from a strictly increasing sequence of
    /// integers.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence is not strictly increasing or if
    /// deserialization fails.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<EwahBitmap, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EwahBitmapVisitor;

        impl<'de> Visitor<'de> for EwahBitmapVisitor {
            type Value = EwahBitmap;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a strictly increasing sequence of integers")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut b = EwahBitmap::new();
                while let Some(position) = seq.next_element::<usize>()? {
                    b.set(position).map_err(|_| {
                        de::Error::invalid_value(
                            de::Unexpected::Unsigned(position as u64),
                            &"strictly increasing positions",
                        )
                    })?;
                }
                Ok(b)
            }
        }

        deserializer.deserialize_seq(EwahBitmapVisitor)
    }
}

/// Macro to implement byte-based serialization and deserialization for
/// [`EwahBitmap`].
macro_rules! impl_bytes {
    ($mod:ident, $from_fn:ident, $to_fn:ident, $doc:literal) => {
        #[doc = $doc]
        pub mod $mod {
            use super::*;

            /// Serialize the [`EwahBitmap`] as bytes.
            ///
            /// # Errors
            ///
            /// Returns an error if the serializer fails to serialize the bytes.
            pub fn serialize<S>(b: &EwahBitmap, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                binser::serialize(&b.$to_fn(), serializer)
            }

            /// Deserialize an [`EwahBitmap`] from bytes.
            ///
            /// # Errors
            ///
            /// Returns an error if the bytes are not exactly one valid
            /// encoding.
            pub fn deserialize<'de, D>(deserializer: D) -> Result<EwahBitmap, D::Error>
            where
                D: Deserializer<'de>,
            {
                binser::deserialize(
                    deserializer,
                    #[inline(always)]
                    |bytes| EwahBitmap::$from_fn(bytes),
                )
            }
        }
    };
}

impl_bytes!(
    le_bytes,
    from_le_bytes,
    to_le_bytes,
    "Serialize and deserialize [`EwahBitmap`] using little-endian byte order."
);
impl_bytes!(
    be_bytes,
    from_be_bytes,
    to_be_bytes,
    "Serialize and deserialize [`EwahBitmap`] using big-endian byte order."
);

impl Serialize for EwahBitmap {
    /// Serialize the [`EwahBitmap`] using little-endian byte order.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        le_bytes::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for EwahBitmap {
    /// Deserialize an [`EwahBitmap`] using little-endian byte order.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        le_bytes::deserialize(deserializer)
    }
}

/// Helper module for base64 serialization
mod binser {
    use super::*;
    use crate::BitmapError;

    /// Serialize bytes, as base64 text for human-readable formats.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails to serialize the bytes.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            let encoded = data_encoding::BASE64.encode(bytes);
            serializer.serialize_str(&encoded)
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    fn finish<E, P>(bytes: &[u8], parse: P) -> Result<EwahBitmap, E>
    where
        E: de::Error,
        P: FnOnce(&[u8]) -> Result<(EwahBitmap, &[u8]), BitmapError>,
    {
        let (bitmap, leftover) = parse(bytes).map_err(E::custom)?;
        if !leftover.is_empty() {
            return Err(de::Error::invalid_length(
                bytes.len(),
                &"exactly one encoded bitmap",
            ));
        }
        Ok(bitmap)
    }

    /// Deserialize an [`EwahBitmap`] from bytes, or from base64 text for
    /// human-readable formats.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid base64 or not exactly one
    /// valid encoding.
    pub fn deserialize<'de, D, P>(deserializer: D, parse: P) -> Result<EwahBitmap, D::Error>
    where
        D: Deserializer<'de>,
        P: FnOnce(&[u8]) -> Result<(EwahBitmap, &[u8]), BitmapError>,
    {
        if deserializer.is_human_readable() {
            struct EwahBitmapVisitor<P>(P);

            impl<'de, P> Visitor<'de> for EwahBitmapVisitor<P>
            where
                P: FnOnce(&[u8]) -> Result<(EwahBitmap, &[u8]), BitmapError>,
            {
                type Value = EwahBitmap;

                fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                    formatter.write_str("base64 encoded bitmap")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    let decoded = data_encoding::BASE64
                        .decode(v.as_bytes())
                        .map_err(E::custom)?;
                    finish(&decoded, self.0)
                }
            }

            deserializer.deserialize_str(EwahBitmapVisitor(parse))
        } else {
            struct EwahBitmapVisitor<P>(P);

            impl<'de, P> Visitor<'de> for EwahBitmapVisitor<P>
            where
                P: FnOnce(&[u8]) -> Result<(EwahBitmap, &[u8]), BitmapError>,
            {
                type Value = EwahBitmap;

                fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                    formatter.write_str("bytes representation of a bitmap")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    finish(v, self.0)
                }

                fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                where
                    A: SeqAccess<'de>,
                {
                    let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                    while let Some(byte) = seq.next_element::<u8>()? {
                        bytes.push(byte);
                    }
                    finish(&bytes, self.0)
                }
            }

            deserializer.deserialize_bytes(EwahBitmapVisitor(parse))
        }
    }
}
