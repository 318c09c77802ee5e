//! Rkyv implementation for `EwahBitmap`.
//!
//! A bitmap archives as one flat vector of `u64`: the logical length in bits
//! followed by the compressed words.

use alloc::vec::Vec;
use rkyv::{
    Archive, Deserialize, Place, Serialize,
    rancor::{Fallible, Source},
    ser::{Allocator, Writer},
    vec::ArchivedVec,
};

use crate::{BitmapError, EwahBitmap};

/// The archived version of EwahBitmap.
pub type ArchivedEwahBitmap = ArchivedVec<<u64 as rkyv::Archive>::Archived>;

/// The resolver for EwahBitmap.
pub type EwahBitmapResolver = rkyv::vec::VecResolver;

impl Archive for EwahBitmap {
    type Archived = ArchivedEwahBitmap;
    type Resolver = EwahBitmapResolver;

    fn resolve(&self, resolver: Self::Resolver, out: Place<Self::Archived>) {
        ArchivedVec::resolve_from_len(self.word_count() + 1, resolver, out);
    }
}

impl<S: Fallible + Allocator + Writer + ?Sized> Serialize<S> for EwahBitmap {
    #[inline]
    fn serialize(&self, serializer: &mut S) -> Result<Self::Resolver, S::Error> {
        let mut flat = Vec::with_capacity(self.word_count() + 1);
        flat.push(self.size_in_bits() as u64);
        flat.extend_from_slice(self.as_words());
        ArchivedVec::<_>::serialize_from_slice(&flat, serializer)
    }
}

impl<D> Deserialize<EwahBitmap, D> for ArchivedEwahBitmap
where
    D: Fallible + ?Sized,
    D::Error: Source,
{
    #[inline]
    fn deserialize(&self, _deserializer: &mut D) -> Result<EwahBitmap, D::Error> {
        EwahBitmap::from_archived(self).map_err(D::Error::new)
    }
}

impl EwahBitmap {
    /// Rebuilds a bitmap from its archived form, checking that the archived
    /// words form a valid compressed bitmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is empty or its words do not match
    /// the archived logical length.
    pub fn from_archived(archived: &ArchivedEwahBitmap) -> Result<Self, BitmapError> {
        let (size, words) = archived.as_slice().split_first().ok_or(BitmapError::Malformed {
            reason: "missing logical length",
        })?;
        let size = size.to_native();
        let size_in_bits = usize::try_from(size).map_err(|_| BitmapError::Malformed {
            reason: "logical length does not fit in usize",
        })?;
        let words = words.iter().map(|w| w.to_native()).collect();
        Self::from_raw_parts(size_in_bits, words)
    }
}

// ============================================================================
// Tests
// ============================================================================
