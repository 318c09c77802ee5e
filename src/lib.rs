//! Word-aligned run-length compressed bitmaps.
//!
//! This crate provides [`EwahBitmap`], an append-only set of non-negative
//! integers stored in the EWAH (Enhanced Word-Aligned Hybrid) format. The
//! bitmap is a sequence of 64-bit words grouped into blocks: each block starts
//! with a running length word describing a run of identical all-zero or
//! all-one words, followed by a burst of verbatim literal words.
//!
//! # Features
//!
//! - **Compressed set algebra**: and, or, xor and and-not run directly on the
//!   compressed form, skipping whole runs at once
//! - **Many-input aggregation** with size-ordered eager merges and lazy
//!   streaming cursors ([`aggregate`])
//! - **Composable cursors**: any [`RlwCursor`] can feed [`merge`] or another
//!   aggregation
//! - **Serialization support** via a portable byte format, serde and rkyv
//!   (optional)
//! - **`no_std` support** with `alloc`
//!
//! # Examples
//!
//! ```
//! use ewah_bitmap::EwahBitmap;
//!
//! // Positions are appended in increasing order
//! let mut bitmap = EwahBitmap::new();
//! bitmap.set(10)?;
//! bitmap.set(42)?;
//! bitmap.set(1_000_000)?;
//!
//! assert!(bitmap.get(42));
//! assert!(!bitmap.get(43));
//! assert_eq!(bitmap.cardinality(), 3);
//!
//! // Iterate over set positions
//! for position in &bitmap {
//!     println!("bit {position} is set");
//! }
//!
//! // Set operations
//! let other = EwahBitmap::from_sorted([10, 50])?;
//! assert_eq!(bitmap.and(&other).to_vec(), vec![10]);
//! assert_eq!((&bitmap | &other).cardinality(), 4);
//! # Ok::<(), ewah_bitmap::BitmapError>(())
//! ```
//!
//! # Compression
//!
//! A run of up to 2^32 - 1 identical words costs a single running length
//! word, so a bitmap with a handful of positions spread over millions of bits
//! stays a few words long. Dense regions with no pattern are stored as
//! literal words at the cost of one bit of overhead per 64.
//!
//! Bits past [`EwahBitmap::size_in_bits`] are always zero, and
//! [`EwahBitmap::not`] complements only the bits inside the logical length.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// Module declarations
pub mod aggregate;
mod bitmap;
pub mod cursor;
mod iter;
pub mod rlw;
mod ser;
mod set_ops;
pub mod storage;
pub mod traits;

#[cfg(feature = "rkyv")]
pub mod rkyv;

#[cfg(feature = "rkyv")]
pub use crate::rkyv::{ArchivedEwahBitmap, EwahBitmapResolver};

#[cfg(feature = "serde")]
pub mod serde;

// Re-exports
pub use aggregate::{
    Aggregation, LazyAggregate, fast_and, fast_or, fast_xor, lazy_and, lazy_or, lazy_xor,
    materialize,
};
pub use bitmap::EwahBitmap;
pub use cursor::{BitmapCursor, RlwCursor};
pub use iter::{Block, Blocks, Iter, Words};
pub use ser::HEADER_BYTES;
pub use set_ops::{Operation, merge};
pub use storage::{BitCounter, BitmapStorage, MAX_SIZE_IN_BITS, Word};
pub use traits::BitmapError;
