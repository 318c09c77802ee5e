use std::collections::BTreeSet;

use ewah_bitmap::{
    EwahBitmap, Operation, fast_and, fast_or, fast_xor, lazy_and, lazy_or, materialize,
};
use proptest::prelude::*;

// Strategy for generating sorted position sets mixing clusters, dense runs
// and long gaps
prop_compose! {
    fn arb_positions(max_bits: usize)
        (runs in prop::collection::vec((0..max_bits, 1usize..300), 0..12),
         scattered in prop::collection::btree_set(0..max_bits, 0..60))
        -> Vec<usize>
    {
        let mut set: BTreeSet<usize> = scattered;
        for (start, len) in runs {
            set.extend(start..(start + len).min(max_bits));
        }
        set.into_iter().collect()
    }
}

// Padding with ones yields whole runs of ones; an optional position after
// the padding keeps those runs in the middle of the stream
prop_compose! {
    fn arb_bitmap(max_bits: usize)
        (positions in arb_positions(max_bits),
         extra in 0usize..1_000,
         fill in any::<bool>(),
         tail in prop::option::of(0usize..500))
        -> EwahBitmap
    {
        let mut bitmap = EwahBitmap::from_sorted(positions).unwrap();
        let len = bitmap.size_in_bits() + extra;
        bitmap.pad_to(len, fill);
        if let Some(offset) = tail {
            bitmap.set(len + offset).unwrap();
        }
        bitmap
    }
}

fn reference(op: Operation, a: &EwahBitmap, b: &EwahBitmap) -> Vec<usize> {
    let a: BTreeSet<usize> = a.iter().collect();
    let b: BTreeSet<usize> = b.iter().collect();
    match op {
        Operation::And => a.intersection(&b).copied().collect(),
        Operation::Or => a.union(&b).copied().collect(),
        Operation::Xor => a.symmetric_difference(&b).copied().collect(),
        Operation::AndNot => a.difference(&b).copied().collect(),
    }
}

fn fold(op: Operation, bitmaps: &[EwahBitmap]) -> EwahBitmap {
    let mut iter = bitmaps.iter();
    let first = iter.next().cloned().unwrap_or_default();
    iter.fold(first, |acc, b| acc.apply(op, b))
}

proptest! {
    #[test]
    fn test_positions_roundtrip(positions in arb_positions(20_000)) {
        let bitmap = EwahBitmap::from_sorted(positions.iter().copied()).unwrap();
        prop_assert_eq!(bitmap.to_vec(), positions.clone());
        prop_assert_eq!(bitmap.cardinality(), positions.len());
        prop_assert_eq!(bitmap.iter().len(), positions.len());
        for &p in positions.iter().take(50) {
            prop_assert!(bitmap.get(p));
        }
    }

    #[test]
    fn test_words_agree_with_positions(bitmap in arb_bitmap(5_000)) {
        let words: Vec<u64> = bitmap.words().collect();
        prop_assert_eq!(words.len(), bitmap.size_in_bits().div_ceil(64));

        let rebuilt: Vec<usize> = words
            .iter()
            .enumerate()
            .flat_map(|(i, &w)| (0..64).filter(move |&b| (w >> b) & 1 == 1).map(move |b| i * 64 + b))
            .collect();
        prop_assert_eq!(rebuilt, bitmap.to_vec());

        let covered: u64 = bitmap.blocks().map(|b| b.size()).sum();
        prop_assert_eq!(covered as usize, words.len());
    }

    #[test]
    fn test_pairwise_matches_set_reference(
        a in arb_bitmap(10_000),
        b in arb_bitmap(10_000),
    ) {
        for op in [Operation::And, Operation::Or, Operation::Xor, Operation::AndNot] {
            let result = a.apply(op, &b);
            prop_assert_eq!(result.to_vec(), reference(op, &a, &b), "{}", op);
            prop_assert_eq!(result.size_in_bits(), a.size_in_bits().max(b.size_in_bits()));
        }
    }

    #[test]
    fn test_algebra_laws(
        a in arb_bitmap(8_000),
        b in arb_bitmap(8_000),
        c in arb_bitmap(8_000),
    ) {
        prop_assert_eq!(a.or(&b), b.or(&a));
        prop_assert_eq!(a.and(&b), b.and(&a));
        prop_assert_eq!(a.or(&b).or(&c), a.or(&b.or(&c)));
        prop_assert_eq!(a.and(&b).and(&c), a.and(&b.and(&c)));
        prop_assert!(a.and_not(&a).is_empty());
        prop_assert!(a.xor(&a).is_empty());
        prop_assert_eq!(a.or(&b.and_not(&a)), a.or(&b));
    }

    #[test]
    fn test_cardinality_variants(a in arb_bitmap(8_000), b in arb_bitmap(8_000)) {
        prop_assert_eq!(a.and_cardinality(&b), a.and(&b).cardinality());
        prop_assert_eq!(a.or_cardinality(&b), a.or(&b).cardinality());
        prop_assert_eq!(a.xor_cardinality(&b), a.xor(&b).cardinality());
        prop_assert_eq!(a.and_not_cardinality(&b), a.and_not(&b).cardinality());
        prop_assert_eq!(a.intersects(&b), a.and_cardinality(&b) > 0);
    }

    #[test]
    fn test_not_is_an_involution(bitmap in arb_bitmap(5_000)) {
        let negated = bitmap.not();
        prop_assert_eq!(negated.size_in_bits(), bitmap.size_in_bits());
        prop_assert_eq!(
            negated.cardinality() + bitmap.cardinality(),
            bitmap.size_in_bits()
        );
        prop_assert!(negated.and(&bitmap).is_empty());
        prop_assert_eq!(negated.not(), bitmap);
    }

    #[test]
    fn test_aggregation_equivalence(
        bitmaps in prop::collection::vec(arb_bitmap(6_000), 1..7),
    ) {
        let or = fold(Operation::Or, &bitmaps);
        let and = fold(Operation::And, &bitmaps);
        let xor = fold(Operation::Xor, &bitmaps);

        prop_assert_eq!(&fast_or(&bitmaps), &or);
        prop_assert_eq!(fast_or(&bitmaps).size_in_bits(), or.size_in_bits());
        prop_assert_eq!(&fast_and(&bitmaps), &and);
        prop_assert_eq!(fast_and(&bitmaps).size_in_bits(), and.size_in_bits());
        prop_assert_eq!(&fast_xor(&bitmaps), &xor);

        let lazy = materialize(lazy_or(bitmaps.iter().map(EwahBitmap::cursor)));
        prop_assert_eq!(lazy.size_in_bits(), or.size_in_bits());
        prop_assert_eq!(&lazy, &or);
        let lazy = materialize(lazy_and(bitmaps.iter().map(EwahBitmap::cursor)));
        prop_assert_eq!(&lazy, &and);
    }

    #[test]
    fn test_serialized_roundtrip(bitmap in arb_bitmap(20_000)) {
        let le = bitmap.to_le_bytes();
        let (back, rest) = EwahBitmap::from_le_bytes(&le).unwrap();
        prop_assert!(rest.is_empty());
        prop_assert_eq!(back.as_words(), bitmap.as_words());
        prop_assert_eq!(back.size_in_bits(), bitmap.size_in_bits());

        let be = bitmap.to_be_bytes();
        let (back, _) = EwahBitmap::from_be_bytes(&be).unwrap();
        prop_assert_eq!(back, bitmap);
    }

    #[test]
    fn test_appending_after_roundtrip(
        bitmap in arb_bitmap(3_000),
        tail in prop::collection::btree_set(0usize..3_000, 0..20),
    ) {
        let (mut back, _) = EwahBitmap::from_le_bytes(&bitmap.to_le_bytes()).unwrap();
        let mut expected = bitmap.clone();
        let offset = bitmap.size_in_bits();
        for t in tail {
            back.set(offset + t).unwrap();
            expected.set(offset + t).unwrap();
        }
        prop_assert_eq!(back.as_words(), expected.as_words());
    }
}
