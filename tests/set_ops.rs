use ewah_bitmap::{BitCounter, EwahBitmap, Operation, lazy_or, merge};

fn build(positions: &[usize]) -> EwahBitmap {
    EwahBitmap::from_sorted(positions.iter().copied()).unwrap()
}

/// Mixed content: literal words, a long zero gap, a run of ones and a
/// partial last word.
fn mixed(offset: usize) -> EwahBitmap {
    let mut b = EwahBitmap::new();
    for i in (offset..200).step_by(3) {
        b.set(i).unwrap();
    }
    b.pad_to(64 * 100 + offset, false);
    b.pad_to(64 * 180, true);
    b.set(64 * 400 + offset).unwrap();
    b
}

fn reference(op: Operation, a: &EwahBitmap, b: &EwahBitmap) -> Vec<usize> {
    let len = a.size_in_bits().max(b.size_in_bits());
    (0..len)
        .filter(|&i| op.apply(u64::from(a.get(i)), u64::from(b.get(i))) & 1 == 1)
        .collect()
}

#[test]
fn test_operations_match_bitwise_reference() {
    let a = mixed(0);
    let b = mixed(5);
    let short = build(&[1, 3, 64 * 120]);

    for op in [Operation::And, Operation::Or, Operation::Xor, Operation::AndNot] {
        for (x, y) in [(&a, &b), (&b, &a), (&a, &short), (&short, &b)] {
            let result = x.apply(op, y);
            assert_eq!(result.to_vec(), reference(op, x, y), "{op}");
            assert_eq!(
                result.size_in_bits(),
                x.size_in_bits().max(y.size_in_bits()),
                "{op}"
            );
        }
    }
}

#[test]
fn test_algebra_laws() {
    let a = mixed(0);
    let b = mixed(7);
    let c = build(&[2, 64 * 150, 64 * 500]);

    assert_eq!(a.or(&b), b.or(&a));
    assert_eq!(a.and(&b), b.and(&a));
    assert_eq!(a.or(&b).or(&c), a.or(&b.or(&c)));
    assert_eq!(a.and(&b).and(&c), a.and(&b.and(&c)));

    assert!(a.and_not(&a).is_empty());
    assert!(a.xor(&a).is_empty());
    assert_eq!(a.or(&b.and_not(&a)), a.or(&b));
    assert_eq!(a.xor(&b), a.or(&b).and_not(&a.and(&b)));
}

#[test]
fn test_cardinality_without_materializing() {
    let a = mixed(1);
    let b = mixed(2);

    assert_eq!(a.and_cardinality(&b), a.and(&b).cardinality());
    assert_eq!(a.or_cardinality(&b), a.or(&b).cardinality());
    assert_eq!(a.xor_cardinality(&b), a.xor(&b).cardinality());
    assert_eq!(a.and_not_cardinality(&b), a.and_not(&b).cardinality());
}

#[test]
fn test_merge_into_counter() {
    let a = mixed(0);
    let b = mixed(4);

    let mut counter = BitCounter::new();
    merge(Operation::Or, a.cursor(), b.cursor(), &mut counter);
    assert_eq!(counter.count(), a.or(&b).cardinality() as u64);
}

#[test]
fn test_merge_chains_with_lazy_results() {
    let a = build(&[1, 2, 3, 640]);
    let b = build(&[3, 4, 7000]);
    let c = build(&[2, 3, 4, 640, 7000]);

    // (a | b) & c without materializing a | b
    let mut out = EwahBitmap::new();
    merge(
        Operation::And,
        lazy_or([a.cursor(), b.cursor()]),
        c.cursor(),
        &mut out,
    );
    assert_eq!(out.to_vec(), vec![2, 3, 4, 640, 7000]);
    assert_eq!(out, a.or(&b).and(&c));
}

#[test]
fn test_set_relations() {
    let small = build(&[5, 64 * 30]);
    let large = mixed(2);
    let mut superset = large.clone();
    superset.set(64 * 1000).unwrap();

    assert!(large.is_subset(&superset));
    assert!(superset.is_superset(&large));
    assert!(!superset.is_subset(&large));
    assert!(large.is_subset(&large));

    assert!(small.intersects(&large) != small.is_disjoint(&large));
    assert!(EwahBitmap::new().is_subset(&small));
    assert!(EwahBitmap::new().is_disjoint(&small));
}

#[test]
fn test_variadic_folds() {
    let bitmaps = [build(&[1, 2, 3, 100]), build(&[2, 3, 100]), build(&[3, 100, 9000])];

    assert_eq!(EwahBitmap::and_all(&bitmaps).to_vec(), vec![3, 100]);
    assert_eq!(
        EwahBitmap::or_all(&bitmaps).to_vec(),
        vec![1, 2, 3, 100, 9000]
    );
    assert_eq!(EwahBitmap::and_all(&bitmaps).size_in_bits(), 9001);
    assert!(EwahBitmap::or_all(std::iter::empty()).is_empty());
}

#[test]
fn test_operation_display() {
    let names: Vec<String> = [Operation::And, Operation::Or, Operation::Xor, Operation::AndNot]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(names, vec!["and", "or", "xor", "and_not"]);
}
