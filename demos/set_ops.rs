//! Demonstrates set operations with `EwahBitmap`
#![allow(clippy::many_single_char_names)]

use ewah_bitmap::{
    Aggregation, BitmapError, EwahBitmap, Operation, aggregate::check_consistency, fast_and,
    fast_or, lazy_and, lazy_or, materialize, merge, storage::BitCounter,
};

fn main() -> Result<(), BitmapError> {
    println!("=== EwahBitmap Set Operations ===\n");

    let a = EwahBitmap::from_sorted([1, 2, 3, 5, 8])?;
    let b = EwahBitmap::from_sorted([2, 3, 5, 7, 11])?;

    println!("Set A: {a}");
    println!("Set B: {b}");
    println!();

    println!("Union (A | B): {}", a.or(&b));
    println!("Expected: {{1, 2, 3, 5, 7, 8, 11}}\n");

    println!("Intersection (A & B): {}", a.and(&b));
    println!("Expected: {{2, 3, 5}}\n");

    println!("Difference (A - B): {}", a.and_not(&b));
    println!("Expected: {{1, 8}}\n");

    println!("Symmetric difference (A ^ B): {}", &a ^ &b);
    println!("Expected: {{1, 7, 8, 11}}\n");

    println!("|A & B| without building it: {}", a.and_cardinality(&b));
    println!("A is a subset of A | B: {}", a.is_subset(&(&a | &b)));
    println!();

    // Many inputs at once
    let c = EwahBitmap::from_sorted([3, 5, 1 << 20])?;
    let inputs = [&a, &b, &c];
    println!("Set C: {c}");
    println!("fast_or(A, B, C): {}", fast_or(inputs));
    println!("fast_and(A, B, C): {}", fast_and(inputs));

    // Lazy results feed further algebra before anything is materialized
    let mut counter = BitCounter::new();
    merge(
        Operation::And,
        lazy_or([a.cursor(), b.cursor()]),
        c.cursor(),
        &mut counter,
    );
    println!("|(A | B) & C|: {}", counter.count());

    let lazy = materialize(lazy_and([a.cursor(), b.cursor()]));
    println!("materialize(lazy_and(A, B)): {lazy}");

    // Cross-check every aggregation path against the pairwise fold
    for aggregation in [Aggregation::And, Aggregation::Or, Aggregation::Xor] {
        let result = check_consistency(aggregation, &inputs)?;
        println!("{aggregation:?} paths agree: {result}");
    }

    Ok(())
}
