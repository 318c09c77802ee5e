//! Basic usage examples for `EwahBitmap`

use ewah_bitmap::{BitmapError, EwahBitmap};

fn main() -> Result<(), BitmapError> {
    println!("=== EwahBitmap Basic Usage ===\n");

    // Positions are appended in increasing order
    let mut bitmap = EwahBitmap::new();
    for position in [5, 10, 15, 100, 1_000_000] {
        bitmap.set(position)?;
    }

    println!("Set bits at positions: 5, 10, 15, 100, 1000000");
    println!("Number of set bits: {}", bitmap.cardinality());
    println!("Logical length: {} bits", bitmap.size_in_bits());
    println!(
        "Compressed size: {} bytes ({} words)\n",
        bitmap.size_in_bytes(),
        bitmap.word_count()
    );

    // Going back is rejected
    match bitmap.set(42) {
        Ok(()) => println!("unexpected: set(42) accepted"),
        Err(err) => println!("set(42) rejected: {err}\n"),
    }

    // Check if specific bits are set
    println!("Checking individual bits:");
    for i in [0, 5, 10, 11, 100, 999_999, 1_000_000] {
        println!(
            "  Bit {}: {}",
            i,
            if bitmap.get(i) { "set" } else { "unset" }
        );
    }

    // Iterate over set bits
    println!("\nIterating over set bits:");
    print!("  Set bits: ");
    for bit in &bitmap {
        print!("{bit} ");
    }
    println!("\n");

    // Inspect the compressed blocks
    println!("Compressed blocks:");
    for block in bitmap.blocks() {
        println!(
            "  run of {} {} word(s), then {} literal word(s)",
            block.running_length,
            if block.running_bit { "one" } else { "zero" },
            block.literals.len()
        );
    }
    println!();

    // Dense ranges collapse into runs
    let mut dense = EwahBitmap::from_sorted(0..64 * 1000)?;
    dense.pad_to(64 * 2000, false);
    println!(
        "Dense bitmap: {} set bits over {} bits in {} words",
        dense.cardinality(),
        dense.size_in_bits(),
        dense.word_count()
    );

    // Byte encoding
    let bytes = bitmap.to_le_bytes();
    let (decoded, _) = EwahBitmap::from_le_bytes(&bytes)?;
    println!("\nEncoded into {} bytes, decoded: {decoded}", bytes.len());

    Ok(())
}
