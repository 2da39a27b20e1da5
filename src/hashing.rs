//! Deterministic hashing of raw gene rows.
//!
//! Each element is reinterpreted as its IEEE-754 bit pattern and folded left
//! to right with the golden-ratio mixing step
//! `h ^= v + 0x9E37_79B9 + (h << 6) + (h >> 2)`, all in wrapping `u32`
//! arithmetic. Equal rows always hash equal, including NaN tombstones, which
//! share the canonical `f32::NAN` bit pattern.

use ndarray::ArrayView1;

/// Golden-ratio constant added at every mixing step.
const GOLDEN_RATIO: u32 = 0x9E37_79B9;

/// Fold one value into a running hash.
#[inline]
#[must_use]
pub fn mix(hash: u32, value: u32) -> u32 {
    hash ^ value
        .wrapping_add(GOLDEN_RATIO)
        .wrapping_add(hash << 6)
        .wrapping_add(hash >> 2)
}

/// Hash a slice of `u32` values.
#[must_use]
pub fn hash_words(words: impl IntoIterator<Item = u32>) -> u32 {
    words.into_iter().fold(0, mix)
}

/// Hash a gene row by the bit patterns of its elements.
#[must_use]
pub fn hash_row(row: ArrayView1<'_, f32>) -> u32 {
    hash_words(row.iter().map(|v| canonical_bits(*v)))
}

/// All NaNs collapse to one bit pattern so tombstones hash identically.
#[inline]
fn canonical_bits(value: f32) -> u32 {
    if value.is_nan() {
        f32::NAN.to_bits()
    } else {
        value.to_bits()
    }
}
