//! Authenticated proofs against an accumulator root.
//!
//! Every proof here lets a verifier holding only the published root (and
//! element count) check or transform a committed sequence:
//!
//! - [`SingleProof`] — membership of one element.
//! - [`MultiProof`] / [`CompactMultiProof`] — membership of a set of
//!   elements, driven by the flags/skips/orders bit streams.
//! - [`AppendProof`] — extend the sequence and compute the new root.
//! - [`CombinedProof`] — update elements and append in one proof.
//! - [`SizeProof`] — prove the element count itself.
//! - [`infer_indices`] — recover the proved leaf indices from an ordered
//!   multi-proof's bit streams.
//!
//! All verification is pure: no storage, no shared state, in-memory
//! arithmetic only.

mod append;
mod combined;
mod indices;
mod multi;
mod single;
mod size;


pub use append::AppendProof;
pub use combined::{minimum_combined_proof_index, CombinedProof};
pub use indices::infer_indices;
pub use multi::{CompactMultiProof, MultiProof};
pub use single::SingleProof;
pub use size::{SizeProof, SizeProofMode};

use crate::{Error, Result};

/// Width of one compact bit-stream word, and therefore the exclusive upper
/// bound on `hash_count + 1` bits (the stop bit occupies one position).
pub const MAX_COMPACT_HASH_COUNT: usize = 255;

/// Read bit `pos` of a 32-byte word, counting from the least significant
/// bit of the last byte.
pub(crate) fn get_bit(word: &[u8; 32], pos: usize) -> bool {
    word[31 - pos / 8] >> (pos % 8) & 1 == 1
}

/// Set bit `pos` of a 32-byte word, counting from the least significant
/// bit of the last byte.
pub(crate) fn set_bit(word: &mut [u8; 32], pos: usize) {
    word[31 - pos / 8] |= 1 << (pos % 8);
}

/// Pack a boolean stream into one 32-byte word, with a stop bit one
/// position above the last real bit when `stop_bit` is set.
pub(crate) fn pack_bits(bits: &[bool], stop_bit: bool) -> Result<[u8; 32]> {
    if bits.len() > MAX_COMPACT_HASH_COUNT {
        return Err(Error::CapacityExceeded(format!(
            "{} hash steps do not fit a compact bit stream (max {})",
            bits.len(),
            MAX_COMPACT_HASH_COUNT
        )));
    }
    let mut word = [0u8; 32];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            set_bit(&mut word, i);
        }
    }
    if stop_bit {
        set_bit(&mut word, bits.len());
    }
    Ok(word)
}

/// Unpack `count` bits from a 32-byte word, rejecting any set bit at or
/// above `first_unused` (the stop position for stop-bit streams, `count`
/// otherwise).
pub(crate) fn unpack_bits(
    word: &[u8; 32],
    count: usize,
    first_unused: usize,
) -> Result<Vec<bool>> {
    for pos in first_unused..256 {
        if get_bit(word, pos) {
            return Err(Error::MalformedProof(format!(
                "unexpected bit set at position {} in a {}-step stream",
                pos, count
            )));
        }
    }
    Ok((0..count).map(|i| get_bit(word, i)).collect())
}

/// The number of decommitments a flags/skips stream pair consumes: one per
/// step that neither merges two computed hashes nor skips.
pub(crate) fn expected_decommitments(flags: &[bool], skips: &[bool]) -> usize {
    flags
        .iter()
        .zip(skips)
        .filter(|(flag, skip)| !**flag && !**skip)
        .count()
}

/// The number of proved leaves implied by a flag stream: every flag step
/// merges two buffer entries and the automaton ends with exactly one.
pub(crate) fn proved_leaf_count(flags: &[bool]) -> usize {
    flags.iter().filter(|flag| **flag).count() + 1
}
