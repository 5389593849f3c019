//! Keccak-256 hashing primitives.
//!
//! The whole accumulator is built from one 2-to-1 compression function:
//! `keccak256(a || b)` over two 32-byte operands. Domain separation:
//! - Leaf image:    `keccak256(0^32 || element)`
//! - Interior node: `keccak256(left || right)` (ordered) or
//!   `keccak256(min || max)` (sorted)
//! - Root binding:  `keccak256(count as 32-byte BE || element_root)`
//!
//! The zero domain tag on leaves keeps raw elements out of interior hashes,
//! and the count binding distinguishes trees that share an interior root
//! (e.g. a 3-leaf tree from a 4-leaf tree ending in a duplicate).

use tiny_keccak::{Hasher as KeccakHasher, Keccak};

use crate::{Error, Result};

/// A 32-byte node hash.
pub type Hash = [u8; 32];

/// The all-zero hash: leaf domain tag and the root of an empty accumulator.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Keccak256 hash of an arbitrary byte string.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// The 2-to-1 compression function: `keccak256(a || b)`.
pub fn keccak_combine(a: &Hash, b: &Hash) -> Hash {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(a);
    input[32..].copy_from_slice(b);
    keccak256(&input)
}

/// Interior hashing variant, fixed per tree and per proof.
///
/// `Ordered` preserves operand positions, which keeps leaf indices
/// recoverable from a proof's bit streams. `Sorted` hashes the operands in
/// numeric order, which makes sibling order irrelevant and lets proofs omit
/// the order stream entirely. The two variants are not interchangeable at
/// runtime; a proof verifies only against a tree built with the same
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bincode::Encode, bincode::Decode)]
pub enum HashVariant {
    /// `hash(a, b) = keccak256(a || b)`.
    #[default]
    Ordered,
    /// `hash(a, b) = keccak256(min(a, b) || max(a, b))`, comparing the
    /// operands as big-endian integers.
    Sorted,
}

impl HashVariant {
    /// Hash a sibling pair into its parent node.
    pub fn combine(&self, left: &Hash, right: &Hash) -> Hash {
        match self {
            HashVariant::Ordered => keccak_combine(left, right),
            HashVariant::Sorted => {
                if left <= right {
                    keccak_combine(left, right)
                } else {
                    keccak_combine(right, left)
                }
            }
        }
    }

    /// Whether this variant preserves operand positions.
    pub fn is_ordered(&self) -> bool {
        matches!(self, HashVariant::Ordered)
    }
}

/// Compute the leaf image of an element: `keccak256(0^32 || element)`.
///
/// All proof algorithms operate on leaf images; bare elements never enter
/// interior hashes.
pub fn leaf_image(element: &Hash) -> Hash {
    keccak_combine(&ZERO_HASH, element)
}

/// Bind the element count into the root:
/// `keccak256(count as 32-byte BE || element_root)`.
pub fn bind_element_count(element_count: u32, element_root: &Hash) -> Hash {
    keccak_combine(&element_count_word(element_count), element_root)
}

/// The element count as a left-padded big-endian 32-byte word.
pub(crate) fn element_count_word(element_count: u32) -> Hash {
    let mut word = [0u8; 32];
    word[28..].copy_from_slice(&element_count.to_be_bytes());
    word
}

/// Coerce a byte slice into a 32-byte element.
pub(crate) fn element_from_slice(bytes: &[u8]) -> Result<Hash> {
    bytes.try_into().map_err(|_| {
        Error::InvalidElement(format!("element must be exactly 32 bytes, got {}", bytes.len()))
    })
}

/// Coerce a slice of byte strings into 32-byte elements.
pub(crate) fn elements_from_slices<E: AsRef<[u8]>>(elements: &[E]) -> Result<Vec<Hash>> {
    elements
        .iter()
        .map(|e| element_from_slice(e.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_known_vector() {
        // keccak256("") = c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
        let hash = keccak256(b"");
        assert_eq!(hash[0], 0xc5);
        assert_eq!(hash[1], 0xd2);
        assert_eq!(hash[31], 0x70);
    }

    #[test]
    fn test_combine_matches_concatenated_keccak() {
        let a = [0xAAu8; 32];
        let b = [0xBBu8; 32];
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(&a);
        input[32..].copy_from_slice(&b);
        assert_eq!(keccak_combine(&a, &b), keccak256(&input));
    }

    #[test]
    fn test_ordered_combine_is_positional() {
        let a = [0x01u8; 32];
        let b = [0x02u8; 32];
        let ab = HashVariant::Ordered.combine(&a, &b);
        let ba = HashVariant::Ordered.combine(&b, &a);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_sorted_combine_ignores_order() {
        let a = [0x01u8; 32];
        let b = [0x02u8; 32];
        let ab = HashVariant::Sorted.combine(&a, &b);
        let ba = HashVariant::Sorted.combine(&b, &a);
        assert_eq!(ab, ba);
        // min || max, so both equal the ordered hash of (a, b)
        assert_eq!(ab, HashVariant::Ordered.combine(&a, &b));
    }

    #[test]
    fn test_leaf_image_uses_zero_domain_tag() {
        let element = [0x42u8; 32];
        assert_eq!(leaf_image(&element), keccak_combine(&ZERO_HASH, &element));
        assert_ne!(leaf_image(&element), keccak256(&element));
    }

    #[test]
    fn test_element_count_word_is_left_padded() {
        let word = element_count_word(0x01020304);
        assert_eq!(&word[..28], &[0u8; 28]);
        assert_eq!(&word[28..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_element_from_slice_rejects_wrong_length() {
        assert!(element_from_slice(&[0u8; 31]).is_err());
        assert!(element_from_slice(&[0u8; 33]).is_err());
        assert!(element_from_slice(&[0u8; 32]).is_ok());
    }
}
