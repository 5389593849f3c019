//! Test utilities: deterministic element generation.

use crate::hash::{keccak256, Hash};

/// Generate a deterministic chain of 32-byte elements from a seed:
/// each element is the keccak256 of the previous one, starting from the
/// raw seed bytes.
pub(crate) fn generate_elements(count: usize, seed: &[u8]) -> Vec<Hash> {
    let mut elements = Vec::with_capacity(count);
    let mut current = seed.to_vec();
    for _ in 0..count {
        let next = keccak256(&current);
        elements.push(next);
        current = next.to_vec();
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate_elements(5, &[0xff]), generate_elements(5, &[0xff]));
        assert_ne!(
            generate_elements(5, &[0xff]),
            generate_elements(5, &[0xaa])
        );
    }

    #[test]
    fn test_generation_is_a_prefix_chain() {
        let long = generate_elements(10, &[0xff]);
        let short = generate_elements(4, &[0xff]);
        assert_eq!(&long[..4], &short[..]);
        assert_eq!(long[3], keccak256(&long[2]));
    }
}
