//! Append proofs: grow the committed sequence without the full tree.
//!
//! Appending to an N-element tree only touches the right edge. The proof
//! carries the roots of the perfect subtrees on the left of that frontier,
//! topmost first — exactly one per set bit of N — which is enough to
//! recompute the old interior root (verification) and to fold newly
//! appended leaves into the new one.

use bincode::{Decode, Encode};

use crate::{
    error::root_mismatch,
    hash::{
        bind_element_count, element_count_word, element_from_slice, elements_from_slices,
        leaf_image, Hash, HashVariant, ZERO_HASH,
    },
    tree::MAX_ELEMENT_COUNT,
    Error, MerkleTree, Result,
};

/// An append proof: the frontier decommitments of an N-element tree.
#[derive(Debug, Clone, Encode, Decode)]
pub struct AppendProof {
    variant: HashVariant,
    element_count: u32,
    decommitments: Vec<Hash>,
}

impl AppendProof {
    /// Generate an append proof for the tree's current state.
    ///
    /// An empty tree yields an empty proof; appends against it build the
    /// first elements from scratch.
    pub fn generate(tree: &MerkleTree) -> Result<Self> {
        let element_count = tree.element_count();
        let mut decommitments = Vec::with_capacity(element_count.count_ones() as usize);

        // Walk the virtual position of the next element upward; each odd
        // position (and the filled half under the root, position 2) has a
        // perfect subtree on its left.
        let mut node = tree.leaf_count() + element_count;
        while node > 1 {
            if node & 1 == 1 || node == 2 {
                let sibling = tree.node(node - 1).ok_or_else(|| {
                    Error::InvalidInput(format!("missing frontier node {}", node - 1))
                })?;
                decommitments.push(*sibling);
            }
            node >>= 1;
        }
        decommitments.reverse();

        Ok(AppendProof {
            variant: tree.variant(),
            element_count: element_count as u32,
            decommitments,
        })
    }

    /// The element count of the tree this proof was generated against.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// The frontier subtree roots, topmost first.
    pub fn decommitments(&self) -> &[Hash] {
        &self.decommitments
    }

    fn validate(&self) -> Result<()> {
        let expected = self.element_count.count_ones() as usize;
        if self.decommitments.len() != expected {
            return Err(Error::MalformedProof(format!(
                "append proof for {} elements needs {} decommitments, found {}",
                self.element_count,
                expected,
                self.decommitments.len()
            )));
        }
        Ok(())
    }

    /// Verify that this proof's frontier matches `expected_root`.
    pub fn verify(&self, expected_root: &Hash) -> Result<()> {
        self.validate()?;
        let computed = match fold_frontier(&self.decommitments, self.variant) {
            Some(element_root) => bind_element_count(self.element_count, &element_root),
            None => ZERO_HASH,
        };
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(())
    }

    /// Verify against `expected_root` and compute the root after appending
    /// one element.
    pub fn append_root(&self, expected_root: &Hash, element: &[u8]) -> Result<Hash> {
        self.validate()?;
        self.check_capacity(1)?;
        let image = leaf_image(&element_from_slice(element)?);

        let Some(deepest) = self.decommitments.last() else {
            // Empty tree: the new element is the whole tree.
            if *expected_root != ZERO_HASH {
                return Err(root_mismatch(expected_root, &ZERO_HASH));
            }
            return Ok(bind_element_count(1, &image));
        };

        // The new leaf pairs with the deepest frontier subtree; every
        // shallower decommitment folds in on the left of both runs.
        let mut old = *deepest;
        let mut new = self.variant.combine(deepest, &image);
        for decommitment in self.decommitments.iter().rev().skip(1) {
            new = self.variant.combine(decommitment, &new);
            old = self.variant.combine(decommitment, &old);
        }

        let computed = bind_element_count(self.element_count, &old);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(bind_element_count(self.element_count + 1, &new))
    }

    /// Verify against `expected_root` and compute the root after appending
    /// a batch of elements.
    pub fn append_root_multi<E: AsRef<[u8]>>(
        &self,
        expected_root: &Hash,
        elements: &[E],
    ) -> Result<Hash> {
        self.validate()?;
        if elements.is_empty() {
            return Err(Error::InvalidInput(
                "appended elements must not be empty".into(),
            ));
        }
        self.check_capacity(elements.len())?;
        let images: Vec<Hash> = elements_from_slices(elements)?
            .iter()
            .map(leaf_image)
            .collect();

        let appended = images.len();
        let (old, new) = fold_append(
            self.element_count as usize,
            &self.decommitments,
            images,
            self.variant,
        )?;

        let computed = match old {
            Some(element_root) => bind_element_count(self.element_count, &element_root),
            None => ZERO_HASH,
        };
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(bind_element_count(
            self.element_count + appended as u32,
            &new,
        ))
    }

    fn check_capacity(&self, appended: usize) -> Result<()> {
        if self.element_count as usize + appended > MAX_ELEMENT_COUNT {
            return Err(Error::CapacityExceeded(format!(
                "appending {} elements to {} exceeds the maximum count",
                appended, self.element_count
            )));
        }
        Ok(())
    }

    /// Serialize to the wire format: the element count word followed by the
    /// frontier decommitments.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32 * (1 + self.decommitments.len()));
        bytes.extend_from_slice(&element_count_word(self.element_count));
        for decommitment in &self.decommitments {
            bytes.extend_from_slice(decommitment);
        }
        bytes
    }

    /// Deserialize from the wire format, checking that the decommitment
    /// count matches the set bits of the element count.
    pub fn from_bytes(bytes: &[u8], variant: HashVariant) -> Result<Self> {
        if bytes.len() % 32 != 0 || bytes.is_empty() {
            return Err(Error::MalformedProof(format!(
                "wire length {} is not a positive multiple of 32",
                bytes.len()
            )));
        }
        let count_word = &bytes[..32];
        if count_word[..28].iter().any(|byte| *byte != 0) {
            return Err(Error::CapacityExceeded(
                "element count does not fit 32 bits".into(),
            ));
        }
        let element_count = u32::from_be_bytes(
            count_word[28..]
                .try_into()
                .expect("the element count word tail is 4 bytes"),
        );
        let proof = AppendProof {
            variant,
            element_count,
            decommitments: bytes[32..]
                .chunks_exact(32)
                .map(|chunk| chunk.try_into().expect("chunks are 32 bytes"))
                .collect(),
        };
        proof.validate()?;
        Ok(proof)
    }
}

/// Recompute an interior root from frontier decommitments alone: the
/// deepest subtree root, with each shallower one folded in on the left.
/// `None` when the frontier is empty (an empty tree).
pub(crate) fn fold_frontier(decommitments: &[Hash], variant: HashVariant) -> Option<Hash> {
    let mut iter = decommitments.iter().rev();
    let mut hash = *iter.next()?;
    for decommitment in iter {
        hash = variant.combine(decommitment, &hash);
    }
    Some(hash)
}

/// Fold a batch of appended leaf images into an N-element frontier.
///
/// Level by level from the bottom: when the leftmost slot sits at an odd
/// position, the level merges with one frontier decommitment on its left
/// (folding the old root along the way); adjacent slots pair up; a
/// dangling slot at the upper bound promotes unchanged. Returns the old
/// interior root (`None` when N = 0) and the new one.
pub(crate) fn fold_append(
    element_count: usize,
    decommitments: &[Hash],
    images: Vec<Hash>,
    variant: HashVariant,
) -> Result<(Option<Hash>, Hash)> {
    if images.is_empty() {
        return Err(Error::InvalidInput("no leaf images supplied".into()));
    }
    let mut level = images;
    let mut start = element_count;
    let mut remaining = decommitments.len();
    let mut old: Option<Hash> = None;

    while level.len() > 1 || start > 0 {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        let mut slot = 0;

        if start & 1 == 1 {
            if remaining == 0 {
                return Err(Error::MalformedProof(
                    "append frontier exhausted mid-fold".into(),
                ));
            }
            remaining -= 1;
            let decommitment = decommitments[remaining];
            old = Some(match old {
                None => decommitment,
                Some(hash) => variant.combine(&decommitment, &hash),
            });
            next.push(variant.combine(&decommitment, &level[0]));
            slot = 1;
        }
        while slot + 1 < level.len() {
            next.push(variant.combine(&level[slot], &level[slot + 1]));
            slot += 2;
        }
        if slot < level.len() {
            // Rightmost node of the level, no sibling yet: promote.
            next.push(level[slot]);
        }

        level = next;
        start >>= 1;
    }

    if remaining != 0 {
        return Err(Error::MalformedProof(format!(
            "{} frontier decommitments left unconsumed",
            remaining
        )));
    }
    let new = level
        .first()
        .copied()
        .ok_or_else(|| Error::InvalidInput("no leaf images supplied".into()))?;
    Ok((old, new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generate_elements;

    fn build(count: usize, variant: HashVariant) -> (Vec<Hash>, MerkleTree) {
        let elements = generate_elements(count, &[0xff]);
        let tree = MerkleTree::new(&elements, variant).expect("build tree");
        (elements, tree)
    }

    #[test]
    fn test_decommitment_count_is_popcount() {
        for count in [1usize, 2, 3, 5, 8, 9, 12, 48, 365] {
            let (_, tree) = build(count, HashVariant::Ordered);
            let proof = AppendProof::generate(&tree).expect("generate");
            assert_eq!(
                proof.decommitments().len(),
                count.count_ones() as usize,
                "element count {}",
                count
            );
            proof.verify(&tree.root()).expect("verify");
        }
    }

    #[test]
    fn test_single_append_matches_rebuilt_tree() {
        for count in [1usize, 2, 3, 7, 8, 9, 12, 31] {
            let elements = generate_elements(count + 1, &[0xff]);
            let tree = MerkleTree::new(&elements[..count], HashVariant::Ordered).expect("build");
            let proof = AppendProof::generate(&tree).expect("generate");
            let new_root = proof
                .append_root(&tree.root(), &elements[count])
                .expect("append root");
            let rebuilt =
                MerkleTree::new(&elements, HashVariant::Ordered).expect("build appended");
            assert_eq!(new_root, rebuilt.root(), "element count {}", count);
        }
    }

    #[test]
    fn test_multi_append_matches_rebuilt_tree() {
        for (count, appended) in [(1usize, 3usize), (5, 1), (8, 8), (9, 5), (12, 7), (21, 11)] {
            let elements = generate_elements(count + appended, &[0xff]);
            let tree = MerkleTree::new(&elements[..count], HashVariant::Ordered).expect("build");
            let proof = AppendProof::generate(&tree).expect("generate");
            let new_root = proof
                .append_root_multi(&tree.root(), &elements[count..])
                .expect("append root");
            let rebuilt =
                MerkleTree::new(&elements, HashVariant::Ordered).expect("build appended");
            assert_eq!(
                new_root,
                rebuilt.root(),
                "element count {} + {}",
                count,
                appended
            );
        }
    }

    #[test]
    fn test_append_to_empty_tree() {
        let tree = MerkleTree::new::<[u8; 32]>(&[], HashVariant::Ordered).expect("build empty");
        let proof = AppendProof::generate(&tree).expect("generate");
        assert!(proof.decommitments().is_empty());
        proof.verify(&tree.root()).expect("verify empty");

        let elements = generate_elements(5, &[0xff]);
        let single = proof
            .append_root(&tree.root(), &elements[0])
            .expect("append one");
        assert_eq!(
            single,
            MerkleTree::new(&elements[..1], HashVariant::Ordered)
                .expect("build one")
                .root()
        );

        let multi = proof
            .append_root_multi(&tree.root(), &elements)
            .expect("append five");
        assert_eq!(
            multi,
            MerkleTree::new(&elements, HashVariant::Ordered)
                .expect("build five")
                .root()
        );
    }

    #[test]
    fn test_sorted_variant_appends() {
        let elements = generate_elements(14, &[0xff]);
        let tree = MerkleTree::new(&elements[..9], HashVariant::Sorted).expect("build");
        let proof = AppendProof::generate(&tree).expect("generate");
        let new_root = proof
            .append_root_multi(&tree.root(), &elements[9..])
            .expect("append root");
        let rebuilt = MerkleTree::new(&elements, HashVariant::Sorted).expect("build appended");
        assert_eq!(new_root, rebuilt.root());
    }

    #[test]
    fn test_stale_root_rejected() {
        let (elements, tree) = build(9, HashVariant::Ordered);
        let proof = AppendProof::generate(&tree).expect("generate");
        let stale = [0x77u8; 32];
        assert!(matches!(
            proof.verify(&stale),
            Err(Error::RootMismatch { .. })
        ));
        assert!(matches!(
            proof.append_root(&stale, &elements[0]),
            Err(Error::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_decommitment_count_is_malformed() {
        let (_, tree) = build(9, HashVariant::Ordered);
        let mut proof = AppendProof::generate(&tree).expect("generate");
        proof.decommitments.pop();
        assert!(matches!(
            proof.verify(&tree.root()),
            Err(Error::MalformedProof(_))
        ));
    }

    #[test]
    fn test_empty_append_batch_rejected() {
        let (_, tree) = build(4, HashVariant::Ordered);
        let proof = AppendProof::generate(&tree).expect("generate");
        let result = proof.append_root_multi::<[u8; 32]>(&tree.root(), &[]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_wire_roundtrip() {
        let (_, tree) = build(12, HashVariant::Ordered);
        let proof = AppendProof::generate(&tree).expect("generate");
        let bytes = proof.to_bytes();
        // count word + popcount(12) = 2 decommitments
        assert_eq!(bytes.len(), 32 * 3);
        let decoded = AppendProof::from_bytes(&bytes, HashVariant::Ordered).expect("decode");
        decoded.verify(&tree.root()).expect("verify decoded");
    }

    #[test]
    fn test_wire_rejects_count_decommitment_mismatch() {
        let (_, tree) = build(12, HashVariant::Ordered);
        let proof = AppendProof::generate(&tree).expect("generate");
        let mut bytes = proof.to_bytes();
        bytes.extend_from_slice(&[0u8; 32]); // one decommitment too many
        assert!(matches!(
            AppendProof::from_bytes(&bytes, HashVariant::Ordered),
            Err(Error::MalformedProof(_))
        ));
    }
}
