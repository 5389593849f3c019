//! Membership proofs for one element.
//!
//! A single proof carries the sibling hashes along the path from the leaf
//! to the interior root, topmost first. Levels where the sibling is absent
//! (the right-missing spine of an unbalanced tree) contribute nothing; the
//! verifier detects them by comparing the index against the shrinking
//! upper bound and promotes the running hash unchanged.

use bincode::{Decode, Encode};

use crate::{
    error::root_mismatch,
    hash::{bind_element_count, element_from_slice, leaf_image, Hash, HashVariant},
    Error, MerkleTree, Result,
};

/// Membership levels never exceed the 32-bit index space; more decommitments
/// than that is proof corruption, not a deeper tree.
const MAX_PATH_LEVELS: usize = 32;

/// A membership proof for a single leaf index.
#[derive(Debug, Clone, Encode, Decode)]
pub struct SingleProof {
    variant: HashVariant,
    element_count: u32,
    index: u32,
    decommitments: Vec<Hash>,
}

impl SingleProof {
    /// Generate a proof for the element at `index`.
    pub fn generate(tree: &MerkleTree, index: usize) -> Result<Self> {
        if index >= tree.element_count() {
            return Err(Error::InvalidInput(format!(
                "index {} out of range (element count {})",
                index,
                tree.element_count()
            )));
        }

        let mut decommitments = Vec::new();
        let mut node = tree.leaf_count() + index;
        while node > 1 {
            if let Some(&sibling) = tree.node(node ^ 1) {
                decommitments.push(sibling);
            }
            node >>= 1;
        }
        decommitments.reverse();

        Ok(SingleProof {
            variant: tree.variant(),
            element_count: tree.element_count() as u32,
            index: index as u32,
            decommitments,
        })
    }

    /// The element count of the tree this proof was generated against.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// The proved leaf index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The sibling hashes along the path, topmost first.
    pub fn decommitments(&self) -> &[Hash] {
        &self.decommitments
    }

    /// Verify that `element` sits at the proved index under
    /// `expected_root`.
    pub fn verify(&self, expected_root: &Hash, element: &[u8]) -> Result<()> {
        let image = leaf_image(&element_from_slice(element)?);
        let element_root = self.fold(image, None)?.0;
        let computed = bind_element_count(self.element_count, &element_root);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(())
    }

    /// Verify `element` against `expected_root` and compute the root after
    /// replacing it with `new_element`; both folds share the
    /// decommitments.
    pub fn update_root(
        &self,
        expected_root: &Hash,
        element: &[u8],
        new_element: &[u8],
    ) -> Result<Hash> {
        let image = leaf_image(&element_from_slice(element)?);
        let new_image = leaf_image(&element_from_slice(new_element)?);
        let (element_root, new_element_root) = self.fold(image, Some(new_image))?;
        let computed = bind_element_count(self.element_count, &element_root);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(bind_element_count(
            self.element_count,
            &new_element_root.unwrap_or(new_image),
        ))
    }

    /// Fold from the leaf image to the interior root, consuming the
    /// decommitments deepest-first. At each level the index parity decides
    /// the operand order; a node equal to the upper bound with no odd bit
    /// has no right sibling and is promoted unchanged.
    fn fold(&self, image: Hash, new_image: Option<Hash>) -> Result<(Hash, Option<Hash>)> {
        if self.element_count == 0 {
            return Err(Error::MalformedProof(
                "single proof against an empty tree".into(),
            ));
        }
        if self.index >= self.element_count {
            return Err(Error::MalformedProof(format!(
                "index {} out of range (element count {})",
                self.index, self.element_count
            )));
        }
        if self.decommitments.len() > MAX_PATH_LEVELS {
            return Err(Error::MalformedProof(format!(
                "{} decommitments exceed the maximum path length",
                self.decommitments.len()
            )));
        }

        let mut index = self.index;
        let mut upper_bound = self.element_count - 1;
        let mut hash = image;
        let mut new_hash = new_image;
        let mut remaining = self.decommitments.len();

        for _ in 0..MAX_PATH_LEVELS {
            if remaining == 0 {
                break;
            }
            if index & 1 == 1 {
                remaining -= 1;
                let sibling = &self.decommitments[remaining];
                hash = self.variant.combine(sibling, &hash);
                new_hash = new_hash.map(|h| self.variant.combine(sibling, &h));
            } else if index != upper_bound {
                remaining -= 1;
                let sibling = &self.decommitments[remaining];
                hash = self.variant.combine(&hash, sibling);
                new_hash = new_hash.map(|h| self.variant.combine(&h, sibling));
            }
            // index == upper_bound and even: no right sibling, promote
            index >>= 1;
            upper_bound >>= 1;
        }
        if remaining != 0 {
            return Err(Error::MalformedProof(format!(
                "{} decommitments left unconsumed",
                remaining
            )));
        }
        Ok((hash, new_hash))
    }
}
