//! Combined proofs: update committed elements and append new ones in a
//! single pass.
//!
//! A combined proof is a multi-proof whose smallest updated index is at or
//! past [`minimum_combined_proof_index`]. Under that constraint the
//! frontier subtree roots an append needs are all reachable from the
//! update pass itself: the deepest one is recomputed from the updated
//! leaves, and every shallower one arrives as a multi-proof decommitment.
//!
//! Verification replays the multi-proof automaton with every buffer slot
//! tagged by its flat node position, captures the frontier values as they
//! are computed or consumed, then runs the ordinary multi-append fold over
//! them.

use bincode::{Decode, Encode};

use crate::{
    error::root_mismatch,
    hash::{bind_element_count, elements_from_slices, leaf_image, Hash},
    proof::{append::fold_append, infer_indices, MultiProof},
    tree::{validate_indices, MAX_ELEMENT_COUNT},
    Error, MerkleTree, Result,
};

/// The smallest index a combined update-and-append proof may update, for a
/// tree of `element_count` elements.
///
/// This is the leftmost leaf of the deepest frontier subtree: strip the
/// trailing zero bits of the count, clear the lowest set bit, and shift
/// back. Updates below it would need sibling hashes that neither the
/// update nor the append side of the proof carries.
pub fn minimum_combined_proof_index(element_count: usize) -> usize {
    if element_count == 0 {
        return 0;
    }
    let trailing = element_count.trailing_zeros();
    ((element_count >> trailing) ^ 1) << trailing
}

/// A proof authorizing a simultaneous element update and append.
#[derive(Debug, Clone, Encode, Decode)]
pub struct CombinedProof {
    proof: MultiProof,
}

/// A circular-buffer slot tagged with its flat node position.
struct Slot {
    position: usize,
    hash: Hash,
    new_hash: Hash,
}

impl CombinedProof {
    /// Generate a combined proof covering the given update indices.
    ///
    /// # Errors
    ///
    /// [`Error::MinimumIndexViolation`] when the smallest index is below
    /// [`minimum_combined_proof_index`] for the tree's element count.
    pub fn generate(tree: &MerkleTree, indices: &[usize]) -> Result<Self> {
        let proof = MultiProof::generate(tree, indices)?;
        let minimum = minimum_combined_proof_index(tree.element_count());
        if indices[0] < minimum {
            return Err(Error::MinimumIndexViolation {
                index: indices[0],
                minimum,
            });
        }
        Ok(CombinedProof { proof })
    }

    /// The underlying multi-proof.
    pub fn proof(&self) -> &MultiProof {
        &self.proof
    }

    /// The element count of the tree this proof was generated against.
    pub fn element_count(&self) -> u32 {
        self.proof.element_count()
    }

    /// Verify only the existence side of the proof.
    pub fn verify<E: AsRef<[u8]>>(&self, expected_root: &Hash, elements: &[E]) -> Result<()> {
        self.proof.verify(expected_root, elements)
    }

    /// Verify `elements` at `indices` against `expected_root`, then compute
    /// the root after replacing them with `new_elements` and appending
    /// `appended`.
    pub fn update_and_append_root<E, F, G>(
        &self,
        expected_root: &Hash,
        indices: &[usize],
        elements: &[E],
        new_elements: &[F],
        appended: &[G],
    ) -> Result<Hash>
    where
        E: AsRef<[u8]>,
        F: AsRef<[u8]>,
        G: AsRef<[u8]>,
    {
        self.proof.validate()?;
        let element_count = self.proof.element_count() as usize;
        validate_indices(indices, element_count)?;

        let minimum = minimum_combined_proof_index(element_count);
        if indices[0] < minimum {
            return Err(Error::MinimumIndexViolation {
                index: indices[0],
                minimum,
            });
        }
        if appended.is_empty() {
            return Err(Error::InvalidInput(
                "appended elements must not be empty".into(),
            ));
        }
        if element_count + appended.len() > MAX_ELEMENT_COUNT {
            return Err(Error::CapacityExceeded(format!(
                "appending {} elements to {} exceeds the maximum count",
                appended.len(),
                element_count
            )));
        }
        let width = self.proof.proved_count();
        if indices.len() != width || elements.len() != width || new_elements.len() != width {
            return Err(Error::MalformedProof(format!(
                "proof covers {} elements, {} indices / {} elements / {} replacements supplied",
                width,
                indices.len(),
                elements.len(),
                new_elements.len()
            )));
        }
        // For ordered proofs the streams pin the indices exactly; reject a
        // caller whose claimed indices disagree.
        if self.proof.variant().is_ordered() && infer_indices(&self.proof)? != indices {
            return Err(Error::MalformedProof(
                "supplied indices disagree with the proof streams".into(),
            ));
        }

        let variant = self.proof.variant();
        let images: Vec<Hash> = elements_from_slices(elements)?.iter().map(leaf_image).collect();
        let new_images: Vec<Hash> = elements_from_slices(new_elements)?
            .iter()
            .map(leaf_image)
            .collect();

        let leaf_slots = element_count.max(1).next_power_of_two();
        let targets = frontier_positions(element_count, leaf_slots);
        let mut captured: Vec<Option<Hash>> = vec![None; targets.len()];

        let mut slots: Vec<Slot> = indices
            .iter()
            .zip(images.iter().zip(&new_images))
            .rev()
            .map(|(&index, (&hash, &new_hash))| Slot {
                position: leaf_slots + index,
                hash,
                new_hash,
            })
            .collect();
        // The deepest frontier subtree can be a single leaf; its updated
        // image is captured straight from the initial slots.
        for slot in &slots {
            capture(&targets, &mut captured, slot.position, slot.new_hash);
        }

        let flags = self.proof.flags();
        let skips = self.proof.skips();
        let orders = self.proof.orders();
        let decommitments = self.proof.decommitments();
        let mut read = 0;
        let mut write = 0;
        let mut decommitment_index = 0;

        for step in 0..flags.len() {
            let parent = if skips[step] {
                let node = &slots[read];
                read = (read + 1) % width;
                if node.position & 1 == 1 {
                    return Err(Error::MalformedProof(
                        "skip step on a right child".into(),
                    ));
                }
                Slot {
                    position: node.position >> 1,
                    hash: node.hash,
                    new_hash: node.new_hash,
                }
            } else if flags[step] {
                let right = &slots[read];
                let (right_position, right_hash, right_new) =
                    (right.position, right.hash, right.new_hash);
                read = (read + 1) % width;
                let left = &slots[read];
                read = (read + 1) % width;
                if left.position & 1 == 1 || right_position != left.position + 1 {
                    return Err(Error::MalformedProof(
                        "merged operands are not siblings".into(),
                    ));
                }
                Slot {
                    position: left.position >> 1,
                    hash: variant.combine(&left.hash, &right_hash),
                    new_hash: variant.combine(&left.new_hash, &right_new),
                }
            } else {
                let node = &slots[read];
                let (position, hash, new_hash) = (node.position, node.hash, node.new_hash);
                read = (read + 1) % width;
                let decommitment = *decommitments.get(decommitment_index).ok_or_else(|| {
                    Error::MalformedProof("decommitments exhausted mid-proof".into())
                })?;
                decommitment_index += 1;
                let known_is_left = position & 1 == 0;
                if let Some(orders) = orders {
                    if orders[step] != known_is_left {
                        return Err(Error::MalformedProof(
                            "order bit disagrees with the node position".into(),
                        ));
                    }
                }
                capture(&targets, &mut captured, position ^ 1, decommitment);
                let (combined, new_combined) = if known_is_left {
                    (
                        variant.combine(&hash, &decommitment),
                        variant.combine(&new_hash, &decommitment),
                    )
                } else {
                    (
                        variant.combine(&decommitment, &hash),
                        variant.combine(&decommitment, &new_hash),
                    )
                };
                Slot {
                    position: position >> 1,
                    hash: combined,
                    new_hash: new_combined,
                }
            };

            capture(&targets, &mut captured, parent.position, parent.new_hash);
            slots[write] = parent;
            write = (write + 1) % width;
        }

        let root_slot = &slots[if write == 0 { width - 1 } else { write - 1 }];
        if root_slot.position != 1 {
            return Err(Error::MalformedProof(
                "proof does not fold up to the root".into(),
            ));
        }
        let computed = bind_element_count(element_count as u32, &root_slot.hash);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }

        let frontier: Vec<Hash> = captured
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                Error::MalformedProof("proof does not cover the append frontier".into())
            })?;

        let append_images: Vec<Hash> = elements_from_slices(appended)?
            .iter()
            .map(leaf_image)
            .collect();
        let appended_count = append_images.len();
        let (updated_root, new_root) =
            fold_append(element_count, &frontier, append_images, variant)?;
        if updated_root != Some(root_slot.new_hash) {
            return Err(Error::MalformedProof(
                "captured frontier disagrees with the updated root".into(),
            ));
        }
        Ok(bind_element_count(
            (element_count + appended_count) as u32,
            &new_root,
        ))
    }
}

/// The flat positions of the frontier subtree roots of an
/// `element_count`-element tree, topmost first.
fn frontier_positions(element_count: usize, leaf_slots: usize) -> Vec<usize> {
    let mut positions = Vec::with_capacity(element_count.count_ones() as usize);
    let mut node = leaf_slots + element_count;
    while node > 1 {
        if node & 1 == 1 || node == 2 {
            positions.push(node - 1);
        }
        node >>= 1;
    }
    positions.reverse();
    positions
}

fn capture(targets: &[usize], captured: &mut [Option<Hash>], position: usize, value: Hash) {
    if let Some(i) = targets.iter().position(|target| *target == position) {
        captured[i].get_or_insert(value);
    }
}
