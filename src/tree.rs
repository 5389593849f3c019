//! The appendable Merkle tree over 32-byte elements.
//!
//! A tree over N elements is a perfect binary tree over the next power of
//! two L >= N, stored as a flat array of length 2L: index 1 is the interior
//! root, children of `i` are `2i` and `2i + 1`, and the leaf image of
//! element `i` sits at `L + i`. Slots whose subtree holds no real leaf are
//! absent; an interior node with only a left child takes that child's value
//! unchanged, which gives every element count a unique canonical root.
//!
//! The published root binds the element count:
//! `root = keccak256(N as 32-byte BE || node[1])`, and the root of an empty
//! tree is the all-zero hash.

use crate::{
    hash::{
        bind_element_count, element_from_slice, elements_from_slices, leaf_image, Hash,
        HashVariant, ZERO_HASH,
    },
    Error, Result,
};

/// Maximum number of elements an accumulator can commit to (the count is
/// bound into the root as a 32-bit big-endian field).
pub const MAX_ELEMENT_COUNT: usize = u32::MAX as usize;

/// An immutable Merkle tree over a sequence of 32-byte elements.
///
/// Trees are value types: [`update`](Self::update) and
/// [`append`](Self::append) return new trees and leave the receiver
/// untouched. Proof generation borrows the tree; proof verification needs
/// only the root (and element count) and lives in [`crate::proof`].
#[derive(Debug, Clone)]
pub struct MerkleTree {
    variant: HashVariant,
    elements: Vec<Hash>,
    nodes: Vec<Option<Hash>>,
    root: Hash,
}

impl MerkleTree {
    /// Build a tree from a sequence of 32-byte elements.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidElement`] if any element is not exactly 32 bytes;
    /// [`Error::CapacityExceeded`] if there are 2^32 or more elements.
    pub fn new<E: AsRef<[u8]>>(elements: &[E], variant: HashVariant) -> Result<Self> {
        let elements = elements_from_slices(elements)?;
        Self::from_elements(elements, variant)
    }

    fn from_elements(elements: Vec<Hash>, variant: HashVariant) -> Result<Self> {
        if elements.len() > MAX_ELEMENT_COUNT {
            return Err(Error::CapacityExceeded(format!(
                "element count {} exceeds the maximum of {}",
                elements.len(),
                MAX_ELEMENT_COUNT
            )));
        }

        let count = elements.len();
        let leaf_count = count.max(1).next_power_of_two();
        let mut nodes: Vec<Option<Hash>> = vec![None; 2 * leaf_count];

        for (i, element) in elements.iter().enumerate() {
            nodes[leaf_count + i] = Some(leaf_image(element));
        }
        for i in (1..leaf_count).rev() {
            nodes[i] = match (nodes[2 * i], nodes[2 * i + 1]) {
                (Some(left), Some(right)) => Some(variant.combine(&left, &right)),
                (Some(left), None) => Some(left),
                _ => None,
            };
        }

        let root = match nodes[1] {
            Some(element_root) if count > 0 => bind_element_count(count as u32, &element_root),
            _ => ZERO_HASH,
        };

        Ok(MerkleTree {
            variant,
            elements,
            nodes,
            root,
        })
    }

    /// The published root: `keccak256(N || element_root)`, or the all-zero
    /// hash for an empty tree.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// The interior root (node 1), before the element count is bound in.
    ///
    /// `None` for an empty tree.
    pub fn element_root(&self) -> Option<Hash> {
        self.nodes[1]
    }

    /// The number of committed elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// The tree depth: 0 for a single element, `ceil(log2(N))` otherwise.
    pub fn depth(&self) -> u32 {
        self.leaf_count().trailing_zeros()
    }

    /// The interior hashing variant this tree was built with.
    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    /// The committed elements, in order.
    pub fn elements(&self) -> &[Hash] {
        &self.elements
    }

    /// The number of leaf slots (the power of two the tree is padded to).
    pub(crate) fn leaf_count(&self) -> usize {
        self.nodes.len() / 2
    }

    /// The node at flat index `i`, if its subtree holds any real leaf.
    pub(crate) fn node(&self, i: usize) -> Option<&Hash> {
        self.nodes.get(i).and_then(|n| n.as_ref())
    }

    /// Return a new tree with the elements at `indices` replaced.
    ///
    /// Indices must be strictly ascending and in range; `new_elements` must
    /// have the same length as `indices`.
    pub fn update<E: AsRef<[u8]>>(&self, indices: &[usize], new_elements: &[E]) -> Result<Self> {
        validate_indices(indices, self.element_count())?;
        if indices.len() != new_elements.len() {
            return Err(Error::InvalidInput(format!(
                "{} indices but {} replacement elements",
                indices.len(),
                new_elements.len()
            )));
        }

        let mut elements = self.elements.clone();
        for (&index, element) in indices.iter().zip(new_elements) {
            elements[index] = element_from_slice(element.as_ref())?;
        }
        Self::from_elements(elements, self.variant)
    }

    /// Return a new tree with `appended` added after the current elements.
    pub fn append<E: AsRef<[u8]>>(&self, appended: &[E]) -> Result<Self> {
        let mut elements = self.elements.clone();
        elements.extend(elements_from_slices(appended)?);
        Self::from_elements(elements, self.variant)
    }
}

/// Check that proof indices are strictly ascending and within the element
/// count.
pub(crate) fn validate_indices(indices: &[usize], element_count: usize) -> Result<()> {
    if indices.is_empty() {
        return Err(Error::InvalidInput("indices must not be empty".into()));
    }
    for pair in indices.windows(2) {
        if pair[0] >= pair[1] {
            return Err(Error::UnsortedIndices);
        }
    }
    let last = indices[indices.len() - 1];
    if last >= element_count {
        return Err(Error::InvalidInput(format!(
            "index {} out of range (element count {})",
            last, element_count
        )));
    }
    Ok(())
}
