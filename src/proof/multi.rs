//! Multi-element existence proofs and the bit-stream hash automaton.
//!
//! A multi-proof commits to a set of leaf indices with three parallel bit
//! streams, one bit per hash step:
//! - `flags` — both operands of this step are previously-computed hashes;
//! - `skips` — this step promotes a node unchanged (right sibling missing
//!   in an unbalanced tree);
//! - `orders` — the computed hash is the left operand (ordered variant
//!   only; sorted trees need no positions).
//!
//! Verification replays the steps over a fixed-size circular buffer seeded
//! with the leaf images in reverse index order. The `read` and `write`
//! cursors only move forward and wrap modulo the buffer length; the
//! wrap-around is load-bearing and must not be replaced with a stack.
//!
//! The compact form packs each stream into one 32-byte word. `flags` and
//! `skips` carry a stop bit one position above the last step; the reserved
//! combination "flag and skip both set" marks end-of-stream, so a step
//! count never needs to travel separately.

use bincode::{Decode, Encode};

use crate::{
    error::root_mismatch,
    hash::{bind_element_count, elements_from_slices, leaf_image, Hash, HashVariant},
    proof::{
        expected_decommitments, get_bit, pack_bits, proved_leaf_count, unpack_bits,
        MAX_COMPACT_HASH_COUNT,
    },
    tree::validate_indices,
    Error, MerkleTree, Result,
};

/// An existence proof for a set of leaf indices, bit streams in boolean
/// form.
///
/// The proof does not carry the proved elements; verifiers supply them in
/// ascending index order. The hashing variant is implied by the presence of
/// the `orders` stream.
#[derive(Debug, Clone, Encode, Decode)]
pub struct MultiProof {
    element_count: u32,
    flags: Vec<bool>,
    skips: Vec<bool>,
    orders: Option<Vec<bool>>,
    decommitments: Vec<Hash>,
}

impl MultiProof {
    /// Generate a proof for the given strictly-ascending leaf indices.
    pub fn generate(tree: &MerkleTree, indices: &[usize]) -> Result<Self> {
        validate_indices(indices, tree.element_count())?;

        let leaf_count = tree.leaf_count();
        let mut known = vec![false; 2 * leaf_count];
        let mut relevant = vec![false; 2 * leaf_count];
        for &index in indices {
            known[leaf_count + index] = true;
            relevant[(leaf_count + index) >> 1] = true;
        }

        let mut flags = Vec::new();
        let mut skips = Vec::new();
        let mut orders = Vec::new();
        let mut decommitments = Vec::new();

        for node in (1..leaf_count).rev() {
            let left = known[2 * node];
            let right = known[2 * node + 1];
            // The sibling of the known child: the right child when the left
            // is known, the left child otherwise.
            let sibling = tree.node(2 * node + left as usize);

            if left != right {
                if let Some(&sibling) = sibling {
                    decommitments.push(sibling);
                }
            }
            if relevant[node] {
                flags.push(left == right);
                skips.push(sibling.is_none());
                orders.push(left);
                relevant[node >> 1] = true;
            }
            known[node] = left || right;
        }

        Ok(MultiProof {
            element_count: tree.element_count() as u32,
            flags,
            skips,
            orders: tree.variant().is_ordered().then_some(orders),
            decommitments,
        })
    }

    /// The element count of the tree this proof was generated against.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// The number of hash steps.
    pub fn hash_count(&self) -> usize {
        self.flags.len()
    }

    /// The number of leaves this proof covers.
    pub fn proved_count(&self) -> usize {
        proved_leaf_count(&self.flags)
    }

    /// The flag bits, one per step.
    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    /// The skip bits, one per step.
    pub fn skips(&self) -> &[bool] {
        &self.skips
    }

    /// The order bits, one per step; `None` for sorted-variant proofs.
    pub fn orders(&self) -> Option<&[bool]> {
        self.orders.as_deref()
    }

    /// The sibling hashes consumed by non-flag, non-skip steps.
    pub fn decommitments(&self) -> &[Hash] {
        &self.decommitments
    }

    /// The hashing variant, implied by the presence of the order stream.
    pub fn variant(&self) -> HashVariant {
        if self.orders.is_some() {
            HashVariant::Ordered
        } else {
            HashVariant::Sorted
        }
    }

    /// Check internal consistency: stream lengths, no reserved flag+skip
    /// combination, and a decommitment count matching the zero-flag steps.
    pub(crate) fn validate(&self) -> Result<()> {
        let hash_count = self.flags.len();
        if self.skips.len() != hash_count
            || self.orders.as_ref().is_some_and(|o| o.len() != hash_count)
        {
            return Err(Error::MalformedProof(
                "bit stream lengths disagree".into(),
            ));
        }
        if self.flags.iter().zip(&self.skips).any(|(f, s)| *f && *s) {
            return Err(Error::MalformedProof(
                "a step cannot both merge and skip".into(),
            ));
        }
        let expected = expected_decommitments(&self.flags, &self.skips);
        if self.decommitments.len() != expected {
            return Err(Error::MalformedProof(format!(
                "expected {} decommitments, found {}",
                expected,
                self.decommitments.len()
            )));
        }
        if self.proved_count() > self.element_count as usize {
            return Err(Error::MalformedProof(format!(
                "proof covers {} leaves but the tree holds {}",
                self.proved_count(),
                self.element_count
            )));
        }
        Ok(())
    }

    /// Verify that `elements` (in ascending index order) are committed
    /// under `expected_root`.
    pub fn verify<E: AsRef<[u8]>>(&self, expected_root: &Hash, elements: &[E]) -> Result<()> {
        self.validate()?;
        let images = self.images_for(elements)?;
        let element_root = fold_streams(
            &images,
            &self.flags,
            &self.skips,
            self.orders.as_deref(),
            &self.decommitments,
            self.variant(),
        )?;
        let computed = bind_element_count(self.element_count, &element_root);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(())
    }

    /// Verify `elements` against `expected_root` and compute the root after
    /// replacing them with `new_elements`, in one pass over shared
    /// decommitments.
    pub fn update_root<E: AsRef<[u8]>, F: AsRef<[u8]>>(
        &self,
        expected_root: &Hash,
        elements: &[E],
        new_elements: &[F],
    ) -> Result<Hash> {
        self.validate()?;
        if elements.len() != new_elements.len() {
            return Err(Error::InvalidInput(format!(
                "{} elements but {} replacements",
                elements.len(),
                new_elements.len()
            )));
        }
        let images = self.images_for(elements)?;
        let new_images = self.images_for(new_elements)?;
        let (element_root, new_element_root) = fold_streams_update(
            &images,
            &new_images,
            &self.flags,
            &self.skips,
            self.orders.as_deref(),
            &self.decommitments,
            self.variant(),
        )?;
        let computed = bind_element_count(self.element_count, &element_root);
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(bind_element_count(self.element_count, &new_element_root))
    }

    /// Pack into compact one-word-per-stream form.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExceeded`] when the proof has more than 255 steps.
    pub fn to_compact(&self) -> Result<CompactMultiProof> {
        self.validate()?;
        Ok(CompactMultiProof {
            element_count: self.element_count,
            flags: pack_bits(&self.flags, true)?,
            skips: pack_bits(&self.skips, true)?,
            orders: match &self.orders {
                Some(orders) => Some(pack_bits(orders, false)?),
                None => None,
            },
            decommitments: self.decommitments.clone(),
        })
    }

    /// Serialize to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| Error::MalformedProof(format!("encode error: {}", e)))
    }

    /// Deserialize a proof from bytes and validate its internal
    /// consistency.
    ///
    /// The bincode size limit is capped at 100 MiB to prevent crafted
    /// length headers from causing huge allocations.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<{ 100 * 1024 * 1024 }>();
        let (proof, _): (Self, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| Error::MalformedProof(format!("decode error: {}", e)))?;
        proof.validate()?;
        Ok(proof)
    }

    fn images_for<E: AsRef<[u8]>>(&self, elements: &[E]) -> Result<Vec<Hash>> {
        if elements.len() != self.proved_count() {
            return Err(Error::MalformedProof(format!(
                "proof covers {} elements, {} supplied",
                self.proved_count(),
                elements.len()
            )));
        }
        Ok(elements_from_slices(elements)?
            .iter()
            .map(leaf_image)
            .collect())
    }
}

/// Replay the hash steps over a circular buffer and return the interior
/// root.
///
/// `images` are the proved leaf images in ascending index order; the
/// buffer consumes them rightmost-first.
pub(crate) fn fold_streams(
    images: &[Hash],
    flags: &[bool],
    skips: &[bool],
    orders: Option<&[bool]>,
    decommitments: &[Hash],
    variant: HashVariant,
) -> Result<Hash> {
    let width = images.len();
    if width == 0 {
        return Err(Error::InvalidInput("no leaf images supplied".into()));
    }
    let mut hashes: Vec<Hash> = images.iter().rev().copied().collect();
    let mut read = 0;
    let mut write = 0;
    let mut decommitment_index = 0;

    for step in 0..flags.len() {
        if skips[step] {
            hashes[write] = hashes[read];
            read = (read + 1) % width;
            write = (write + 1) % width;
            continue;
        }
        // The first operand read is the right child (or the decommitment);
        // the second is the computed hash whose side the order bit records.
        let first = if flags[step] {
            let hash = hashes[read];
            read = (read + 1) % width;
            hash
        } else {
            let hash = *decommitments.get(decommitment_index).ok_or_else(|| {
                Error::MalformedProof("decommitments exhausted mid-proof".into())
            })?;
            decommitment_index += 1;
            hash
        };
        let second = hashes[read];
        read = (read + 1) % width;

        hashes[write] = match orders {
            Some(orders) if !orders[step] => variant.combine(&first, &second),
            _ => variant.combine(&second, &first),
        };
        write = (write + 1) % width;
    }

    if decommitment_index != decommitments.len() {
        return Err(Error::MalformedProof(format!(
            "{} decommitments left unconsumed",
            decommitments.len() - decommitment_index
        )));
    }
    let root_index = if write == 0 { width - 1 } else { write - 1 };
    Ok(hashes[root_index])
}

/// [`fold_streams`] with a second buffer of replacement images running in
/// lockstep; decommitment-supplied operands feed both lanes. Returns the
/// old and new interior roots from the single pass.
pub(crate) fn fold_streams_update(
    images: &[Hash],
    new_images: &[Hash],
    flags: &[bool],
    skips: &[bool],
    orders: Option<&[bool]>,
    decommitments: &[Hash],
    variant: HashVariant,
) -> Result<(Hash, Hash)> {
    let width = images.len();
    if width == 0 {
        return Err(Error::InvalidInput("no leaf images supplied".into()));
    }
    if new_images.len() != width {
        return Err(Error::InvalidInput(format!(
            "{} current images but {} replacement images",
            width,
            new_images.len()
        )));
    }
    let mut hashes: Vec<(Hash, Hash)> = images
        .iter()
        .zip(new_images)
        .rev()
        .map(|(old, new)| (*old, *new))
        .collect();
    let mut read = 0;
    let mut write = 0;
    let mut decommitment_index = 0;

    for step in 0..flags.len() {
        if skips[step] {
            hashes[write] = hashes[read];
            read = (read + 1) % width;
            write = (write + 1) % width;
            continue;
        }
        let first = if flags[step] {
            let pair = hashes[read];
            read = (read + 1) % width;
            pair
        } else {
            let hash = *decommitments.get(decommitment_index).ok_or_else(|| {
                Error::MalformedProof("decommitments exhausted mid-proof".into())
            })?;
            decommitment_index += 1;
            (hash, hash)
        };
        let second = hashes[read];
        read = (read + 1) % width;

        hashes[write] = match orders {
            Some(orders) if !orders[step] => (
                variant.combine(&first.0, &second.0),
                variant.combine(&first.1, &second.1),
            ),
            _ => (
                variant.combine(&second.0, &first.0),
                variant.combine(&second.1, &first.1),
            ),
        };
        write = (write + 1) % width;
    }

    if decommitment_index != decommitments.len() {
        return Err(Error::MalformedProof(format!(
            "{} decommitments left unconsumed",
            decommitments.len() - decommitment_index
        )));
    }
    let root_index = if write == 0 { width - 1 } else { write - 1 };
    Ok(hashes[root_index])
}

/// A multi-proof with each bit stream packed into one 32-byte word.
///
/// Wire layout (32-byte words): element count, flags, skips, orders
/// (ordered variant only), then the decommitments. The flags and skips
/// words carry a stop bit one position above the last step; the order word
/// does not, since the automaton terminates on the reserved "flag and skip"
/// combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactMultiProof {
    element_count: u32,
    flags: [u8; 32],
    skips: [u8; 32],
    orders: Option<[u8; 32]>,
    decommitments: Vec<Hash>,
}

impl CompactMultiProof {
    /// Generate a compact proof directly from a tree.
    pub fn generate(tree: &MerkleTree, indices: &[usize]) -> Result<Self> {
        MultiProof::generate(tree, indices)?.to_compact()
    }

    /// The element count of the tree this proof was generated against.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// The packed flag word.
    pub fn flags_word(&self) -> &[u8; 32] {
        &self.flags
    }

    /// The packed skip word.
    pub fn skips_word(&self) -> &[u8; 32] {
        &self.skips
    }

    /// The packed order word; `None` for sorted-variant proofs.
    pub fn orders_word(&self) -> Option<&[u8; 32]> {
        self.orders.as_ref()
    }

    /// The sibling hashes consumed by non-flag, non-skip steps.
    pub fn decommitments(&self) -> &[Hash] {
        &self.decommitments
    }

    /// Unpack into boolean form.
    ///
    /// Locates the stop step (the reserved position where flags and skips
    /// are both set), rejects streams with no stop bit or with stray bits
    /// past it, and checks the decommitment count.
    pub fn expand(&self) -> Result<MultiProof> {
        let hash_count = (0..=MAX_COMPACT_HASH_COUNT)
            .find(|&step| get_bit(&self.flags, step) && get_bit(&self.skips, step))
            .ok_or_else(|| Error::MalformedProof("missing stop bit".into()))?;

        let proof = MultiProof {
            element_count: self.element_count,
            flags: unpack_bits(&self.flags, hash_count, hash_count + 1)?,
            skips: unpack_bits(&self.skips, hash_count, hash_count + 1)?,
            orders: match &self.orders {
                Some(orders) => Some(unpack_bits(orders, hash_count, hash_count)?),
                None => None,
            },
            decommitments: self.decommitments.clone(),
        };
        proof.validate()?;
        Ok(proof)
    }

    /// Verify that `elements` (in ascending index order) are committed
    /// under `expected_root`.
    pub fn verify<E: AsRef<[u8]>>(&self, expected_root: &Hash, elements: &[E]) -> Result<()> {
        self.expand()?.verify(expected_root, elements)
    }

    /// Verify and compute the root after replacing `elements` with
    /// `new_elements`.
    pub fn update_root<E: AsRef<[u8]>, F: AsRef<[u8]>>(
        &self,
        expected_root: &Hash,
        elements: &[E],
        new_elements: &[F],
    ) -> Result<Hash> {
        self.expand()?
            .update_root(expected_root, elements, new_elements)
    }

    /// Serialize to the 32-byte-word wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let word_count = 3 + self.orders.is_some() as usize + self.decommitments.len();
        let mut bytes = Vec::with_capacity(32 * word_count);
        bytes.extend_from_slice(&crate::hash::element_count_word(self.element_count));
        bytes.extend_from_slice(&self.flags);
        bytes.extend_from_slice(&self.skips);
        if let Some(orders) = &self.orders {
            bytes.extend_from_slice(orders);
        }
        for decommitment in &self.decommitments {
            bytes.extend_from_slice(decommitment);
        }
        bytes
    }

    /// Deserialize from the 32-byte-word wire format.
    ///
    /// The order word is present on the wire only for ordered-variant
    /// proofs, so the caller states the variant.
    pub fn from_bytes(bytes: &[u8], variant: HashVariant) -> Result<Self> {
        if bytes.len() % 32 != 0 {
            return Err(Error::MalformedProof(format!(
                "wire length {} is not a multiple of 32",
                bytes.len()
            )));
        }
        let stream_words = 2 + variant.is_ordered() as usize;
        let words: Vec<[u8; 32]> = bytes
            .chunks_exact(32)
            .map(|chunk| chunk.try_into().expect("chunks are 32 bytes"))
            .collect();
        if words.len() < 1 + stream_words {
            return Err(Error::MalformedProof(format!(
                "wire holds {} words, need at least {}",
                words.len(),
                1 + stream_words
            )));
        }

        let count_word = &words[0];
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

        let proof = CompactMultiProof {
            element_count,
            flags: words[1],
            skips: words[2],
            orders: variant.is_ordered().then(|| words[3]),
            decommitments: words[1 + stream_words..].to_vec(),
        };
        // Reject inconsistent streams before handing the proof out.
        proof.expand()?;
        Ok(proof)
    }
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

    fn select(elements: &[Hash], indices: &[usize]) -> Vec<Hash> {
        indices.iter().map(|&i| elements[i]).collect()
    }

    #[test]
    fn test_twelve_element_streams() {
        // Unbalanced 12-element tree, proving indices 2, 3, 8 and 11:
        // the one skip is the promotion of the half-filled right quarter.
        let (_, tree) = build(12, HashVariant::Ordered);
        let proof = MultiProof::generate(&tree, &[2, 3, 8, 11]).expect("generate");

        let t = true;
        let f = false;
        assert_eq!(proof.flags(), &[f, f, t, t, f, f, f, t]);
        assert_eq!(proof.skips(), &[f, f, f, f, f, t, f, f]);
        assert_eq!(
            proof.orders().expect("ordered proof"),
            &[f, t, t, t, f, t, t, t]
        );
        assert_eq!(proof.decommitments().len(), 4);
        assert_eq!(proof.hash_count(), 8);
        assert_eq!(proof.proved_count(), 4);
    }

    #[test]
    fn test_verify_roundtrip() {
        let (elements, tree) = build(12, HashVariant::Ordered);
        let indices = [2, 3, 8, 11];
        let proof = MultiProof::generate(&tree, &indices).expect("generate");
        proof
            .verify(&tree.root(), &select(&elements, &indices))
            .expect("verify");
    }

    #[test]
    fn test_verify_single_index_through_multi_engine() {
        let (elements, tree) = build(9, HashVariant::Ordered);
        for index in [0, 5, 8] {
            let proof = MultiProof::generate(&tree, &[index]).expect("generate");
            proof
                .verify(&tree.root(), &select(&elements, &[index]))
                .expect("verify");
        }
    }

    #[test]
    fn test_verify_sorted_variant_has_no_orders() {
        let (elements, tree) = build(12, HashVariant::Sorted);
        let indices = [0, 3, 7, 10];
        let proof = MultiProof::generate(&tree, &indices).expect("generate");
        assert!(proof.orders().is_none());
        assert_eq!(proof.variant(), HashVariant::Sorted);
        proof
            .verify(&tree.root(), &select(&elements, &indices))
            .expect("verify");
    }

    #[test]
    fn test_verify_wrong_elements_fails() {
        let (elements, tree) = build(8, HashVariant::Ordered);
        let proof = MultiProof::generate(&tree, &[1, 4]).expect("generate");
        let result = proof.verify(&tree.root(), &select(&elements, &[1, 5]));
        assert!(matches!(result, Err(Error::RootMismatch { .. })));
    }

    #[test]
    fn test_verify_wrong_element_order_fails() {
        let (elements, tree) = build(8, HashVariant::Ordered);
        let proof = MultiProof::generate(&tree, &[1, 4]).expect("generate");
        let result = proof.verify(&tree.root(), &select(&elements, &[4, 1]));
        assert!(matches!(result, Err(Error::RootMismatch { .. })));
    }

    #[test]
    fn test_generate_rejects_unsorted_indices() {
        let (_, tree) = build(8, HashVariant::Ordered);
        assert_eq!(
            MultiProof::generate(&tree, &[4, 1]).expect_err("unsorted"),
            Error::UnsortedIndices
        );
        assert_eq!(
            MultiProof::generate(&tree, &[4, 4]).expect_err("duplicate"),
            Error::UnsortedIndices
        );
    }

    #[test]
    fn test_generate_rejects_empty_and_out_of_range() {
        let (_, tree) = build(8, HashVariant::Ordered);
        assert!(matches!(
            MultiProof::generate(&tree, &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MultiProof::generate(&tree, &[8]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_root_matches_rebuilt_tree() {
        let (elements, tree) = build(12, HashVariant::Ordered);
        let indices = [0, 7, 11];
        let replacements = generate_elements(3, &[0xaa]);
        let proof = MultiProof::generate(&tree, &indices).expect("generate");

        let new_root = proof
            .update_root(&tree.root(), &select(&elements, &indices), &replacements)
            .expect("update root");
        let updated = tree.update(&indices, &replacements).expect("update tree");
        assert_eq!(new_root, updated.root());
    }

    #[test]
    fn test_update_root_rejects_stale_root() {
        let (elements, tree) = build(8, HashVariant::Ordered);
        let indices = [2, 5];
        let replacements = generate_elements(2, &[0xaa]);
        let proof = MultiProof::generate(&tree, &indices).expect("generate");
        let stale = [0x11u8; 32];
        let result = proof.update_root(&stale, &select(&elements, &indices), &replacements);
        assert!(matches!(result, Err(Error::RootMismatch { .. })));
    }

    #[test]
    fn test_tampered_decommitment_count_is_malformed() {
        let (elements, tree) = build(8, HashVariant::Ordered);
        let indices = [1, 4];
        let mut proof = MultiProof::generate(&tree, &indices).expect("generate");
        proof.decommitments.pop();
        let result = proof.verify(&tree.root(), &select(&elements, &indices));
        assert!(matches!(result, Err(Error::MalformedProof(_))));
    }

    #[test]
    fn test_wrong_supplied_element_count_is_malformed() {
        let (elements, tree) = build(8, HashVariant::Ordered);
        let proof = MultiProof::generate(&tree, &[1, 4]).expect("generate");
        let result = proof.verify(&tree.root(), &select(&elements, &[1, 4, 5]));
        assert!(matches!(result, Err(Error::MalformedProof(_))));
    }

    #[test]
    fn test_compact_words_for_eight_element_tree() {
        // 8 elements, proving 1, 4, 5: five steps, so stop bits land at
        // bit 5. flags 0b0011_0001, skips 0b0010_0000, orders 0b0001_1101.
        let (_, tree) = build(8, HashVariant::Ordered);
        let compact = CompactMultiProof::generate(&tree, &[1, 4, 5]).expect("generate");

        assert_eq!(compact.flags_word()[31], 0x31);
        assert_eq!(compact.skips_word()[31], 0x20);
        assert_eq!(compact.orders_word().expect("ordered")[31], 0x1d);
        assert!(compact.flags_word()[..31].iter().all(|b| *b == 0));
        assert!(compact.skips_word()[..31].iter().all(|b| *b == 0));
        assert!(compact.orders_word().expect("ordered")[..31]
            .iter()
            .all(|b| *b == 0));
    }

    #[test]
    fn test_compact_and_boolean_forms_agree() {
        let (elements, tree) = build(20, HashVariant::Ordered);
        let indices = [0, 1, 9, 13, 19];
        let proof = MultiProof::generate(&tree, &indices).expect("generate");
        let compact = proof.to_compact().expect("compact");

        let supplied = select(&elements, &indices);
        proof.verify(&tree.root(), &supplied).expect("boolean form");
        compact
            .verify(&tree.root(), &supplied)
            .expect("compact form");

        let expanded = compact.expand().expect("expand");
        assert_eq!(expanded.flags(), proof.flags());
        assert_eq!(expanded.skips(), proof.skips());
        assert_eq!(expanded.orders(), proof.orders());
        assert_eq!(expanded.decommitments(), proof.decommitments());
    }

    #[test]
    fn test_compact_wire_roundtrip() {
        let (elements, tree) = build(12, HashVariant::Ordered);
        let indices = [2, 3, 8, 11];
        let compact = CompactMultiProof::generate(&tree, &indices).expect("generate");

        let bytes = compact.to_bytes();
        assert_eq!(bytes.len() % 32, 0);
        // count + flags + skips + orders + 4 decommitments
        assert_eq!(bytes.len(), 32 * 8);

        let decoded =
            CompactMultiProof::from_bytes(&bytes, HashVariant::Ordered).expect("decode");
        assert_eq!(decoded, compact);
        decoded
            .verify(&tree.root(), &select(&elements, &indices))
            .expect("verify decoded");
    }

    #[test]
    fn test_compact_wire_sorted_omits_orders_word() {
        let (elements, tree) = build(12, HashVariant::Sorted);
        let indices = [2, 3, 8, 11];
        let compact = CompactMultiProof::generate(&tree, &indices).expect("generate");
        let bytes = compact.to_bytes();
        // count + flags + skips + 4 decommitments, no orders word
        assert_eq!(bytes.len(), 32 * 7);

        let decoded = CompactMultiProof::from_bytes(&bytes, HashVariant::Sorted).expect("decode");
        decoded
            .verify(&tree.root(), &select(&elements, &indices))
            .expect("verify decoded");
    }

    #[test]
    fn test_compact_wire_rejects_bad_lengths() {
        let result = CompactMultiProof::from_bytes(&[0u8; 33], HashVariant::Ordered);
        assert!(matches!(result, Err(Error::MalformedProof(_))));
        let result = CompactMultiProof::from_bytes(&[0u8; 64], HashVariant::Ordered);
        assert!(matches!(result, Err(Error::MalformedProof(_))));
    }

    #[test]
    fn test_compact_wire_rejects_oversized_count() {
        let (_, tree) = build(4, HashVariant::Ordered);
        let compact = CompactMultiProof::generate(&tree, &[0, 2]).expect("generate");
        let mut bytes = compact.to_bytes();
        bytes[0] = 0x01; // element count beyond 32 bits
        let result = CompactMultiProof::from_bytes(&bytes, HashVariant::Ordered);
        assert!(matches!(result, Err(Error::CapacityExceeded(_))));
    }

    #[test]
    fn test_compact_missing_stop_bit_rejected() {
        let (_, tree) = build(4, HashVariant::Ordered);
        let compact = CompactMultiProof::generate(&tree, &[0, 2]).expect("generate");
        let mut broken = compact.clone();
        broken.skips = [0u8; 32]; // clears the skip-side stop bit
        assert!(matches!(
            broken.expand(),
            Err(Error::MalformedProof(_))
        ));
    }

    #[test]
    fn test_compact_stray_bits_past_stop_rejected() {
        let (_, tree) = build(4, HashVariant::Ordered);
        let compact = CompactMultiProof::generate(&tree, &[0, 2]).expect("generate");
        let mut broken = compact.clone();
        broken.flags[0] |= 0x80; // bit 255, far past the stop
        assert!(matches!(broken.expand(), Err(Error::MalformedProof(_))));
    }

    #[test]
    fn test_bincode_roundtrip() {
        let (elements, tree) = build(9, HashVariant::Ordered);
        let indices = [0, 8];
        let proof = MultiProof::generate(&tree, &indices).expect("generate");
        let bytes = proof.encode_to_vec().expect("encode");
        let decoded = MultiProof::decode_from_slice(&bytes).expect("decode");
        decoded
            .verify(&tree.root(), &select(&elements, &indices))
            .expect("verify decoded");
    }

    #[test]
    fn test_proof_of_single_element_tree_has_no_steps() {
        let (elements, tree) = build(1, HashVariant::Ordered);
        let proof = MultiProof::generate(&tree, &[0]).expect("generate");
        assert_eq!(proof.hash_count(), 0);
        assert!(proof.decommitments().is_empty());
        proof.verify(&tree.root(), &elements).expect("verify");
    }
}
