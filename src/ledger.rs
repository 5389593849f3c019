//! A reference verifier over a single stored root.
//!
//! Models the external contract surface: one 32-byte root field (all-zero
//! when empty) and four entry points — a pure existence check, a consuming
//! check that yields a usage digest, a root-replacing update, and the two
//! combined. Every failure propagates as an error and leaves the stored
//! root untouched.

use crate::{
    hash::{elements_from_slices, keccak_combine, Hash, HashVariant, ZERO_HASH},
    proof::CompactMultiProof,
    Result,
};

/// The digest emitted when committed elements are consumed: the left fold
/// `keccak256(previous || element)` seeded with the zero hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUsed(pub Hash);

/// A single stored accumulator root with proof-gated access.
#[derive(Debug, Clone)]
pub struct RootLedger {
    variant: HashVariant,
    root: Hash,
}

impl RootLedger {
    /// An empty ledger (zero root).
    pub fn new(variant: HashVariant) -> Self {
        RootLedger {
            variant,
            root: ZERO_HASH,
        }
    }

    /// A ledger over an existing root.
    pub fn with_root(variant: HashVariant, root: Hash) -> Self {
        RootLedger { variant, root }
    }

    /// The stored root.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Whether the ledger holds the empty root.
    pub fn is_empty(&self) -> bool {
        self.root == ZERO_HASH
    }

    /// The hashing variant proofs must match.
    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    /// Pure existence check: do `elements` verify against the stored root?
    pub fn verify<E: AsRef<[u8]>>(&self, proof: &CompactMultiProof, elements: &[E]) -> bool {
        proof.verify(&self.root, elements).is_ok()
    }

    /// Consume `elements`: verify them against the stored root and return
    /// the usage digest.
    pub fn use_elements<E: AsRef<[u8]>>(
        &self,
        proof: &CompactMultiProof,
        elements: &[E],
    ) -> Result<DataUsed> {
        proof.verify(&self.root, elements)?;
        Ok(DataUsed(fold_digest(&elements_from_slices(elements)?)))
    }

    /// Replace `elements` with `new_elements` and install the resulting
    /// root.
    pub fn update<E: AsRef<[u8]>, F: AsRef<[u8]>>(
        &mut self,
        proof: &CompactMultiProof,
        elements: &[E],
        new_elements: &[F],
    ) -> Result<()> {
        self.root = proof.update_root(&self.root, elements, new_elements)?;
        Ok(())
    }

    /// Consume `elements` and replace each with the running usage digest:
    /// `new[i] = keccak256(new[i - 1] || elements[i])`, seeded with the
    /// zero hash. Installs the resulting root and returns the digest.
    pub fn use_and_update<E: AsRef<[u8]>>(
        &mut self,
        proof: &CompactMultiProof,
        elements: &[E],
    ) -> Result<DataUsed> {
        let elements = elements_from_slices(elements)?;
        let mut new_elements = Vec::with_capacity(elements.len());
        let mut digest = ZERO_HASH;
        for element in &elements {
            digest = keccak_combine(&digest, element);
            new_elements.push(digest);
        }
        self.root = proof.update_root(&self.root, &elements, &new_elements)?;
        Ok(DataUsed(digest))
    }
}

/// The usage digest of a run of elements.
fn fold_digest(elements: &[Hash]) -> Hash {
    let mut digest = ZERO_HASH;
    for element in elements {
        digest = keccak_combine(&digest, element);
    }
    digest
}
