//! Size proofs: prove the element count committed under a root.
//!
//! The count is bound into the root as `keccak256(N || element_root)`, so
//! proving it means reconstructing the interior root against a claimed N.
//! Three modes trade proof size against what the verifier must already
//! know:
//! - `Full` — the frontier decommitments plus the count; self-contained.
//! - `Compact` — the frontier decommitments alone; the verifier supplies
//!   the count.
//! - `Simple` — the revealed interior root; the verifier checks the count
//!   binding directly.

use bincode::{Decode, Encode};

use crate::{
    error::root_mismatch,
    hash::{bind_element_count, element_count_word, Hash, HashVariant, ZERO_HASH},
    proof::{append::fold_frontier, AppendProof},
    Error, MerkleTree, Result,
};

/// Which size proof shape to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeProofMode {
    /// Frontier decommitments with the element count attached.
    Full,
    /// Frontier decommitments alone; the count travels out of band.
    Compact,
    /// The revealed interior root.
    Simple,
}

/// A proof that a root commits to a specific element count.
#[derive(Debug, Clone, Encode, Decode)]
pub enum SizeProof {
    /// Self-contained: count plus frontier decommitments.
    Full {
        /// Interior hashing variant of the proved tree.
        variant: HashVariant,
        /// The claimed element count.
        element_count: u32,
        /// Frontier subtree roots, topmost first.
        decommitments: Vec<Hash>,
    },
    /// Frontier decommitments alone; the verifier supplies the count.
    Compact {
        /// Interior hashing variant of the proved tree.
        variant: HashVariant,
        /// Frontier subtree roots, topmost first.
        decommitments: Vec<Hash>,
    },
    /// The revealed interior root; the count binding is checked directly.
    Simple {
        /// The claimed element count.
        element_count: u32,
        /// The interior root (node 1) of the proved tree.
        element_root: Hash,
    },
}

impl SizeProof {
    /// Generate a size proof for the tree's current state.
    ///
    /// `Simple` mode needs an interior root and is rejected for an empty
    /// tree; the other modes degrade to an empty frontier.
    pub fn generate(tree: &MerkleTree, mode: SizeProofMode) -> Result<Self> {
        match mode {
            SizeProofMode::Full => {
                let append = AppendProof::generate(tree)?;
                Ok(SizeProof::Full {
                    variant: tree.variant(),
                    element_count: tree.element_count() as u32,
                    decommitments: append.decommitments().to_vec(),
                })
            }
            SizeProofMode::Compact => {
                let append = AppendProof::generate(tree)?;
                Ok(SizeProof::Compact {
                    variant: tree.variant(),
                    decommitments: append.decommitments().to_vec(),
                })
            }
            SizeProofMode::Simple => {
                let element_root = tree.element_root().ok_or_else(|| {
                    Error::InvalidInput(
                        "a simple size proof needs a non-empty tree".into(),
                    )
                })?;
                Ok(SizeProof::Simple {
                    element_count: tree.element_count() as u32,
                    element_root,
                })
            }
        }
    }

    /// Verify that `expected_root` commits to `element_count` elements.
    ///
    /// `Full` and `Simple` proofs carry a count of their own; it must
    /// agree with the claimed one.
    pub fn verify(&self, expected_root: &Hash, element_count: u32) -> Result<()> {
        let computed = match self {
            SizeProof::Full {
                variant,
                element_count: carried,
                decommitments,
            } => {
                if *carried != element_count {
                    return Err(Error::MalformedProof(format!(
                        "proof carries element count {}, {} claimed",
                        carried, element_count
                    )));
                }
                frontier_root(decommitments, *variant, element_count)?
            }
            SizeProof::Compact {
                variant,
                decommitments,
            } => frontier_root(decommitments, *variant, element_count)?,
            SizeProof::Simple {
                element_count: carried,
                element_root,
            } => {
                if *carried != element_count {
                    return Err(Error::MalformedProof(format!(
                        "proof carries element count {}, {} claimed",
                        carried, element_count
                    )));
                }
                if element_count == 0 {
                    return Err(Error::MalformedProof(
                        "a simple size proof cannot claim an empty tree".into(),
                    ));
                }
                bind_element_count(element_count, element_root)
            }
        };
        if computed != *expected_root {
            return Err(root_mismatch(expected_root, &computed));
        }
        Ok(())
    }

    /// Serialize to the wire format.
    ///
    /// `Full` uses the append wire layout (count word then decommitments);
    /// `Compact` is the decommitments alone; `Simple` is the count word
    /// then the interior root.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            SizeProof::Full {
                element_count,
                decommitments,
                ..
            } => {
                let mut bytes = Vec::with_capacity(32 * (1 + decommitments.len()));
                bytes.extend_from_slice(&element_count_word(*element_count));
                for decommitment in decommitments {
                    bytes.extend_from_slice(decommitment);
                }
                bytes
            }
            SizeProof::Compact { decommitments, .. } => {
                let mut bytes = Vec::with_capacity(32 * decommitments.len());
                for decommitment in decommitments {
                    bytes.extend_from_slice(decommitment);
                }
                bytes
            }
            SizeProof::Simple {
                element_count,
                element_root,
            } => {
                let mut bytes = Vec::with_capacity(64);
                bytes.extend_from_slice(&element_count_word(*element_count));
                bytes.extend_from_slice(element_root);
                bytes
            }
        }
    }
}

/// Fold frontier decommitments into the bound root for a claimed count,
/// checking the decommitment count against the count's set bits.
fn frontier_root(
    decommitments: &[Hash],
    variant: HashVariant,
    element_count: u32,
) -> Result<Hash> {
    if decommitments.len() != element_count.count_ones() as usize {
        return Err(Error::MalformedProof(format!(
            "size proof for {} elements needs {} decommitments, found {}",
            element_count,
            element_count.count_ones(),
            decommitments.len()
        )));
    }
    Ok(match fold_frontier(decommitments, variant) {
        Some(element_root) => bind_element_count(element_count, &element_root),
        None => ZERO_HASH,
    })
}
