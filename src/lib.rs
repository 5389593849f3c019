//! Appendable Merkle accumulator with compact multiproofs over Keccak-256.
//!
//! An accumulator commits an ordered sequence of 32-byte elements to a
//! single root: `keccak256(count || interior_root)`. A verifier holding
//! only that root (and the count) can check membership, replace committed
//! elements, or extend the sequence — recomputing the new root from a
//! compact proof without ever seeing the full tree. Unbalanced trees are
//! first-class: missing right siblings are skipped, never padded, so every
//! element count has one canonical root.
//!
//! # Core types
//!
//! - [`MerkleTree`] — the immutable tree (build, root, update, append).
//! - [`SingleProof`] — membership proof for one element.
//! - [`MultiProof`] / [`CompactMultiProof`] — membership proofs for a set
//!   of elements, with the bit-packed one-word-per-stream wire form.
//! - [`AppendProof`] — extend the sequence and compute the new root.
//! - [`CombinedProof`] — update and append in one proof, gated by
//!   [`minimum_combined_proof_index`].
//! - [`SizeProof`] — prove the committed element count.
//! - [`infer_indices`] — recover proved indices from an ordered proof.
//! - [`RootLedger`] — a reference verifier over a single stored root.
//!
//! # Hash variants
//!
//! Trees and proofs are parameterized by [`HashVariant`]: `Ordered`
//! preserves sibling positions (enabling index inference), `Sorted` hashes
//! each pair in numeric order, shortening proofs by a full bit stream at
//! the cost of positional information.
//!
//! All operations are pure functions over immutable inputs: no storage, no
//! shared state, no blocking.

#![warn(missing_docs)]

mod error;
pub mod hash;
mod ledger;
pub mod proof;
mod tree;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
pub use hash::{Hash, HashVariant, ZERO_HASH};
pub use ledger::{DataUsed, RootLedger};
pub use proof::{
    infer_indices, minimum_combined_proof_index, AppendProof, CombinedProof, CompactMultiProof,
    MultiProof, SingleProof, SizeProof, SizeProofMode,
};
pub use tree::{MerkleTree, MAX_ELEMENT_COUNT};
