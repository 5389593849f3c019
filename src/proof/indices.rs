//! Recovering proved leaf indices from an ordered multi-proof.
//!
//! With the ordered hash variant the `flags`/`skips`/`orders` streams
//! fully determine which leaves were proved: every hash step fixes one bit
//! of every leaf index below it — `orders` says which side the computed
//! hash went on, a skip pushes a zero bit, and a flag merge gives the
//! first-read group a one and the second a zero. Replaying the automaton
//! over groups of leaf slots instead of hashes rebuilds each index from
//! the bottom up.

use crate::{hash::HashVariant, proof::MultiProof, Error, Result};

/// Recover the leaf indices a multi-proof was generated for, in ascending
/// order.
///
/// Only defined for the ordered hash variant; sorted proofs carry no
/// positional information by construction.
pub fn infer_indices(proof: &MultiProof) -> Result<Vec<usize>> {
    if proof.variant() != HashVariant::Ordered {
        return Err(Error::InvalidInput(
            "index inference requires the ordered hash variant".into(),
        ));
    }
    proof.validate()?;

    let flags = proof.flags();
    let skips = proof.skips();
    let orders = proof.orders().unwrap_or_default();
    let width = proof.proved_count();

    let mut indices = vec![0usize; width];
    let mut bits_pushed = vec![0u32; width];
    // One group per buffer slot; a group holds the leaf slots whose paths
    // have merged so far.
    let mut groups: Vec<Vec<usize>> = (0..width).map(|slot| vec![slot]).collect();
    let mut read = 0;
    let mut write = 0;

    for step in 0..flags.len() {
        if skips[step] {
            // Promoted left child: a zero bit for every leaf in the group.
            let group = std::mem::take(&mut groups[read]);
            read = (read + 1) % width;
            for &leaf in &group {
                bits_pushed[leaf] += 1;
            }
            groups[write] = group;
            write = (write + 1) % width;
        } else if flags[step] {
            // Two computed hashes merge; the first-read group was the right
            // child.
            let right = std::mem::take(&mut groups[read]);
            read = (read + 1) % width;
            let mut merged = std::mem::take(&mut groups[read]);
            read = (read + 1) % width;
            for &leaf in &right {
                indices[leaf] |= 1 << checked_level(bits_pushed[leaf])?;
                bits_pushed[leaf] += 1;
            }
            for &leaf in &merged {
                bits_pushed[leaf] += 1;
            }
            merged.extend(right);
            groups[write] = merged;
            write = (write + 1) % width;
        } else {
            // Computed hash beside a decommitment; the order bit says which
            // side the computed hash took.
            let group = std::mem::take(&mut groups[read]);
            read = (read + 1) % width;
            for &leaf in &group {
                if !orders[step] {
                    indices[leaf] |= 1 << checked_level(bits_pushed[leaf])?;
                }
                bits_pushed[leaf] += 1;
            }
            groups[write] = group;
            write = (write + 1) % width;
        }
    }

    indices.sort_unstable();
    if indices.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(Error::MalformedProof(
            "inferred indices are not distinct".into(),
        ));
    }
    Ok(indices)
}

/// Leaf indices are 32-bit; a path longer than that is corruption.
fn checked_level(bits_pushed: u32) -> Result<u32> {
    if bits_pushed >= 32 {
        return Err(Error::MalformedProof(
            "leaf path exceeds the index space".into(),
        ));
    }
    Ok(bits_pushed)
}
