use thiserror::Error;

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for tree and proof operations.
///
/// Covers malformed proof data, ordering violations, verification failures,
/// and capacity limits. Every error is surfaced to the caller; nothing is
/// retried and no error is used for control flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Proof data is internally inconsistent: missing stop bit, stream
    /// length disagreement, or a decommitment count that does not match the
    /// flag bits.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// Proof generation was called with indices that are not strictly
    /// ascending.
    #[error("indices must be unique and strictly ascending")]
    UnsortedIndices,
    /// Verification arithmetic produced a root different from the claimed
    /// one.
    #[error("root mismatch: expected {expected}, computed {computed}")]
    RootMismatch {
        /// Hex of the claimed root.
        expected: String,
        /// Hex of the recomputed root.
        computed: String,
    },
    /// A combined update-and-append proof was requested for an update index
    /// below the minimum admissible index for the current element count.
    #[error("update index {index} is below the minimum combined proof index {minimum}")]
    MinimumIndexViolation {
        /// The offending update index.
        index: usize,
        /// The smallest admissible update index.
        minimum: usize,
    },
    /// A size or count limit was exceeded: more than 255 hash steps in a
    /// compact proof, or an element count at or beyond 2^32.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    /// An element is not exactly 32 bytes.
    #[error("invalid element: {0}")]
    InvalidElement(String),
    /// Invalid input parameters (empty index list, index out of range, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Render a 32-byte hash as lowercase hex for error messages.
pub(crate) fn hex_encode(bytes: &[u8; 32]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Build a [`Error::RootMismatch`] from the claimed and recomputed roots.
pub(crate) fn root_mismatch(expected: &[u8; 32], computed: &[u8; 32]) -> Error {
    Error::RootMismatch {
        expected: hex_encode(expected),
        computed: hex_encode(computed),
    }
}
