//! Error taxonomy for the analytical model.
//!
//! Every model operation is a pure function, so an error always means the
//! input itself is malformed. Nothing here is retryable.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Non-positive shape field, or a derived output side below 1
    #[error("invalid workload: {0}")]
    InvalidWorkload(String),

    /// Non-positive capacity/bandwidth/frequency, or a zero-sized tile
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A byte or cycle count left the u64 range
    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Multiply all factors, failing with `ArithmeticOverflow` labelled `what`.
pub(crate) fn checked_product(factors: &[u64], what: &'static str) -> Result<u64> {
    factors.iter().try_fold(1u64, |acc, &f| {
        acc.checked_mul(f).ok_or(ModelError::ArithmeticOverflow(what))
    })
}

/// Add all terms, failing with `ArithmeticOverflow` labelled `what`.
pub(crate) fn checked_sum(terms: &[u64], what: &'static str) -> Result<u64> {
    terms.iter().try_fold(0u64, |acc, &t| {
        acc.checked_add(t).ok_or(ModelError::ArithmeticOverflow(what))
    })
}
