use thiserror::Error;

/// Governance failure taxonomy. The engine computes these as outcomes
/// and never catches or suppresses them; the service passes them
/// through to the caller unchanged.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The group id does not resolve to a record.
    #[error("group not found")]
    NotFound,

    /// The caller lacks the role the operation requires.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Structurally valid request that violates a governance rule.
    #[error("{0}")]
    InvalidOperation(&'static str),

    /// Transient persistence failure. The whole call is safe to retry
    /// from scratch; no transition was partially applied.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),
}
