use thiserror::Error;

/// Failures surfaced by the ranking core.
///
/// These are plain values: the core performs no I/O, so nothing here is
/// transient and nothing is retried or logged internally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RankingError {
    /// Malformed, unsorted or empty tier list, or an unknown tier id.
    #[error("Invalid tier data: {0}")]
    InvalidTierData(String),

    /// A group handed to the ranker breaks its preconditions.
    #[error("Invalid group state: {0}")]
    InvalidGroupState(String),

    #[error("Insertion session already resolved")]
    AlreadyResolved,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Allocation produced output that contradicts its own tier bounds.
    #[error("Allocation fault: {0}")]
    AllocationFault(String),
}

pub type Result<T> = std::result::Result<T, RankingError>;
